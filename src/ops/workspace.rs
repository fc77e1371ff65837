//! The application context.
//!
//! A [`Workspace`] owns every service a resolution needs, each built once
//! and handed out by reference: the project layout, the configuration, the
//! process executor, the toolchain service, the downloaders and the POSIX
//! path translator.

use std::collections::BTreeMap;

use crate::builder::runner::{ProcessExecutor, RunnerRegistry};
use crate::builder::toolchain::{ToolchainEnvironment, ToolchainLocator, VsWhereLocator};
use crate::builder::{BuildOrchestrator, BuildRecordStore};
use crate::sources::{
    ArchiveFetcher, CommandDownloader, Downloader, HttpDownloader, MountProbe, NativeTranslator,
    PatchApplier, PathTranslator,
};
use crate::util::config::Config;
use crate::util::context::GlobalContext;

/// Services shared by every package of a run.
pub struct Workspace {
    ctx: GlobalContext,
    config: Config,
    exec: ProcessExecutor,
    toolchain: ToolchainEnvironment,
    primary: Box<dyn Downloader>,
    secondary: Option<Box<dyn Downloader>>,
    translator: Box<dyn PathTranslator>,
}

impl Workspace {
    /// Create a workspace with the real services.
    pub fn new(ctx: GlobalContext, config: Config) -> Self {
        let runners = RunnerRegistry::new(&config.shell);
        let locator = Box::new(VsWhereLocator::new(
            config.toolchain.installer_root.clone(),
            config.toolchain.min_version,
        ));
        let secondary: Option<Box<dyn Downloader>> = if config.net.fallback {
            Some(Box::new(CommandDownloader::new()))
        } else {
            None
        };
        let translator: Box<dyn PathTranslator> = if cfg!(windows) {
            Box::new(MountProbe::new())
        } else {
            Box::new(NativeTranslator)
        };

        Self::from_parts(
            ctx,
            config,
            runners,
            locator,
            Box::new(HttpDownloader::new()),
            secondary,
            translator,
        )
    }

    /// Create a workspace from explicit services.
    pub fn from_parts(
        ctx: GlobalContext,
        config: Config,
        runners: RunnerRegistry,
        locator: Box<dyn ToolchainLocator>,
        primary: Box<dyn Downloader>,
        secondary: Option<Box<dyn Downloader>>,
        translator: Box<dyn PathTranslator>,
    ) -> Self {
        let toolchain = ToolchainEnvironment::new(locator, config.toolchain.arch.clone());
        let project_env = project_env(&ctx, &config, &toolchain);
        let exec = ProcessExecutor::new(runners, project_env);

        Workspace {
            ctx,
            config,
            exec,
            toolchain,
            primary,
            secondary,
            translator,
        }
    }

    pub fn ctx(&self) -> &GlobalContext {
        &self.ctx
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn exec(&self) -> &ProcessExecutor {
        &self.exec
    }

    pub fn toolchain(&self) -> &ToolchainEnvironment {
        &self.toolchain
    }

    pub fn records(&self) -> BuildRecordStore {
        BuildRecordStore::new(&self.ctx)
    }

    pub fn fetcher(&self) -> ArchiveFetcher<'_> {
        ArchiveFetcher::new(
            &self.ctx,
            &self.exec,
            self.primary.as_ref(),
            self.secondary.as_deref(),
        )
    }

    pub fn patcher(&self) -> PatchApplier<'_> {
        PatchApplier::new(&self.ctx, &self.exec, self.translator.as_ref())
    }

    pub fn orchestrator(&self) -> BuildOrchestrator<'_> {
        BuildOrchestrator::new(
            &self.exec,
            &self.toolchain,
            &self.config.toolchain.sdk,
            &self.config.toolchain.toolset,
        )
    }
}

/// Variables added to the environment of every command.
fn project_env(
    ctx: &GlobalContext,
    config: &Config,
    toolchain: &ToolchainEnvironment,
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("DAEMON_DIR".to_string(), ctx.root().display().to_string());
    vars.insert("CONTRIB_SRC_DIR".to_string(), ctx.src_dir().display().to_string());
    vars.insert("CONTRIB_BUILD_DIR".to_string(), ctx.build_dir().display().to_string());

    // one lookup; later accessors read the memoized installation
    let found = toolchain.installation().and_then(|_| {
        Ok((
            toolchain.vcvars_command(&config.toolchain.sdk)?,
            toolchain.generator()?,
        ))
    });
    match found {
        Ok((vcvars, generator)) => {
            vars.insert("VCVARSALL_CMD".to_string(), vcvars);
            vars.insert("CMAKE_GENERATOR".to_string(), generator);
        }
        Err(e) => {
            tracing::debug!("No toolchain variables: {:#}", e);
        }
    }
    vars
}
