//! Native toolchain discovery and environment.
//!
//! [`ToolchainEnvironment`] is constructed once per run and shared by
//! reference. Both expensive steps, locating the installation and capturing
//! the environment of the vendor's initialization script, happen at most
//! once and only when first needed.

mod detect;
mod msvc;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;

use crate::builder::runner::ProcessExecutor;

pub use detect::{find_build_tool, host_is_64bit, parse_major_version, VsWhereLocator};
pub use msvc::{
    build_tool_args, env_command, force_project_settings, generator_name, parse_environment,
};

/// A discovered toolchain installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Installation root
    pub path: PathBuf,

    pub major_version: u32,

    /// Project-file build tool (`MSBuild.exe`)
    pub build_tool: PathBuf,

    /// Vendor environment-initialization script (`vcvarsall.bat`)
    pub env_script: PathBuf,
}

/// Finds the newest compatible toolchain installation.
pub trait ToolchainLocator: Send + Sync {
    fn locate(&self) -> Result<Installation>;
}

/// The toolchain service.
pub struct ToolchainEnvironment {
    locator: Box<dyn ToolchainLocator>,
    arch: String,
    installation: OnceLock<Installation>,
    environment: OnceLock<BTreeMap<String, String>>,
}

impl ToolchainEnvironment {
    pub fn new(locator: Box<dyn ToolchainLocator>, arch: impl Into<String>) -> Self {
        ToolchainEnvironment {
            locator,
            arch: arch.into(),
            installation: OnceLock::new(),
            environment: OnceLock::new(),
        }
    }

    /// Target platform.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// The installation, located on first use.
    ///
    /// A failed lookup is not remembered; the next call tries again.
    pub fn installation(&self) -> Result<&Installation> {
        if let Some(installation) = self.installation.get() {
            return Ok(installation);
        }

        let installation = self.locator.locate()?;
        tracing::debug!(
            "Found toolchain {} at {}",
            installation.major_version,
            installation.path.display()
        );
        Ok(self.installation.get_or_init(|| installation))
    }

    /// Path of the project-file build tool.
    pub fn build_tool(&self) -> Result<&Path> {
        Ok(&self.installation()?.build_tool)
    }

    /// Meta-build generator name matching the installation.
    pub fn generator(&self) -> Result<String> {
        Ok(generator_name(self.installation()?.major_version))
    }

    /// Command line that initializes the environment for `sdk` and dumps it.
    pub fn vcvars_command(&self, sdk: &str) -> Result<String> {
        Ok(env_command(&self.installation()?.env_script, &self.arch, sdk))
    }

    /// Capture the toolchain environment and switch the executor to it.
    ///
    /// Only the first call does any work; later calls are no-ops even when
    /// they ask for another SDK.
    pub fn ensure_environment(&self, exec: &ProcessExecutor, sdk: &str) -> Result<()> {
        if self.environment.get().is_some() {
            tracing::debug!("Toolchain environment already initialized");
            return Ok(());
        }

        tracing::info!("Setting up toolchain environment (SDK {})", sdk);
        let command = self.vcvars_command(sdk)?;
        let captured = msvc::capture_environment(exec, &command, sdk)?;

        let mut vars = exec.project_env().clone();
        vars.extend(captured);

        exec.switch_to_toolchain(vars.clone());
        let _ = self.environment.set(vars);
        Ok(())
    }

    /// The captured environment, once initialized.
    pub fn environment(&self) -> Option<&BTreeMap<String, String>> {
        self.environment.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.environment.get().is_some()
    }

    /// Force an SDK version and a platform toolset into a build project file.
    pub fn force_project_settings(&self, project: &Path, sdk: &str, toolset: &str) -> Result<usize> {
        force_project_settings(project, sdk, toolset)
    }
}
