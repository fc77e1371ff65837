//! Build phases of a package.
//!
//! A package is built by four ordered phases: pre-build scripts, custom
//! build scripts, one build-tool run per project file, and post-build
//! scripts. Every command runs inside the package directory and the first
//! failing one stops the build. A build only succeeds when the number of
//! operations that ran equals the number the descriptor declares.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::runner::{batch_quote, Dialect, ProcessExecutor};
use crate::builder::toolchain::{build_tool_args, ToolchainEnvironment};
use crate::core::PackageDescriptor;
use crate::resolver::errors::ContribError;

/// A build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreBuild,
    Build,
    Project,
    PostBuild,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreBuild => write!(f, "pre-build"),
            Phase::Build => write!(f, "build"),
            Phase::Project => write!(f, "project build"),
            Phase::PostBuild => write!(f, "post-build"),
        }
    }
}

/// One operation of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A batch command line
    Script { phase: Phase, command: String },

    /// A project file, relative to the package directory
    Project(PathBuf),
}

impl Operation {
    pub fn phase(&self) -> Phase {
        match self {
            Operation::Script { phase, .. } => *phase,
            Operation::Project(_) => Phase::Project,
        }
    }
}

/// Every operation the descriptor declares, in execution order.
pub fn plan(desc: &PackageDescriptor) -> Vec<Operation> {
    let scripts = |phase: Phase, commands: &[String]| {
        commands
            .iter()
            .map(move |command| Operation::Script {
                phase,
                command: command.clone(),
            })
            .collect::<Vec<_>>()
    };

    let mut ops = scripts(Phase::PreBuild, &desc.custom_scripts.pre_build);
    ops.extend(scripts(Phase::Build, &desc.custom_scripts.build));
    ops.extend(desc.project_paths.iter().cloned().map(Operation::Project));
    ops.extend(scripts(Phase::PostBuild, &desc.custom_scripts.post_build));
    ops
}

/// Declared and executed operation counts of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub declared: usize,
    pub executed: usize,
}

impl BuildReport {
    /// Fail unless every declared operation ran.
    pub fn check(&self, package: &str) -> Result<(), ContribError> {
        if self.declared != self.executed {
            return Err(ContribError::OperationCountMismatch {
                package: package.to_string(),
                declared: self.declared,
                executed: self.executed,
            });
        }
        Ok(())
    }
}

/// Runs the build phases of packages.
pub struct BuildOrchestrator<'a> {
    exec: &'a ProcessExecutor,
    toolchain: &'a ToolchainEnvironment,
    sdk: &'a str,
    toolset: &'a str,
}

impl<'a> BuildOrchestrator<'a> {
    /// `sdk` is used for packages that do not ask for one with `with_env`.
    pub fn new(
        exec: &'a ProcessExecutor,
        toolchain: &'a ToolchainEnvironment,
        sdk: &'a str,
        toolset: &'a str,
    ) -> Self {
        BuildOrchestrator {
            exec,
            toolchain,
            sdk,
            toolset,
        }
    }

    /// SDK a package builds against.
    pub fn sdk_for<'d>(&'d self, desc: &'d PackageDescriptor) -> &'d str {
        if desc.wants_toolchain_env() {
            desc.with_env.trim()
        } else {
            self.sdk
        }
    }

    /// Build a package inside `dir`.
    pub fn build(&self, desc: &PackageDescriptor, dir: &Path) -> Result<BuildReport> {
        let sdk = self.sdk_for(desc);
        let ops = plan(desc);
        tracing::debug!(
            "{}: {} build operation(s) with SDK {} and toolset {}",
            desc.name,
            ops.len(),
            sdk,
            self.toolset
        );

        if desc.wants_toolchain_env() {
            self.toolchain.ensure_environment(self.exec, sdk)?;
        }

        let mut executed = 0;
        let mut current = None;
        for op in &ops {
            if current != Some(op.phase()) {
                current = Some(op.phase());
                tracing::debug!("{}: {} phase", desc.name, op.phase());
            }

            match op {
                Operation::Script { phase, command } => self.run_script(desc, *phase, command, dir)?,
                Operation::Project(project) => self.build_project(desc, sdk, &dir.join(project))?,
            }
            executed += 1;
        }

        let report = BuildReport {
            declared: desc.declared_operations(),
            executed,
        };
        report.check(&desc.name)?;
        Ok(report)
    }

    fn run_script(&self, desc: &PackageDescriptor, phase: Phase, command: &str, dir: &Path) -> Result<()> {
        let out = self.exec.run(Dialect::Batch, command, &[], Some(dir))?;
        if !out.success() {
            return Err(ContribError::BuildCommandFailed {
                package: desc.name.clone(),
                phase: phase.to_string(),
                command: command.to_string(),
                code: out.code,
                stderr: out.text().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn build_project(&self, desc: &PackageDescriptor, sdk: &str, project: &Path) -> Result<()> {
        if !project.is_file() {
            return Err(ContribError::MissingProject {
                package: desc.name.clone(),
                project: project.to_path_buf(),
            }
            .into());
        }

        self.toolchain.ensure_environment(self.exec, sdk)?;
        self.toolchain.force_project_settings(project, sdk, self.toolset)?;

        let tool = batch_quote(&self.toolchain.build_tool()?.display().to_string());
        let args = build_tool_args(
            self.toolchain.arch(),
            &desc.configuration,
            self.toolset,
            desc.wants_toolchain_env(),
            project,
        );

        tracing::info!("Building {} ({})", desc.name, project.display());
        let out = self
            .exec
            .run(Dialect::Batch, &tool, &args, project.parent())?;
        if !out.success() {
            return Err(ContribError::BuildCommandFailed {
                package: desc.name.clone(),
                phase: Phase::Project.to_string(),
                command: format!("{} {}", tool, args.join(" ")),
                code: out.code,
                stderr: out.text().to_string(),
            }
            .into());
        }
        Ok(())
    }
}
