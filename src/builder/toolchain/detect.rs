//! Toolchain installation discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use super::{Installation, ToolchainLocator};
use crate::resolver::errors::ContribError;
use crate::util::process::{find_executable, ProcessBuilder};

/// Workload every accepted installation must provide.
const REQUIRED_COMPONENT: &str = "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

const BUILD_TOOL: &str = "MSBuild.exe";

/// Locates Visual Studio through the `vswhere.exe` installer utility.
#[derive(Debug, Clone)]
pub struct VsWhereLocator {
    installer_root: Option<PathBuf>,
    min_version: u32,
}

impl VsWhereLocator {
    pub fn new(installer_root: Option<PathBuf>, min_version: u32) -> Self {
        VsWhereLocator {
            installer_root,
            min_version,
        }
    }

    fn vswhere(&self) -> Result<PathBuf> {
        let root = self.installer_root.clone().or_else(|| {
            std::env::var_os("ProgramFiles(x86)").map(|pf| {
                PathBuf::from(pf)
                    .join("Microsoft Visual Studio")
                    .join("Installer")
            })
        });

        if let Some(candidate) = root.map(|r| r.join("vswhere.exe")) {
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        find_executable("vswhere").ok_or_else(|| {
            ContribError::ToolchainNotFound {
                reason: "vswhere.exe not found".to_string(),
            }
            .into()
        })
    }

    /// First line of a `vswhere -property` query.
    fn query(&self, vswhere: &Path, property: &str) -> Result<Option<String>> {
        let output = ProcessBuilder::new(vswhere)
            .args(["-latest", "-products", "*", "-requires", REQUIRED_COMPONENT])
            .args(["-property", property])
            .exec()?;

        if !output.status.success() {
            tracing::debug!(
                "vswhere failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }
}

impl ToolchainLocator for VsWhereLocator {
    fn locate(&self) -> Result<Installation> {
        let vswhere = self.vswhere()?;
        tracing::debug!("Found vswhere at {}", vswhere.display());

        let not_found = |reason: &str| ContribError::ToolchainNotFound {
            reason: reason.to_string(),
        };

        let version = self
            .query(&vswhere, "installationVersion")?
            .ok_or_else(|| not_found("no installation with the C++ build tools"))?;
        let major_version = parse_major_version(&version)
            .ok_or_else(|| not_found(&format!("unreadable installation version `{}`", version)))?;
        if major_version < self.min_version {
            return Err(not_found(&format!(
                "Visual Studio {} is older than the required {}",
                major_version, self.min_version
            ))
            .into());
        }

        let path = self
            .query(&vswhere, "installationPath")?
            .map(PathBuf::from)
            .ok_or_else(|| not_found("no installation path reported"))?;

        let build_tool = find_build_tool(&path.join("MSBuild"))?
            .ok_or_else(|| not_found(&format!("{} not found under {}", BUILD_TOOL, path.display())))?;

        let env_script = path
            .join("VC")
            .join("Auxiliary")
            .join("Build")
            .join("vcvarsall.bat");
        if !env_script.is_file() {
            return Err(not_found(&format!("{} does not exist", env_script.display())).into());
        }

        Ok(Installation {
            path,
            major_version,
            build_tool,
            env_script,
        })
    }
}

/// Major component of a dotted version (`16.11.34601.136` is 16).
pub fn parse_major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.parse().ok()
}

/// Find the shallowest build tool executable below `dir`.
pub fn find_build_tool(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut best: Option<(usize, PathBuf)> = None;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file()
            || !entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(BUILD_TOOL)
        {
            continue;
        }
        if best.as_ref().map_or(true, |(depth, _)| entry.depth() < *depth) {
            best = Some((entry.depth(), entry.into_path()));
        }
    }

    Ok(best.map(|(_, path)| path))
}

/// Whether the host operating system is 64-bit.
pub fn host_is_64bit() -> bool {
    if cfg!(target_pointer_width = "64") {
        return true;
    }
    std::env::var_os("PROCESSOR_ARCHITEW6432").is_some()
        || std::env::var("PROCESSOR_ARCHITECTURE")
            .map(|a| a.ends_with("64"))
            .unwrap_or(false)
}
