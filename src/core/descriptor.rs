//! `package.json` descriptor parsing.
//!
//! A descriptor declares one contrib package: where its source archive
//! lives, which packages it needs first, how to patch it and which commands
//! and build projects turn it into libraries.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resolver::errors::ContribError;

/// Placeholder substituted by the declared version in `url`.
pub const VERSION_TOKEN: &str = "__VERSION__";

/// Check that `name` can be joined onto the source and build roots: one
/// plain path component, no separators of either kind.
pub fn validate_package_name(name: &str) -> Result<(), ContribError> {
    let mut components = Path::new(name).components();
    let single = match (components.next(), components.next()) {
        (Some(Component::Normal(first)), None) => first == name,
        _ => false,
    };
    if !single || name.contains(['/', '\\']) {
        return Err(ContribError::InvalidPackageName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn default_configuration() -> String {
    "Release".to_string()
}

/// Custom command lists, run in the canonical directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomScripts {
    /// Generator invocations (e.g. configuring a meta-build system)
    #[serde(alias = "pre-build")]
    pub pre_build: Vec<String>,

    /// Build-tool invocations
    pub build: Vec<String>,

    /// Commands run after all project builds
    #[serde(alias = "post-build")]
    pub post_build: Vec<String>,
}

/// An immutable package descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub name: String,

    /// Opaque version (tag, release number or commit hash)
    #[serde(default)]
    pub version: String,

    /// Archive URL template containing [`VERSION_TOKEN`]
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub deps: Vec<String>,

    /// Informational only
    #[serde(default)]
    pub use_cmake: bool,

    #[serde(default)]
    pub defines: Vec<String>,

    /// Patches applied with line endings normalized
    #[serde(default)]
    pub patches: Vec<PathBuf>,

    /// Patches applied with CRLF line endings preserved
    #[serde(default, alias = "win-patches")]
    pub win_patches: Vec<PathBuf>,

    /// Build project files, relative to the canonical directory
    #[serde(default, alias = "project-paths")]
    pub project_paths: Vec<PathBuf>,

    /// Empty, or the SDK whose full toolchain environment the build needs
    #[serde(default)]
    pub with_env: String,

    #[serde(default, alias = "custom-scripts")]
    pub custom_scripts: CustomScripts,

    #[serde(default = "default_configuration")]
    pub configuration: String,
}

impl PackageDescriptor {
    /// Load and validate a descriptor file.
    ///
    /// A missing file is [`ContribError::MissingDescriptor`]; unreadable
    /// JSON or a failed validation is [`ContribError::InvalidDescriptor`].
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        validate_package_name(name)?;
        if !path.is_file() {
            return Err(ContribError::MissingDescriptor {
                package: name.to_string(),
                path: path.to_path_buf(),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read descriptor: {}", path.display()))?;

        let descriptor = Self::parse(&contents).map_err(|e| ContribError::InvalidDescriptor {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if descriptor.name != name {
            return Err(ContribError::InvalidDescriptor {
                path: path.to_path_buf(),
                message: format!("declares name `{}`, expected `{}`", descriptor.name, name),
            }
            .into());
        }

        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Parse a descriptor from JSON text without validating it.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }

    /// Check the invariants every descriptor must satisfy.
    pub fn validate(&self) -> Result<()> {
        for dep in &self.deps {
            validate_package_name(dep)?;
        }
        if let Some(patch) = self.patches.iter().find(|p| self.win_patches.contains(p)) {
            return Err(ContribError::OverlappingPatches {
                package: self.name.clone(),
                patch: patch.display().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Archive URL with the version substituted.
    pub fn resolved_url(&self) -> Result<String, ContribError> {
        if self.url.trim().is_empty() {
            return Err(ContribError::MissingUrl {
                package: self.name.clone(),
            });
        }
        Ok(self.url.replace(VERSION_TOKEN, &self.version))
    }

    /// Whether the build must run under the full toolchain environment.
    pub fn wants_toolchain_env(&self) -> bool {
        !self.with_env.trim().is_empty()
    }

    /// Total number of build operations across all phases.
    pub fn declared_operations(&self) -> usize {
        self.custom_scripts.pre_build.len()
            + self.custom_scripts.build.len()
            + self.project_paths.len()
            + self.custom_scripts.post_build.len()
    }
}
