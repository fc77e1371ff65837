//! Global context for winmake operations.
//!
//! Provides centralized access to the project root and every path derived
//! from it: descriptor sources, the shared build root, build records and the
//! archive cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::Config;

/// File name of a package descriptor.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Global context containing the resolved project layout.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Project root (the directory holding `contrib/`)
    root: PathBuf,

    src_dir: PathBuf,
    build_dir: PathBuf,
    tarball_dir: PathBuf,
    root_package: String,
    root_package_dir: PathBuf,
}

impl GlobalContext {
    /// Create a context rooted at the current working directory.
    pub fn new(config: &Config) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_root(cwd, config))
    }

    /// Create a context rooted at a specific directory.
    pub fn with_root(root: PathBuf, config: &Config) -> Self {
        GlobalContext {
            src_dir: root.join(&config.paths.src),
            build_dir: root.join(&config.paths.build),
            tarball_dir: root.join(&config.paths.tarballs),
            root_package: config.root.name.clone(),
            root_package_dir: root.join(&config.root.dir),
            root,
        }
    }

    /// Get the project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one sub-directory of descriptor and patches per package.
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// Shared build root.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Archive cache.
    pub fn tarball_dir(&self) -> &Path {
        &self.tarball_dir
    }

    /// Source directory of a package (descriptor and patches).
    pub fn package_src_dir(&self, name: &str) -> PathBuf {
        self.src_dir.join(name)
    }

    /// Canonical build directory of a package.
    pub fn canonical_dir(&self, name: &str) -> PathBuf {
        self.build_dir.join(name)
    }

    /// Build record of a package (`<build>/.<name>`).
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.build_dir.join(format!(".{}", name))
    }

    /// Whether `name` is the in-tree root package.
    pub fn is_root_package(&self, name: &str) -> bool {
        self.root_package == name
    }

    /// Directory the root package is built in.
    pub fn root_package_dir(&self) -> &Path {
        &self.root_package_dir
    }

    /// Location of a package's descriptor.
    pub fn descriptor_path(&self, name: &str) -> PathBuf {
        if self.is_root_package(name) {
            self.root_package_dir.join(DESCRIPTOR_FILE)
        } else {
            self.package_src_dir(name).join(DESCRIPTOR_FILE)
        }
    }

    /// Names of all packages with a descriptor under the source dir, sorted.
    pub fn package_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.src_dir.exists() {
            return Ok(names);
        }

        for entry in std::fs::read_dir(&self.src_dir)
            .with_context(|| format!("failed to read directory: {}", self.src_dir.display()))?
        {
            let entry = entry?;
            if entry.path().join(DESCRIPTOR_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }
}
