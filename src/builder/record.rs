//! Build records.
//!
//! A package counts as up to date when its record holds the declared
//! version and the content hash of its canonical directory still matches
//! the hash stored at the last successful build. Modification times are
//! never consulted.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::PackageDescriptor;
use crate::util::context::GlobalContext;
use crate::util::fs::{read_to_string, remove_file_if_exists, write_string};
use crate::util::hash::sha256_dir;

/// What was recorded for the last successful build of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub version: String,

    /// Content hash of the canonical directory, absent in old records
    pub hash: Option<String>,
}

/// Reads and writes the per-package build records under the build root.
#[derive(Debug, Clone)]
pub struct BuildRecordStore {
    build_dir: PathBuf,
}

impl BuildRecordStore {
    pub fn new(ctx: &GlobalContext) -> Self {
        BuildRecordStore {
            build_dir: ctx.build_dir().to_path_buf(),
        }
    }

    /// `<build>/.<name>`, holding the version.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.build_dir.join(format!(".{}", name))
    }

    /// `<build>/.<name>.sha256`, holding the content hash.
    pub fn hash_path(&self, name: &str) -> PathBuf {
        self.build_dir.join(format!(".{}.sha256", name))
    }

    fn canonical_dir(&self, name: &str) -> PathBuf {
        self.build_dir.join(name)
    }

    /// Read the record of a package, if there is one.
    pub fn read(&self, name: &str) -> Result<Option<BuildRecord>> {
        let path = self.record_path(name);
        if !path.is_file() {
            return Ok(None);
        }

        let version = read_to_string(&path)?.trim_end().to_string();
        let hash_path = self.hash_path(name);
        let hash = if hash_path.is_file() {
            Some(read_to_string(&hash_path)?.trim().to_string())
        } else {
            None
        };

        Ok(Some(BuildRecord { version, hash }))
    }

    /// Whether the last successful build matches the descriptor and the
    /// canonical directory is unchanged since.
    pub fn is_up_to_date(&self, desc: &PackageDescriptor) -> Result<bool> {
        let Some(record) = self.read(&desc.name)? else {
            tracing::debug!("{}: no build record", desc.name);
            return Ok(false);
        };

        if record.version != desc.version {
            tracing::debug!(
                "{}: recorded version {} differs from {}",
                desc.name,
                record.version,
                desc.version
            );
            return Ok(false);
        }

        let Some(recorded_hash) = record.hash else {
            tracing::debug!("{}: build record has no content hash", desc.name);
            return Ok(false);
        };

        let dir = self.canonical_dir(&desc.name);
        if !dir.is_dir() {
            tracing::debug!("{}: {} is missing", desc.name, dir.display());
            return Ok(false);
        }

        let current = sha256_dir(&dir)?;
        if current != recorded_hash {
            tracing::debug!("{}: sources changed since the last build", desc.name);
            return Ok(false);
        }

        Ok(true)
    }

    /// Record a successful build of the descriptor's version.
    ///
    /// The hash is written before the version so an interrupted write
    /// leaves the package stale.
    pub fn write(&self, desc: &PackageDescriptor) -> Result<()> {
        let hash = sha256_dir(&self.canonical_dir(&desc.name))?;
        write_string(&self.hash_path(&desc.name), &hash)?;
        write_string(&self.record_path(&desc.name), &desc.version)?;
        tracing::debug!("{}: recorded {} ({})", desc.name, desc.version, &hash[..12]);
        Ok(())
    }

    /// Forget the record of a package.
    pub fn remove(&self, name: &str) -> Result<()> {
        remove_file_if_exists(&self.record_path(name))?;
        remove_file_if_exists(&self.hash_path(name))
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }
}
