//! Archive cache purging.

use std::path::PathBuf;

use anyhow::Result;

use crate::util::context::GlobalContext;
use crate::util::fs::{glob_files, remove_file_if_exists};

/// Archive file patterns removed from the cache.
pub const ARCHIVE_PATTERNS: &[&str] = &["*.tar*", "*.tgz*", "*.zip*"];

/// Delete every cached archive.
///
/// Returns the removed files.
pub fn purge(ctx: &GlobalContext) -> Result<Vec<PathBuf>> {
    let dir = ctx.tarball_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let files = glob_files(dir, ARCHIVE_PATTERNS)?;
    for file in &files {
        remove_file_if_exists(file)?;
        tracing::debug!("Removed {}", file.display());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_purge_removes_archives_only() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_root(tmp.path().to_path_buf(), &Config::default());
        let dir = ctx.tarball_dir();
        std::fs::create_dir_all(dir).unwrap();
        for file in ["zlib-1.3.tar.gz", "opus.tgz", "pjproject.zip", "msgpack.tar.gz.part", "NOTES.txt"] {
            std::fs::write(dir.join(file), "").unwrap();
        }

        let removed = purge(&ctx).unwrap();
        assert_eq!(removed.len(), 4);
        assert!(dir.join("NOTES.txt").is_file());
        assert!(!dir.join("pjproject.zip").exists());
    }

    #[test]
    fn test_purge_without_cache() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_root(tmp.path().to_path_buf(), &Config::default());
        assert!(purge(&ctx).unwrap().is_empty());
    }
}
