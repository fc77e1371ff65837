//! Hashing utilities for checksums and source tree fingerprints.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Compute SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    feed_reader(&mut hasher, file)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compute a content hash of a whole directory tree.
///
/// Every regular file contributes its path relative to `root` (with `/`
/// separators) and its bytes, visited in sorted order. Timestamps and
/// permissions are ignored, so touching a file does not change the hash.
pub fn sha256_dir(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        hasher.update(relative.as_bytes());
        hasher.update(b"\0");

        let file = File::open(entry.path()).with_context(|| {
            format!("failed to open file for hashing: {}", entry.path().display())
        })?;
        feed_reader(&mut hasher, file)?;
        hasher.update(b"\0");
    }

    Ok(hex::encode(hasher.finalize()))
}

fn feed_reader(hasher: &mut Sha256, file: File) -> Result<()> {
    let mut reader = BufReader::new(file);
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sha256_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();

        let hash = sha256_file(&path).unwrap();
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha256_dir_tracks_content_and_names() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("zlib");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/zlib.c"), "int z;").unwrap();
        std::fs::write(root.join("zlib.proj"), "<Project/>").unwrap();

        let first = sha256_dir(&root).unwrap();
        assert_eq!(first, sha256_dir(&root).unwrap());

        // Rewriting identical bytes keeps the hash.
        std::fs::write(root.join("zlib.proj"), "<Project/>").unwrap();
        assert_eq!(first, sha256_dir(&root).unwrap());

        std::fs::write(root.join("zlib.proj"), "<Project></Project>").unwrap();
        assert_ne!(first, sha256_dir(&root).unwrap());
    }

    #[test]
    fn test_sha256_dir_is_location_independent() {
        let tmp = TempDir::new().unwrap();
        for dir in ["a", "b"] {
            let root = tmp.path().join(dir);
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(root.join("file.txt"), "same").unwrap();
        }

        assert_eq!(
            sha256_dir(&tmp.path().join("a")).unwrap(),
            sha256_dir(&tmp.path().join("b")).unwrap()
        );
    }
}
