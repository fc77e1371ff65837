//! Archive sniffing and extraction.
//!
//! The kind of an archive is read from its first bytes, never from its
//! file name. Extraction goes through a staging directory inside the build
//! root so a failed extraction never leaves a half-written canonical
//! directory behind.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use zip::ZipArchive;

use crate::resolver::errors::ContribError;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveKind {
    /// Identify an archive from its leading bytes.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0x1f, 0x8b]) {
            Some(ArchiveKind::TarGz)
        } else if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(ArchiveKind::Zip)
        } else if header.len() >= 262 && &header[257..262] == b"ustar" {
            Some(ArchiveKind::Tar)
        } else {
            None
        }
    }

    /// Identify an archive file.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut header = Vec::with_capacity(512);
        File::open(path)
            .with_context(|| format!("failed to open archive: {}", path.display()))?
            .take(512)
            .read_to_end(&mut header)
            .with_context(|| format!("failed to read archive: {}", path.display()))?;

        Self::sniff(&header).ok_or_else(|| {
            ContribError::UnrecognizedArchive {
                path: path.to_path_buf(),
            }
            .into()
        })
    }
}

/// Shared first path component of all entries, if there is exactly one.
pub fn common_prefix<I, P>(entries: I) -> Option<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut prefix: Option<String> = None;
    let mut nested = false;

    for entry in entries {
        let mut components = entry
            .as_ref()
            .components()
            .filter(|c| !matches!(c, Component::CurDir));
        let first = match components.next() {
            Some(Component::Normal(first)) => first.to_string_lossy().into_owned(),
            Some(_) => return None,
            None => continue,
        };
        nested |= components.next().is_some();

        match &prefix {
            None => prefix = Some(first),
            Some(p) if *p == first => {}
            Some(_) => return None,
        }
    }

    // a single top-level file is not a directory prefix
    prefix.filter(|_| nested)
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> ContribError {
    ContribError::CorruptArchive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn open_tar(path: &Path, kind: ArchiveKind) -> Result<Archive<Box<dyn Read>>> {
    let file = BufReader::new(
        File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?,
    );
    let reader: Box<dyn Read> = match kind {
        ArchiveKind::TarGz => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Archive::new(reader))
}

fn tar_entries(path: &Path, kind: ArchiveKind) -> Result<Vec<PathBuf>> {
    let mut archive = open_tar(path, kind)?;
    let mut names = Vec::new();
    for entry in archive.entries().map_err(|e| corrupt(path, e))? {
        let entry = entry.map_err(|e| corrupt(path, e))?;
        if matches!(
            entry.header().entry_type(),
            EntryType::XGlobalHeader | EntryType::XHeader
        ) {
            continue;
        }
        names.push(entry.path().map_err(|e| corrupt(path, e))?.into_owned());
    }
    Ok(names)
}

fn zip_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(path).with_context(|| format!("failed to open archive: {}", path.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(path, e))?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| corrupt(path, e))?;
        let name = entry
            .enclosed_name()
            .ok_or_else(|| corrupt(path, format!("unsafe entry path `{}`", entry.name())))?;
        names.push(name);
    }
    Ok(names)
}

fn unpack(path: &Path, kind: ArchiveKind, dest: &Path) -> Result<()> {
    match kind {
        ArchiveKind::TarGz | ArchiveKind::Tar => open_tar(path, kind)?
            .unpack(dest)
            .map_err(|e| corrupt(path, e).into()),
        ArchiveKind::Zip => {
            let file = File::open(path)
                .with_context(|| format!("failed to open archive: {}", path.display()))?;
            ZipArchive::new(BufReader::new(file))
                .and_then(|mut archive| archive.extract(dest))
                .map_err(|e| corrupt(path, e).into())
        }
    }
}

/// Extract an archive so its contents end up in `canonical`.
///
/// Any previous canonical directory and any staging directory left by an
/// interrupted extraction are removed first. When all entries share one
/// top-level directory, that directory becomes the canonical one;
/// otherwise the entries are placed in it as they are.
pub fn extract(archive: &Path, canonical: &Path) -> Result<()> {
    let kind = ArchiveKind::detect(archive)?;
    let names = match kind {
        ArchiveKind::Zip => zip_entries(archive)?,
        _ => tar_entries(archive, kind)?,
    };
    let prefix = common_prefix(&names);

    let build_root = canonical
        .parent()
        .with_context(|| format!("{} has no parent directory", canonical.display()))?;
    let package = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ensure_dir(build_root)?;

    remove_dir_all_if_exists(canonical)?;
    let staging_prefix = format!(".{}.extract-", package);
    for entry in std::fs::read_dir(build_root)
        .with_context(|| format!("failed to read directory: {}", build_root.display()))?
    {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(&staging_prefix) {
            tracing::debug!("Removing dirty directory {}", entry.path().display());
            remove_dir_all_if_exists(&entry.path())?;
        }
    }

    let staging = tempfile::Builder::new()
        .prefix(&staging_prefix)
        .tempdir_in(build_root)
        .with_context(|| format!("failed to create staging directory in {}", build_root.display()))?;

    tracing::debug!(
        "Extracting {} ({:?}, prefix {:?})",
        archive.display(),
        kind,
        prefix
    );
    unpack(archive, kind, staging.path())?;

    let extracted = match &prefix {
        Some(prefix) => staging.path().join(prefix),
        None => staging.path().to_path_buf(),
    };
    std::fs::rename(&extracted, canonical).with_context(|| {
        format!(
            "failed to move {} to {}",
            extracted.display(),
            canonical.display()
        )
    })?;

    Ok(())
}
