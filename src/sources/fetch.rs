//! Source archive download.
//!
//! Archives are cached in the tarball directory under the last segment of
//! their URL. A cached archive is reused, but it is still validated by
//! extracting it; a corrupt one is deleted and fetched once more.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use crate::builder::runner::{to_args, Dialect, ProcessExecutor};
use crate::core::PackageDescriptor;
use crate::resolver::errors::ContribError;
use crate::sources::archive;
use crate::util::context::GlobalContext;
use crate::util::fs::{ensure_dir, remove_file_if_exists};
use crate::util::hash::sha256_file;

/// Downloads a URL to a file.
pub trait Downloader: Send + Sync {
    /// Short name used in logs and error reports.
    fn name(&self) -> &str;

    fn download(&self, exec: &ProcessExecutor, url: &str, dest: &Path) -> Result<()>;
}

/// In-process HTTP downloader.
#[derive(Debug, Default)]
pub struct HttpDownloader;

impl HttpDownloader {
    pub fn new() -> Self {
        HttpDownloader
    }
}

impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        "http"
    }

    fn download(&self, _exec: &ProcessExecutor, url: &str, dest: &Path) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("winmake/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;

        let response = client
            .get(url)
            .send()
            .with_context(|| format!("failed to download {}", url))?;
        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let pb = match response.content_length() {
            Some(len) if len > 0 => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                pb.set_message(
                    dest.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
                pb
            }
            _ => ProgressBar::hidden(),
        };

        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let file = File::create(&part)
            .with_context(|| format!("failed to create {}", part.display()))?;
        let mut writer = BufWriter::new(file);
        let mut reader = pb.wrap_read(response);
        let copied = std::io::copy(&mut reader, &mut writer);
        pb.finish_and_clear();

        if let Err(e) = copied.and_then(|_| std::io::Write::flush(&mut writer)) {
            drop(writer);
            let _ = std::fs::remove_file(&part);
            return Err(e).with_context(|| format!("failed to read response body from {}", url));
        }
        drop(writer);

        std::fs::rename(&part, dest)
            .with_context(|| format!("failed to move {} to {}", part.display(), dest.display()))
    }
}

/// Downloader that delegates to an external command.
///
/// On Windows this is `Invoke-WebRequest` through the script host;
/// elsewhere `wget` through the batch dialect.
#[derive(Debug, Clone)]
pub struct CommandDownloader {
    dialect: Dialect,
}

impl CommandDownloader {
    pub fn new() -> Self {
        let dialect = if cfg!(windows) {
            Dialect::ScriptHost
        } else {
            Dialect::Batch
        };
        CommandDownloader { dialect }
    }

    fn command(&self, url: &str, dest: &Path) -> (&'static str, Vec<String>) {
        let dest = dest.display().to_string();
        match self.dialect {
            Dialect::ScriptHost => (
                "Invoke-WebRequest",
                to_args(["-Uri", url, "-OutFile", dest.as_str()]),
            ),
            _ => (
                "wget",
                to_args([
                    url,
                    "-O",
                    dest.as_str(),
                    "--no-check-certificate",
                    "--retry-connrefused",
                    "--waitretry=1",
                    "--read-timeout=20",
                    "--timeout=15",
                    "--tries=4",
                ]),
            ),
        }
    }
}

impl Default for CommandDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for CommandDownloader {
    fn name(&self) -> &str {
        match self.dialect {
            Dialect::ScriptHost => "Invoke-WebRequest",
            _ => "wget",
        }
    }

    fn download(&self, exec: &ProcessExecutor, url: &str, dest: &Path) -> Result<()> {
        let (script, args) = self.command(url, dest);
        let out = exec.run(self.dialect, script, &args, None)?;
        if !out.success() {
            bail!("`{}` exited with code {}", script, out.code);
        }
        Ok(())
    }
}

/// File name of the archive behind a URL.
pub fn archive_name(url: &str) -> Option<String> {
    let from_path = |path: &str| {
        path.rsplit('/')
            .find(|s| !s.is_empty())
            .map(str::to_string)
    };

    match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string)),
        Err(_) => from_path(url),
    }
}

/// Downloads and extracts package archives.
pub struct ArchiveFetcher<'a> {
    ctx: &'a GlobalContext,
    exec: &'a ProcessExecutor,
    primary: &'a dyn Downloader,
    secondary: Option<&'a dyn Downloader>,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(
        ctx: &'a GlobalContext,
        exec: &'a ProcessExecutor,
        primary: &'a dyn Downloader,
        secondary: Option<&'a dyn Downloader>,
    ) -> Self {
        ArchiveFetcher {
            ctx,
            exec,
            primary,
            secondary,
        }
    }

    /// Fetch and extract a package into its canonical directory.
    pub fn fetch(&self, desc: &PackageDescriptor) -> Result<PathBuf> {
        self.fetch_with_retry(desc, true)
    }

    fn fetch_with_retry(&self, desc: &PackageDescriptor, retry: bool) -> Result<PathBuf> {
        let url = desc.resolved_url()?;
        let name = archive_name(&url).ok_or_else(|| ContribError::DownloadFailed {
            url: url.clone(),
            attempts: vec!["the URL does not name a file".to_string()],
        })?;
        let archive_path = self.ctx.tarball_dir().join(&name);
        let canonical = self.ctx.canonical_dir(&desc.name);

        if !archive_path.is_file() {
            tracing::info!("Fetching {} from {}", desc.name, url);
            self.download(&url, &archive_path)?;
            archive::extract(&archive_path, &canonical)?;
            return Ok(canonical);
        }

        tracing::info!("{} already exists in the archive cache", name);
        match archive::extract(&archive_path, &canonical) {
            Ok(()) => Ok(canonical),
            Err(e) if retry && is_bad_archive(&e) => {
                tracing::warn!("Cached archive {} is unusable ({}), fetching it again", name, e);
                remove_file_if_exists(&archive_path)?;
                self.fetch_with_retry(desc, false)
            }
            Err(e) => Err(e),
        }
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        ensure_dir(self.ctx.tarball_dir())?;

        let mut attempts = Vec::new();
        let downloaders = std::iter::once(self.primary).chain(self.secondary);
        for (i, downloader) in downloaders.enumerate() {
            if i > 0 {
                tracing::warn!("Download failed, using {} instead", downloader.name());
            }

            match downloader.download(self.exec, url, dest) {
                Ok(()) if dest.is_file() => {
                    tracing::debug!("Downloaded {} (sha256 {})", url, sha256_file(dest)?);
                    return Ok(());
                }
                Ok(()) => attempts.push(format!("{}: no file was written", downloader.name())),
                Err(e) => attempts.push(format!("{}: {:#}", downloader.name(), e)),
            }
            remove_file_if_exists(dest)?;
        }

        Err(ContribError::DownloadFailed {
            url: url.to_string(),
            attempts,
        }
        .into())
    }
}

fn is_bad_archive(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ContribError>(),
        Some(ContribError::CorruptArchive { .. } | ContribError::UnrecognizedArchive { .. })
    )
}
