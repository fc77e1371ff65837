//! Test fixtures for common test scenarios.
//!
//! [`ProjectFixture`] lays out a throwaway project tree (descriptors,
//! patches and the root package) and wires a [`Workspace`] over it with
//! recording doubles in place of every external service.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use super::{FakeLocator, RecordingRunner, StaticDownloader};
use crate::builder::runner::{Dialect, RunnerRegistry};
use crate::builder::toolchain::ToolchainLocator;
use crate::ops::Workspace;
use crate::sources::NativeTranslator;
use crate::util::config::Config;
use crate::util::context::{GlobalContext, DESCRIPTOR_FILE};

/// A temporary project root.
pub struct ProjectFixture {
    dir: TempDir,
    config: Config,
}

impl ProjectFixture {
    /// Create an empty project with the default configuration.
    pub fn new() -> Self {
        ProjectFixture {
            dir: TempDir::new().unwrap(),
            config: Config::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ctx(&self) -> GlobalContext {
        GlobalContext::with_root(self.root().to_path_buf(), &self.config)
    }

    /// Write a package descriptor; the package name is read from the JSON.
    pub fn package(&self, json: &str) -> PathBuf {
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let name = value["name"].as_str().unwrap();
        let path = self.ctx().descriptor_path(name);
        write(&path, json);
        path
    }

    /// Write a file next to a package's descriptor (a patch, usually).
    pub fn package_file(&self, package: &str, file: &str, contents: &str) -> PathBuf {
        let path = self.ctx().package_src_dir(package).join(file);
        write(&path, contents);
        path
    }

    /// Write the descriptor of the in-tree root package.
    pub fn root_package(&self, json: &str) -> PathBuf {
        let path = self.ctx().root_package_dir().join(DESCRIPTOR_FILE);
        write(&path, json);
        path
    }

    /// A workspace using `runners` (missing dialects record silently), a
    /// version 16 toolchain and `downloader` without a fallback.
    pub fn workspace(&self, runners: Vec<RecordingRunner>, downloader: StaticDownloader) -> Workspace {
        Workspace::from_parts(
            self.ctx(),
            self.config.clone(),
            registry(runners),
            Box::new(FakeLocator::new(16)),
            Box::new(downloader),
            None,
            Box::new(NativeTranslator),
        )
    }

    /// A workspace with recording runners, no working downloader and the
    /// given toolchain locator.
    pub fn workspace_with_locator(&self, locator: Box<dyn ToolchainLocator>) -> Workspace {
        Workspace::from_parts(
            self.ctx(),
            self.config.clone(),
            registry(Vec::new()),
            locator,
            Box::new(StaticDownloader::failing()),
            None,
            Box::new(NativeTranslator),
        )
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn registry(runners: Vec<RecordingRunner>) -> RunnerRegistry {
    let mut registry = RunnerRegistry::empty();
    for dialect in [Dialect::Batch, Dialect::ScriptHost, Dialect::Posix] {
        registry.register(Box::new(RecordingRunner::new(dialect)));
    }
    for runner in runners {
        registry.register(Box::new(runner));
    }
    registry
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// A gzip-compressed tarball holding `(path, contents)` entries.
pub fn tar_gz_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A zip archive holding `(path, contents)` entries.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, contents) in entries {
        writer
            .start_file(*path, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
