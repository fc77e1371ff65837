//! Test utilities and mocks for winmake unit tests.
//!
//! The doubles here stand in for the three external seams of a
//! resolution: script runners, the toolchain locator and the downloaders.
//! Each one records what it was asked to do so tests can assert on it
//! after handing ownership to the code under test.
//!
//! # Example
//!
//! ```rust,ignore
//! use winmake::test_support::RecordingRunner;
//!
//! let runner = RecordingRunner::new(Dialect::Batch).fail_on("nmake", 2);
//! let log = runner.log();
//! // register the runner, run a build...
//! assert_eq!(log.lock().unwrap()[0].script, "nmake");
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::builder::runner::{Capture, Dialect, Environment, Invocation, ScriptOutput, ScriptRunner};
use crate::builder::toolchain::{Installation, ToolchainLocator};
use crate::builder::ProcessExecutor;
use crate::resolver::errors::ContribError;
use crate::sources::Downloader;
use crate::util::process::ProcessBuilder;

/// Orders calls across every runner of a test.
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// One command seen by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub dialect: Dialect,
    pub script: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub capture: Capture,
    /// Whether the command ran with the toolchain environment
    pub toolchain_env: bool,
    /// Global call order
    pub seq: usize,
}

/// Script runner that records invocations instead of spawning processes.
///
/// Every call succeeds unless its script was registered with
/// [`fail_on`](Self::fail_on). Calls capturing stdout get the text set with
/// [`with_stdout`](Self::with_stdout).
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    dialect: Dialect,
    stdout: String,
    failures: HashMap<String, i32>,
    log: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingRunner {
    pub fn new(dialect: Dialect) -> Self {
        RecordingRunner {
            dialect,
            stdout: String::new(),
            failures: HashMap::new(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Text returned to callers capturing stdout.
    pub fn with_stdout(mut self, stdout: &str) -> Self {
        self.stdout = stdout.to_string();
        self
    }

    /// Exit with `code` whenever exactly `script` is run.
    pub fn fail_on(mut self, script: &str, code: i32) -> Self {
        self.failures.insert(script.to_string(), code);
        self
    }

    /// Shared handle on the recorded calls.
    pub fn log(&self) -> Arc<Mutex<Vec<RecordedCall>>> {
        Arc::clone(&self.log)
    }
}

impl ScriptRunner for RecordingRunner {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn command(&self, script: &str, args: &[String]) -> Result<ProcessBuilder> {
        Ok(ProcessBuilder::new("recorded").arg(script).args(args))
    }

    fn execute(&self, invocation: &Invocation<'_>) -> Result<ScriptOutput> {
        let call = RecordedCall {
            dialect: self.dialect,
            script: invocation.script.to_string(),
            args: invocation.args.to_vec(),
            cwd: invocation.cwd.map(Path::to_path_buf),
            capture: invocation.capture,
            toolchain_env: matches!(invocation.environment, Environment::Toolchain(_)),
            seq: SEQUENCE.fetch_add(1, Ordering::SeqCst),
        };
        self.log
            .lock()
            .map_err(|_| anyhow::anyhow!("recording log poisoned"))?
            .push(call);

        if let Some(&code) = self.failures.get(invocation.script) {
            return Ok(ScriptOutput::new(code, format!("{} failed\n", invocation.script)));
        }

        match invocation.capture {
            Capture::Stdout => Ok(ScriptOutput::new(0, self.stdout.clone())),
            Capture::Stderr => Ok(ScriptOutput::new(0, String::new())),
        }
    }
}

/// Toolchain locator returning a fixed installation.
#[derive(Debug, Clone)]
pub struct FakeLocator {
    installation: Option<Installation>,
    calls: Arc<AtomicUsize>,
}

impl FakeLocator {
    /// An installation of the given major version under `C:\VS`.
    pub fn new(major_version: u32) -> Self {
        let root = PathBuf::from(r"C:\VS");
        FakeLocator {
            installation: Some(Installation {
                build_tool: root.join("MSBuild").join("Current").join("Bin").join("MSBuild.exe"),
                env_script: root.join("VC").join("Auxiliary").join("Build").join("vcvarsall.bat"),
                path: root,
                major_version,
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A host without any installation.
    pub fn missing() -> Self {
        FakeLocator {
            installation: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of lookups performed so far.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ToolchainLocator for FakeLocator {
    fn locate(&self) -> Result<Installation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.installation {
            Some(installation) => Ok(installation.clone()),
            None => Err(ContribError::ToolchainNotFound {
                reason: "no installation in test".to_string(),
            }
            .into()),
        }
    }
}

#[derive(Debug, Default)]
struct Served {
    default: Option<Vec<u8>>,
    routes: Vec<(String, Vec<u8>)>,
    requests: Vec<String>,
}

/// Downloader serving canned bytes.
///
/// Clones share their state, so a test can keep one and box the other.
#[derive(Debug, Clone, Default)]
pub struct StaticDownloader {
    served: Arc<Mutex<Served>>,
}

impl StaticDownloader {
    /// Serve `body` for every URL.
    pub fn serving(body: Vec<u8>) -> Self {
        let downloader = StaticDownloader::default();
        if let Ok(mut served) = downloader.served.lock() {
            served.default = Some(body);
        }
        downloader
    }

    /// Fail every download.
    pub fn failing() -> Self {
        StaticDownloader::default()
    }

    /// Serve `body` for URLs containing `fragment`.
    pub fn with(self, fragment: &str, body: Vec<u8>) -> Self {
        if let Ok(mut served) = self.served.lock() {
            served.routes.push((fragment.to_string(), body));
        }
        self
    }

    /// URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.served
            .lock()
            .map(|served| served.requests.clone())
            .unwrap_or_default()
    }
}

impl Downloader for StaticDownloader {
    fn name(&self) -> &str {
        "static"
    }

    fn download(&self, _exec: &ProcessExecutor, url: &str, dest: &Path) -> Result<()> {
        let mut served = self
            .served
            .lock()
            .map_err(|_| anyhow::anyhow!("downloader state poisoned"))?;
        served.requests.push(url.to_string());

        let body = served
            .routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, body)| body.clone())
            .or_else(|| served.default.clone());

        match body {
            Some(body) => {
                if let Some(parent) = dest.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(dest, body)?;
                Ok(())
            }
            None => bail!("404 Not Found: {}", url),
        }
    }
}

/// Assertion helpers for testing.
pub mod assertions {
    use crate::resolver::errors::ContribError;

    /// Assert that an error carries a [`ContribError`] and return it.
    pub fn contrib_error(err: &anyhow::Error) -> &ContribError {
        match err.downcast_ref::<ContribError>() {
            Some(e) => e,
            None => panic!("expected a contrib error, got: {:#}", err),
        }
    }

    /// Assert that an error's message contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, expected: &str) {
        match result {
            Ok(v) => panic!("expected error containing '{}', got Ok({:?})", expected, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(expected),
                    "expected error containing '{}', got: {}",
                    expected,
                    msg
                );
            }
        }
    }
}
