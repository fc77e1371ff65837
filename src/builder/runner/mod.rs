//! Script runners and the process executor.
//!
//! Every external command goes through one of three dialects. Each dialect
//! is a [`ScriptRunner`] that owns its interpreter lookup and its quoting
//! rules; the [`RunnerRegistry`] selects one by [`Dialect`], and the
//! [`ProcessExecutor`] adds the environment (base or toolchain) and the
//! working directory.

mod batch;
mod posix;
mod script_host;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{anyhow, Result};

use crate::util::config::ShellConfig;
use crate::util::process::ProcessBuilder;

pub use batch::{batch_quote, BatchRunner};
pub use posix::{posix_quote, PosixRunner};
pub use script_host::ScriptHostRunner;

/// CI variable that switches the POSIX shell to the Git for Windows one.
pub const CI_ENV_VAR: &str = "JENKINS_URL";

/// Shell dialect used to run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Native command interpreter (`cmd /c` on Windows, `sh -c` elsewhere)
    Batch,
    /// Script-hosting interpreter (PowerShell) with the policy bypass flag
    ScriptHost,
    /// POSIX shell (`bash -c`)
    Posix,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Batch => write!(f, "batch"),
            Dialect::ScriptHost => write!(f, "script-host"),
            Dialect::Posix => write!(f, "posix"),
        }
    }
}

/// Which stream is returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Stream both to the parent and return stderr (the default)
    Stderr,
    /// Return stdout without echoing it (probes and environment dumps)
    Stdout,
}

/// Environment a command runs with.
#[derive(Debug, Clone, Copy)]
pub enum Environment<'a> {
    /// Parent environment plus these project variables
    Base(&'a BTreeMap<String, String>),
    /// Exactly these variables
    Toolchain(&'a BTreeMap<String, String>),
}

impl Environment<'_> {
    fn apply(&self, pb: ProcessBuilder) -> ProcessBuilder {
        match self {
            Environment::Base(vars) => pb.envs(vars.iter()),
            Environment::Toolchain(vars) => pb.env_clear().envs(vars.iter()),
        }
    }
}

/// One command to run.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub script: &'a str,
    pub args: &'a [String],
    pub cwd: Option<&'a Path>,
    pub environment: Environment<'a>,
    pub capture: Capture,
}

/// Exit code and captured text of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    pub code: i32,
    /// Captured stream, `None` when the process wrote nothing to it
    pub text: Option<String>,
}

impl ScriptOutput {
    pub fn new(code: i32, text: String) -> Self {
        ScriptOutput {
            code,
            text: if text.trim().is_empty() { None } else { Some(text) },
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// The captured text, or an empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A shell dialect: interpreter lookup plus invocation and quoting rules.
pub trait ScriptRunner: Send + Sync {
    /// The dialect this runner implements.
    fn dialect(&self) -> Dialect;

    /// Build the command line for `script` followed by `args`.
    fn command(&self, script: &str, args: &[String]) -> Result<ProcessBuilder>;

    /// Run an invocation and wait for it to exit.
    fn execute(&self, invocation: &Invocation<'_>) -> Result<ScriptOutput> {
        let mut pb = self.command(invocation.script, invocation.args)?;
        pb = invocation.environment.apply(pb);
        if let Some(cwd) = invocation.cwd {
            pb = pb.cwd(cwd);
        }

        tracing::debug!("[{}] {}", self.dialect(), pb.display_command());

        match invocation.capture {
            Capture::Stderr => {
                let (code, stderr) = pb.exec_streaming()?;
                Ok(ScriptOutput::new(code, stderr))
            }
            Capture::Stdout => {
                let output = pb.exec()?;
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    tracing::debug!("{}", stderr.trim_end());
                }
                Ok(ScriptOutput::new(
                    output.status.code().unwrap_or(-1),
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                ))
            }
        }
    }
}

/// Registry of the script runners, one per dialect.
pub struct RunnerRegistry {
    runners: HashMap<Dialect, Box<dyn ScriptRunner>>,
}

impl RunnerRegistry {
    /// Create a registry with the built-in runners.
    ///
    /// No interpreter is looked up here; each runner locates its
    /// interpreter the first time it is used.
    pub fn new(shell: &ShellConfig) -> Self {
        let mut registry = RunnerRegistry::empty();
        registry.register(Box::new(BatchRunner::new(shell.batch.clone())));
        registry.register(Box::new(ScriptHostRunner::new(shell.script_host.clone())));
        registry.register(Box::new(PosixRunner::new(shell.posix.clone())));
        registry
    }

    /// Create a registry without any runner.
    pub fn empty() -> Self {
        RunnerRegistry {
            runners: HashMap::new(),
        }
    }

    /// Register a runner, replacing the one for the same dialect.
    pub fn register(&mut self, runner: Box<dyn ScriptRunner>) {
        self.runners.insert(runner.dialect(), runner);
    }

    /// Get the runner for a dialect.
    pub fn get(&self, dialect: Dialect) -> Result<&dyn ScriptRunner> {
        self.runners
            .get(&dialect)
            .map(|r| r.as_ref())
            .ok_or_else(|| anyhow!("no {} runner registered", dialect))
    }
}

/// Runs commands under a dialect with the active environment.
///
/// Commands start with the base environment (parent environment plus the
/// project variables). Once [`ProcessExecutor::switch_to_toolchain`] has
/// been called, every later command gets exactly the toolchain variables.
pub struct ProcessExecutor {
    runners: RunnerRegistry,
    project_env: BTreeMap<String, String>,
    toolchain_env: OnceLock<BTreeMap<String, String>>,
}

impl ProcessExecutor {
    pub fn new(runners: RunnerRegistry, project_env: BTreeMap<String, String>) -> Self {
        ProcessExecutor {
            runners,
            project_env,
            toolchain_env: OnceLock::new(),
        }
    }

    /// Project variables added to the base environment.
    pub fn project_env(&self) -> &BTreeMap<String, String> {
        &self.project_env
    }

    /// Switch every later command to the toolchain environment.
    ///
    /// Returns `false` (and keeps the first set) when already switched.
    pub fn switch_to_toolchain(&self, vars: BTreeMap<String, String>) -> bool {
        self.toolchain_env.set(vars).is_ok()
    }

    /// Whether commands run under the toolchain environment.
    pub fn uses_toolchain_env(&self) -> bool {
        self.toolchain_env.get().is_some()
    }

    fn environment(&self) -> Environment<'_> {
        match self.toolchain_env.get() {
            Some(vars) => Environment::Toolchain(vars),
            None => Environment::Base(&self.project_env),
        }
    }

    /// Run a command, streaming its output and returning its stderr.
    pub fn run(
        &self,
        dialect: Dialect,
        script: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ScriptOutput> {
        self.invoke(dialect, script, args, cwd, Capture::Stderr)
    }

    /// Run a command and return its stdout.
    pub fn capture(
        &self,
        dialect: Dialect,
        script: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ScriptOutput> {
        self.invoke(dialect, script, args, cwd, Capture::Stdout)
    }

    fn invoke(
        &self,
        dialect: Dialect,
        script: &str,
        args: &[String],
        cwd: Option<&Path>,
        capture: Capture,
    ) -> Result<ScriptOutput> {
        let invocation = Invocation {
            script,
            args,
            cwd,
            environment: self.environment(),
            capture,
        };
        self.runners.get(dialect)?.execute(&invocation)
    }
}

/// Convert a list of string-likes into owned arguments.
pub fn to_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

/// The Windows system directory as seen by this process.
///
/// A 32-bit process on a 64-bit host must go through `Sysnative` to reach
/// the real `System32`.
pub fn system_dir() -> Option<PathBuf> {
    let root = std::env::var_os("SystemRoot").or_else(|| std::env::var_os("windir"))?;
    let redirected = cfg!(target_pointer_width = "32")
        && std::env::var_os("PROCESSOR_ARCHITEW6432").is_some();
    let sys = if redirected { "Sysnative" } else { "System32" };
    Some(PathBuf::from(root).join(sys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_output_empty_text_is_none() {
        let out = ScriptOutput::new(0, "  \n".to_string());
        assert!(out.success());
        assert_eq!(out.text, None);
        assert_eq!(out.text(), "");

        let out = ScriptOutput::new(2, "boom\n".to_string());
        assert!(!out.success());
        assert_eq!(out.text(), "boom\n");
    }

    #[test]
    fn test_registry_replaces_by_dialect() {
        let mut registry = RunnerRegistry::new(&ShellConfig::default());
        assert!(registry.get(Dialect::Posix).is_ok());

        registry.register(Box::new(PosixRunner::new(Some(PathBuf::from("/opt/bash")))));
        let pb = registry
            .get(Dialect::Posix)
            .unwrap()
            .command("pwd", &[])
            .unwrap();
        assert_eq!(pb.get_program(), Path::new("/opt/bash"));

        assert!(RunnerRegistry::empty().get(Dialect::Batch).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_base_environment_carries_project_vars() {
        let mut vars = BTreeMap::new();
        vars.insert("CONTRIB_BUILD_DIR".to_string(), "/tmp/contrib/build".to_string());
        let exec = ProcessExecutor::new(RunnerRegistry::new(&ShellConfig::default()), vars);

        let out = exec
            .capture(Dialect::Batch, "echo $CONTRIB_BUILD_DIR", &[], None)
            .unwrap();
        assert!(out.success());
        assert_eq!(out.text().trim(), "/tmp/contrib/build");
        assert!(!exec.uses_toolchain_env());
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_switches_environment_once() {
        let mut base = BTreeMap::new();
        base.insert("CONTRIB_SRC_DIR".to_string(), "base".to_string());
        let exec = ProcessExecutor::new(RunnerRegistry::new(&ShellConfig::default()), base);

        let mut toolchain = BTreeMap::new();
        toolchain.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        toolchain.insert("INCLUDE".to_string(), "vc-include".to_string());
        assert!(exec.switch_to_toolchain(toolchain));
        assert!(!exec.switch_to_toolchain(BTreeMap::new()));

        let out = exec
            .capture(
                Dialect::Batch,
                "echo ${INCLUDE:-none}:${CONTRIB_SRC_DIR:-none}",
                &[],
                None,
            )
            .unwrap();
        assert_eq!(out.text().trim(), "vc-include:none");
    }

    #[cfg(unix)]
    #[test]
    fn test_executor_runs_in_cwd_and_returns_stderr() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("marker"), "").unwrap();
        let exec = ProcessExecutor::new(
            RunnerRegistry::new(&ShellConfig::default()),
            BTreeMap::new(),
        );

        let out = exec
            .run(Dialect::Batch, "test -f marker && echo bad >&2 && exit 4", &[], Some(tmp.path()))
            .unwrap();
        assert_eq!(out.code, 4);
        assert_eq!(out.text(), "bad\n");
    }
}
