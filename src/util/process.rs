//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    raw_args: Vec<String>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            raw_args: Vec::new(),
            env: BTreeMap::new(),
            env_clear: false,
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Add an argument that is passed through without any quoting on
    /// Windows (needed for `cmd /c` command lines). Elsewhere it is an
    /// ordinary argument.
    pub fn raw_arg(mut self, arg: impl Into<String>) -> Self {
        self.raw_args.push(arg.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Start from an empty environment instead of inheriting the parent's.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            for raw in &self.raw_args {
                cmd.raw_arg(raw);
            }
        }
        #[cfg(not(windows))]
        cmd.args(&self.raw_args);

        if self.env_clear {
            cmd.env_clear();
        }

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command, capturing both output streams.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute with stdout inherited and stderr forwarded line by line.
    ///
    /// Returns the exit code (`-1` when killed by a signal) and whatever
    /// the process wrote to stderr.
    pub fn exec_streaming(&self) -> Result<(i32, String)> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let mut captured = String::new();
        let forwarded = match child.stderr.take() {
            Some(stderr) => forward_lines(stderr, &mut captured),
            None => Ok(()),
        };

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;
        forwarded.context("failed to read child stderr")?;

        Ok((status.code().unwrap_or(-1), captured))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.extend(self.raw_args.iter().cloned());
        parts.join(" ")
    }
}

/// Copy `stream` to our stderr line by line as raw bytes, keeping a lossy
/// UTF-8 copy in `captured`.
fn forward_lines(stream: impl Read, captured: &mut String) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut parent = std::io::stderr();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        let _ = parent.write_all(&line);
        captured.push_str(&String::from_utf8_lossy(&line));
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
