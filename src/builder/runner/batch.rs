//! Native command interpreter.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};

#[cfg(windows)]
use super::system_dir;
use super::{Dialect, ScriptRunner};
use crate::util::process::{find_executable, ProcessBuilder};

/// Runs command lines through `cmd /d /c` on Windows and `sh -c` elsewhere.
#[derive(Debug)]
pub struct BatchRunner {
    configured: Option<PathBuf>,
    interpreter: OnceLock<Option<PathBuf>>,
}

impl BatchRunner {
    pub fn new(configured: Option<PathBuf>) -> Self {
        BatchRunner {
            configured,
            interpreter: OnceLock::new(),
        }
    }

    fn interpreter(&self) -> Result<&PathBuf> {
        self.interpreter
            .get_or_init(|| self.configured.clone().or_else(locate))
            .as_ref()
            .ok_or_else(|| anyhow!("no command interpreter found"))
    }
}

#[cfg(windows)]
fn locate() -> Option<PathBuf> {
    std::env::var_os("ComSpec")
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .or_else(|| system_dir().map(|d| d.join("cmd.exe")).filter(|p| p.exists()))
        .or_else(|| find_executable("cmd"))
}

#[cfg(not(windows))]
fn locate() -> Option<PathBuf> {
    find_executable("sh")
}

impl ScriptRunner for BatchRunner {
    fn dialect(&self) -> Dialect {
        Dialect::Batch
    }

    fn command(&self, script: &str, args: &[String]) -> Result<ProcessBuilder> {
        let mut line = script.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&batch_quote(arg));
        }

        let pb = ProcessBuilder::new(self.interpreter()?);
        if cfg!(windows) {
            // cmd strips one pair of outer quotes from the whole line
            Ok(pb.args(["/d", "/c"]).raw_arg(format!("\"{}\"", line)))
        } else {
            Ok(pb.arg("-c").raw_arg(line))
        }
    }
}

/// Quote an argument for a batch command line.
///
/// Arguments with whitespace or quotes are wrapped in double quotes with
/// inner quotes doubled; everything else is passed unchanged.
pub fn batch_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\"\""))
}
