//! POSIX shell.

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};

use super::{system_dir, Dialect, ScriptRunner, CI_ENV_VAR};
use crate::util::process::{find_executable, ProcessBuilder};

/// Runs commands through `bash -c`.
///
/// On CI the Git for Windows shell is preferred; otherwise the subsystem
/// shell in the system directory, then whatever `bash` is on `PATH`.
#[derive(Debug)]
pub struct PosixRunner {
    configured: Option<PathBuf>,
    interpreter: OnceLock<Option<PathBuf>>,
}

impl PosixRunner {
    pub fn new(configured: Option<PathBuf>) -> Self {
        PosixRunner {
            configured,
            interpreter: OnceLock::new(),
        }
    }

    fn interpreter(&self) -> Result<&PathBuf> {
        self.interpreter
            .get_or_init(|| self.configured.clone().or_else(locate))
            .as_ref()
            .ok_or_else(|| anyhow!("no POSIX shell found"))
    }
}

fn locate() -> Option<PathBuf> {
    if std::env::var_os(CI_ENV_VAR).is_some() {
        let git_bash = std::env::var_os("ProgramFiles")
            .map(|pf| PathBuf::from(pf).join("Git").join("bin").join("bash.exe"))
            .filter(|p| p.exists());
        if git_bash.is_some() {
            return git_bash;
        }
    }

    system_dir()
        .map(|d| d.join("bash.exe"))
        .filter(|p| p.exists())
        .or_else(|| find_executable("bash"))
}

impl ScriptRunner for PosixRunner {
    fn dialect(&self) -> Dialect {
        Dialect::Posix
    }

    fn command(&self, script: &str, args: &[String]) -> Result<ProcessBuilder> {
        let mut line = script.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(&posix_quote(arg));
        }
        Ok(ProcessBuilder::new(self.interpreter()?).arg("-c").arg(line))
    }
}

/// Quote an argument for a POSIX shell command line.
pub fn posix_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_quote() {
        assert_eq!(posix_quote("/mnt/c/src/fix.patch"), "/mnt/c/src/fix.patch");
        assert_eq!(posix_quote("-flp1"), "-flp1");
        assert_eq!(posix_quote("a b"), "'a b'");
        assert_eq!(posix_quote("it's"), "'it'\\''s'");
        assert_eq!(posix_quote(""), "''");
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_survive_the_shell() {
        if find_executable("bash").is_none() {
            return;
        }
        let runner = PosixRunner::new(None);
        let out = runner
            .command("printf '%s|'", &["it's".to_string(), "two words".to_string()])
            .unwrap()
            .exec()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout), "it's|two words|");
    }
}
