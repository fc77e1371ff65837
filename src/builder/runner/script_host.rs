//! Script-hosting interpreter (PowerShell).

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};

use super::{system_dir, Dialect, ScriptRunner};
use crate::util::process::{find_executable, ProcessBuilder};

/// Runs scripts with the execution policy bypassed.
#[derive(Debug)]
pub struct ScriptHostRunner {
    configured: Option<PathBuf>,
    interpreter: OnceLock<Option<PathBuf>>,
}

impl ScriptHostRunner {
    pub fn new(configured: Option<PathBuf>) -> Self {
        ScriptHostRunner {
            configured,
            interpreter: OnceLock::new(),
        }
    }

    fn interpreter(&self) -> Result<&PathBuf> {
        self.interpreter
            .get_or_init(|| self.configured.clone().or_else(locate))
            .as_ref()
            .ok_or_else(|| anyhow!("no PowerShell interpreter found"))
    }
}

fn locate() -> Option<PathBuf> {
    system_dir()
        .map(|d| {
            d.join("WindowsPowerShell")
                .join("v1.0")
                .join("powershell.exe")
        })
        .filter(|p| p.exists())
        .or_else(|| find_executable("powershell"))
        .or_else(|| find_executable("pwsh"))
}

impl ScriptRunner for ScriptHostRunner {
    fn dialect(&self) -> Dialect {
        Dialect::ScriptHost
    }

    fn command(&self, script: &str, args: &[String]) -> Result<ProcessBuilder> {
        Ok(ProcessBuilder::new(self.interpreter()?)
            .args(["-NoProfile", "-ExecutionPolicy", "ByPass"])
            .arg(script)
            .args(args))
    }
}
