//! Command implementations

pub mod build;
pub mod clean;
pub mod list;
pub mod purge;

use std::path::PathBuf;

use anyhow::{Context, Result};

use winmake::util::config::Config;
use winmake::util::context::GlobalContext;

/// Options shared by every command.
pub struct GlobalOpts {
    pub project_dir: Option<PathBuf>,
}

impl GlobalOpts {
    /// Load the project configuration and build the context.
    pub fn load(&self, sdk: Option<String>, toolset: Option<String>) -> Result<(GlobalContext, Config)> {
        let root = match &self.project_dir {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("project directory not found: {}", dir.display()))?,
            None => std::env::current_dir().context("failed to get current directory")?,
        };

        let config = Config::discover(&root)?.with_overrides(sdk, toolset);
        let ctx = GlobalContext::with_root(root, &config);
        Ok((ctx, config))
    }
}
