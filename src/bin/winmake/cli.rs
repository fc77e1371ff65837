//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// winmake - fetch, patch and build native contrib packages
#[derive(Parser)]
#[command(name = "winmake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter directive (overrides --verbose), e.g. `winmake=trace`
    #[arg(long, global = true, env = "WINMAKE_LOG")]
    pub log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project root holding the contrib directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a package and its dependencies, building what is out of date
    Build(BuildArgs),

    /// Remove a package's build directory and record, or the whole build root
    Clean(CleanArgs),

    /// Delete every cached archive
    Purge,

    /// List packages and their build state
    List,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Package name, or `all` for every package under the source dir
    pub name: String,

    /// Fetch, patch and build the package even if it is up to date
    #[arg(short, long)]
    pub force: bool,

    /// Windows SDK version used by packages that do not choose one
    #[arg(long)]
    pub sdk: Option<String>,

    /// Platform toolset forced into build projects
    #[arg(long)]
    pub toolset: Option<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Package name, or `all` for the whole build root
    pub name: String,
}
