//! winmake CLI - fetch, patch and build native contrib packages

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::GlobalOpts;
use winmake::util::diagnostic;
use winmake::ContribError;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<ContribError>() {
            Some(err) => diagnostic::emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = match &cli.log_level {
        Some(directive) => EnvFilter::try_new(directive)?,
        None if cli.verbose => EnvFilter::new("winmake=debug"),
        None => EnvFilter::new("winmake=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let opts = GlobalOpts {
        project_dir: cli.project_dir,
    };

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &opts),
        Commands::Clean(args) => commands::clean::execute(args, &opts),
        Commands::Purge => commands::purge::execute(&opts),
        Commands::List => commands::list::execute(&opts),
    }
}
