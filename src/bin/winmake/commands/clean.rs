//! `winmake clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::GlobalOpts;
use winmake::ops;

pub fn execute(args: CleanArgs, opts: &GlobalOpts) -> Result<()> {
    let (ctx, _) = opts.load(None, None)?;

    let removed = ops::clean(&ctx, &args.name)?;
    if removed.is_empty() {
        eprintln!("     Nothing to remove for {}", args.name);
    }
    for path in removed {
        eprintln!("     Removed {}", path.display());
    }

    Ok(())
}
