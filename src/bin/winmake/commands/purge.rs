//! `winmake purge` command

use anyhow::Result;

use crate::commands::GlobalOpts;
use winmake::ops;
use winmake::util::diagnostic::{emit, Diagnostic};

pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let (ctx, _) = opts.load(None, None)?;

    let removed = ops::purge(&ctx)?;
    if removed.is_empty() {
        emit(
            &Diagnostic::warning("no archives to remove").with_location(ctx.tarball_dir()),
            false,
        );
        return Ok(());
    }

    for path in &removed {
        eprintln!("     Removed {}", path.display());
    }
    eprintln!("      Purged {} archive(s) from {}", removed.len(), ctx.tarball_dir().display());

    Ok(())
}
