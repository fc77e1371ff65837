//! `winmake build` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::GlobalOpts;
use winmake::builder::toolchain::host_is_64bit;
use winmake::ops::{self, Workspace};

/// Target name that builds every package.
const BUILD_ALL: &str = "all";

pub fn execute(args: BuildArgs, opts: &GlobalOpts) -> Result<()> {
    if cfg!(windows) && !host_is_64bit() {
        bail!("winmake requires a 64-bit Windows host");
    }

    let (ctx, config) = opts.load(args.sdk, args.toolset)?;
    tracing::debug!(
        "SDK {}, toolset {}, arch {}",
        config.toolchain.sdk,
        config.toolchain.toolset,
        config.toolchain.arch
    );
    let ws = Workspace::new(ctx, config);

    let results = if args.name == BUILD_ALL {
        ops::resolve_all(&ws, args.force)?
    } else {
        let rebuilt = ops::resolve(&ws, &args.name, args.force)?;
        vec![(args.name, rebuilt)]
    };

    for (name, rebuilt) in &results {
        if *rebuilt {
            eprintln!("    Finished {}", name);
        } else {
            eprintln!("    Fresh {}", name);
        }
    }

    Ok(())
}
