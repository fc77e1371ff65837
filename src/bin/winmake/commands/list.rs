//! `winmake list` command

use anyhow::Result;

use crate::commands::GlobalOpts;
use winmake::ops;

pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let (ctx, _) = opts.load(None, None)?;

    let statuses = ops::list(&ctx)?;
    if statuses.is_empty() {
        eprintln!("No packages found in {}", ctx.src_dir().display());
        return Ok(());
    }

    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for status in &statuses {
        let version = status.declared.as_deref().unwrap_or("-");
        let recorded = match &status.recorded {
            Some(v) if Some(v.as_str()) != status.declared.as_deref() => format!(" (built {})", v),
            _ => String::new(),
        };
        println!(
            "{:<width$}  {:<12} {}{}",
            status.name,
            version,
            status.state,
            recorded,
            width = width
        );
    }

    Ok(())
}
