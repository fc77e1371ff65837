//! Removal of build outputs.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::BuildRecordStore;
use crate::core::validate_package_name;
use crate::util::context::GlobalContext;
use crate::util::fs::remove_dir_all_if_exists;

/// Target name that cleans the whole build root.
pub const CLEAN_ALL: &str = "all";

/// Remove the canonical directory and build record of `target`, or the
/// whole build root when `target` is [`CLEAN_ALL`].
///
/// Returns the paths that existed and were removed.
pub fn clean(ctx: &GlobalContext, target: &str) -> Result<Vec<PathBuf>> {
    let candidates = if target == CLEAN_ALL {
        vec![ctx.build_dir().to_path_buf()]
    } else {
        validate_package_name(target)?;
        let records = BuildRecordStore::new(ctx);
        vec![
            ctx.canonical_dir(target),
            records.record_path(target),
            records.hash_path(target),
        ]
    };

    let mut removed = Vec::new();
    for path in candidates {
        if path.is_dir() {
            remove_dir_all_if_exists(&path)?;
        } else if path.exists() {
            std::fs::remove_file(&path)?;
        } else {
            continue;
        }
        tracing::debug!("Removed {}", path.display());
        removed.push(path);
    }
    Ok(removed)
}
