//! Package resolution operations.

use anyhow::Result;

use crate::ops::Workspace;
use crate::resolver::DependencyResolver;

/// Resolve one package and its dependencies.
///
/// Returns whether the package was rebuilt.
pub fn resolve(ws: &Workspace, name: &str, force: bool) -> Result<bool> {
    DependencyResolver::new(ws).resolve(name, force)
}

/// Resolve every package with a descriptor under the source dir, in name
/// order, sharing one resolver so each package is visited once.
pub fn resolve_all(ws: &Workspace, force: bool) -> Result<Vec<(String, bool)>> {
    let names = ws.ctx().package_names()?;
    if names.is_empty() {
        tracing::warn!("No package descriptors under {}", ws.ctx().src_dir().display());
    }

    let mut resolver = DependencyResolver::new(ws);
    let mut results = Vec::with_capacity(names.len());
    for name in names {
        let rebuilt = resolver.resolve(&name, force)?;
        results.push((name, rebuilt));
    }
    Ok(results)
}
