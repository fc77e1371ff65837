//! Dependency resolution.
//!
//! Resolution is a depth-first walk over package descriptors. Each package
//! first resolves its dependencies; a dependency that was rebuilt forces
//! its dependents to rebuild too. A package whose build record is current
//! is left alone, any other one goes through fetch, patch, build and
//! record.

pub mod errors;

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;

pub use errors::ContribError;

use crate::builder::BuildRecordStore;
use crate::core::PackageDescriptor;
use crate::ops::Workspace;

/// Where a package is in its resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    CheckingCache,
    UpToDate,
    Fetching,
    Patching,
    Building,
    Recorded,
    Failed,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolveState::CheckingCache => "checking cache",
            ResolveState::UpToDate => "up to date",
            ResolveState::Fetching => "fetching",
            ResolveState::Patching => "patching",
            ResolveState::Building => "building",
            ResolveState::Recorded => "recorded",
            ResolveState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Resolves packages and their dependencies within one run.
pub struct DependencyResolver<'a> {
    ws: &'a Workspace,
    records: BuildRecordStore,
    in_progress: Vec<String>,
    resolved: HashMap<String, bool>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(ws: &'a Workspace) -> Self {
        DependencyResolver {
            ws,
            records: ws.records(),
            in_progress: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    /// Resolve a package, returning whether it was rebuilt.
    ///
    /// `force` applies to this package only; dependencies are resolved
    /// normally. A package seen earlier in the run is not resolved again
    /// unless it is forced and was not rebuilt the first time.
    pub fn resolve(&mut self, name: &str, force: bool) -> Result<bool> {
        if let Some(pos) = self.in_progress.iter().position(|n| n == name) {
            let mut cycle = self.in_progress[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(ContribError::CyclicDependency { cycle }.into());
        }

        if let Some(&rebuilt) = self.resolved.get(name) {
            if !force || rebuilt {
                return Ok(rebuilt);
            }
        }

        self.in_progress.push(name.to_string());
        let result = self.resolve_package(name, force);
        self.in_progress.pop();

        match result {
            Ok(rebuilt) => {
                self.resolved.insert(name.to_string(), rebuilt);
                Ok(rebuilt)
            }
            Err(e) => {
                transition(name, ResolveState::Failed);
                Err(e)
            }
        }
    }

    fn resolve_package(&mut self, name: &str, force: bool) -> Result<bool> {
        let ws = self.ws;
        let ctx = ws.ctx();
        tracing::info!("Resolving {}", name);
        let desc = PackageDescriptor::load(name, &ctx.descriptor_path(name))?;

        let mut dep_rebuilt = false;
        for dep in &desc.deps {
            if self.resolve(dep, false)? {
                dep_rebuilt = true;
            } else {
                tracing::info!("{} up to date", dep);
            }
        }

        if ctx.is_root_package(name) {
            transition(name, ResolveState::Building);
            ws.orchestrator().build(&desc, ctx.root_package_dir())?;
            return Ok(true);
        }

        transition(name, ResolveState::CheckingCache);
        let record = self.records.read(name)?;
        let up_to_date = self.records.is_up_to_date(&desc)?;
        if up_to_date && !dep_rebuilt && !force {
            transition(name, ResolveState::UpToDate);
            return Ok(false);
        }

        if let Some(record) = &record {
            tracing::info!("{} currently at {}", name, record.version);
        }
        if force {
            tracing::info!("Forcing fetch/patch/build for {}", name);
        } else if up_to_date {
            tracing::info!("{} must be rebuilt, a dependency changed", name);
        } else {
            tracing::info!("{} is not up to date", name);
        }

        let canonical = ctx.canonical_dir(name);
        let same_version = record.as_ref().is_some_and(|r| r.version == desc.version);
        if force || !canonical.is_dir() || !same_version {
            // a fresh extraction that never reaches a build must not look reusable
            self.records.remove(name)?;

            transition(name, ResolveState::Fetching);
            let dir = ws.fetcher().fetch(&desc)?;

            transition(name, ResolveState::Patching);
            ws.patcher().apply(&desc, &dir)?;
        } else {
            tracing::debug!("{}: reusing {}", name, canonical.display());
        }

        transition(name, ResolveState::Building);
        let report = ws.orchestrator().build(&desc, &canonical)?;
        tracing::debug!("{}: {} of {} operations", name, report.executed, report.declared);

        self.records.write(&desc)?;
        transition(name, ResolveState::Recorded);
        tracing::info!("Built {} {}", name, desc.version);
        Ok(true)
    }
}

fn transition(name: &str, state: ResolveState) {
    tracing::debug!("{}: {}", name, state);
}
