//! Building contrib packages.
//!
//! This module holds the process execution layer, the native toolchain
//! service, the build phases and the build records.

pub mod orchestrator;
pub mod record;
pub mod runner;
pub mod toolchain;

pub use orchestrator::{BuildOrchestrator, BuildReport, Phase};
pub use record::{BuildRecord, BuildRecordStore};
pub use runner::{Dialect, ProcessExecutor, RunnerRegistry, ScriptOutput, ScriptRunner};
pub use toolchain::{Installation, ToolchainEnvironment, ToolchainLocator, VsWhereLocator};
