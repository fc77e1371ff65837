//! winmake - a native contrib build orchestrator
//!
//! This crate provides the core library functionality for winmake:
//! package descriptors, dependency resolution, archive fetching, patching
//! and driving the native toolchain through each package's build phases.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test doubles and fixtures for winmake unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides recording script runners, a fake toolchain locator, an
/// in-memory downloader and throwaway project layouts.
#[cfg(test)]
pub mod test_support;

pub use crate::core::PackageDescriptor;
pub use ops::Workspace;
pub use resolver::{ContribError, DependencyResolver};
pub use util::config::Config;
pub use util::context::GlobalContext;
