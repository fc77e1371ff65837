//! High-level operations.
//!
//! This module contains the implementation of winmake commands.

pub mod clean;
pub mod list;
pub mod purge;
pub mod resolve;
pub mod workspace;

pub use clean::{clean, CLEAN_ALL};
pub use list::{list, PackageState, PackageStatus};
pub use purge::{purge, ARCHIVE_PATTERNS};
pub use resolve::{resolve, resolve_all};
pub use workspace::Workspace;
