//! Core data structures for winmake.

pub mod descriptor;

pub use descriptor::{validate_package_name, CustomScripts, PackageDescriptor, VERSION_TOKEN};
