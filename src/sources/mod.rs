//! Package sources.
//!
//! Sources are responsible for getting a package's code into its canonical
//! build directory: downloading the archive, extracting it and patching
//! the result.

pub mod archive;
pub mod fetch;
pub mod patch;

pub use archive::ArchiveKind;
pub use fetch::{ArchiveFetcher, CommandDownloader, Downloader, HttpDownloader};
pub use patch::{MountProbe, NativeTranslator, PatchApplier, PathTranslator};
