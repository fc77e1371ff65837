//! Error taxonomy for contrib resolution.
//!
//! Every failure that ends a resolution is one of these variants. They are
//! raised deep in the pipeline, travel up as `anyhow::Error`, and are turned
//! into a diagnostic and an exit code by the binary only.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fatal error while resolving a contrib package.
#[derive(Debug, Error)]
pub enum ContribError {
    // Configuration
    #[error("no package descriptor for `{package}`")]
    MissingDescriptor { package: String, path: PathBuf },

    #[error("invalid package name `{name}`")]
    InvalidPackageName { name: String },

    #[error("invalid package descriptor {path}: {message}")]
    InvalidDescriptor { path: PathBuf, message: String },

    #[error("`{package}` has no url in its package descriptor")]
    MissingUrl { package: String },

    #[error("`{package}` lists `{patch}` as both a normalized and a CRLF patch")]
    OverlappingPatches { package: String, patch: String },

    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    // Fetch
    #[error("failed to download `{url}`")]
    DownloadFailed { url: String, attempts: Vec<String> },

    #[error("unrecognized archive kind: {path}")]
    UnrecognizedArchive { path: PathBuf },

    #[error("failed to extract {path}: {message}")]
    CorruptArchive { path: PathBuf, message: String },

    // Patch
    #[error("patch `{patch}` for `{package}` does not exist")]
    MissingPatch { package: String, patch: PathBuf },

    #[error("failed to apply patch `{patch}` to `{package}`")]
    PatchFailed {
        package: String,
        patch: PathBuf,
        code: i32,
        stderr: String,
    },

    // Toolchain discovery
    #[error("no compatible toolchain found: {reason}")]
    ToolchainNotFound { reason: String },

    #[error("toolchain environment script failed for SDK `{sdk}`")]
    ToolchainEnvironment { sdk: String, code: i32, stderr: String },

    // Build
    #[error("build project `{project}` of `{package}` does not exist")]
    MissingProject { package: String, project: PathBuf },

    #[error("{phase} command failed for `{package}`: {command}")]
    BuildCommandFailed {
        package: String,
        phase: String,
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("`{package}` ran {executed} of {declared} build operations")]
    OperationCountMismatch {
        package: String,
        declared: usize,
        executed: usize,
    },
}

impl ContribError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());

        match self {
            ContribError::MissingDescriptor { path, .. } => diag
                .with_location(path)
                .with_suggestion(suggestions::NO_DESCRIPTOR),

            ContribError::InvalidPackageName { .. } => diag
                .with_context("a package name is a single directory name under the source dir")
                .with_suggestion(suggestions::NO_DESCRIPTOR),

            ContribError::InvalidDescriptor { path, .. } => diag
                .with_location(path)
                .with_suggestion("Fix the JSON syntax or the field types of the descriptor"),

            ContribError::MissingUrl { package } => diag.with_suggestion(format!(
                "Add a `url` containing `__VERSION__` to the descriptor of `{}`",
                package
            )),

            ContribError::OverlappingPatches { .. } => diag.with_suggestion(
                "Keep each patch in exactly one of `patches` and `win_patches`",
            ),

            ContribError::CyclicDependency { .. } => diag.with_suggestion(
                "Break the cycle by removing one of the `deps` entries",
            ),

            ContribError::DownloadFailed { attempts, .. } => {
                let mut diag = diag;
                for attempt in attempts {
                    diag = diag.with_context(attempt.clone());
                }
                diag.with_suggestion(suggestions::FETCH_FAILED)
            }

            ContribError::UnrecognizedArchive { path } => diag
                .with_location(path)
                .with_context("only tar, tar.gz and zip archives are supported")
                .with_suggestion(suggestions::PURGE_ARCHIVES),

            ContribError::CorruptArchive { path, .. } => diag
                .with_location(path)
                .with_suggestion(suggestions::PURGE_ARCHIVES),

            ContribError::MissingPatch { patch, .. } => diag.with_location(patch),

            ContribError::PatchFailed {
                package,
                patch,
                code,
                stderr,
            } => with_stderr(diag.with_location(patch).with_context(format!("exit code {}", code)), stderr)
                .with_suggestion(format!("Rebase the patch on the declared version of `{}`", package))
                .with_suggestion(format!(
                    "Run `winmake clean {}` to start from a fresh extraction",
                    package
                )),

            ContribError::ToolchainNotFound { .. } => {
                diag.with_suggestion(suggestions::INSTALL_TOOLCHAIN)
            }

            ContribError::ToolchainEnvironment { code, stderr, .. } => {
                with_stderr(diag.with_context(format!("exit code {}", code)), stderr)
                    .with_suggestion("Install the requested Windows SDK or pass another with --sdk")
            }

            ContribError::MissingProject { project, .. } => diag.with_location(project),

            ContribError::BuildCommandFailed { code, stderr, .. } => {
                with_stderr(diag.with_context(format!("exit code {}", code)), stderr)
                    .with_suggestion(suggestions::BUILD_FAILED)
            }

            ContribError::OperationCountMismatch { .. } => diag
                .with_context("a build phase stopped before all of its operations ran")
                .with_suggestion(suggestions::BUILD_FAILED),
        }
    }
}

fn with_stderr(diag: Diagnostic, stderr: &str) -> Diagnostic {
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(last) => diag.with_context(format!("stderr: {}", last.trim())),
        None => diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = ContribError::CyclicDependency {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
    }

    #[test]
    fn test_patch_failed_diagnostic() {
        let err = ContribError::PatchFailed {
            package: "zlib".into(),
            patch: PathBuf::from("contrib/src/zlib/fix.patch"),
            code: 1,
            stderr: "1 out of 2 hunks FAILED\n\n".into(),
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("failed to apply patch"));
        assert!(output.contains("exit code 1"));
        assert!(output.contains("stderr: 1 out of 2 hunks FAILED"));
        assert!(output.contains("winmake clean zlib"));
    }

    #[test]
    fn test_count_mismatch_message() {
        let err = ContribError::OperationCountMismatch {
            package: "ffmpeg".into(),
            declared: 6,
            executed: 5,
        };
        assert_eq!(err.to_string(), "`ffmpeg` ran 5 of 6 build operations");
    }
}
