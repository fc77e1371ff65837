//! Patch application.
//!
//! Line-ending-normalized patches go through `patch` in the POSIX shell
//! and need POSIX paths; CRLF-preserving patches go through `git apply`
//! on native paths. All normalized patches are applied first. The first
//! failure stops the package and nothing is rolled back.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Result;

use crate::builder::runner::{to_args, Dialect, ProcessExecutor};
use crate::core::PackageDescriptor;
use crate::resolver::errors::ContribError;
use crate::util::context::GlobalContext;

/// How the POSIX shell sees Windows drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountFlavor {
    /// Subsystem shell: `C:\src` is `/mnt/c/src`
    Subsystem,
    /// Emulation layer (Git Bash, MSYS): `C:\src` is `/c/src`
    Emulation,
}

/// Translate a native path for the POSIX shell.
///
/// Paths without a drive letter only get their separators flipped.
pub fn translate(path: &Path, flavor: MountFlavor) -> String {
    let text = path.display().to_string().replace('\\', "/");
    let bytes = text.as_bytes();
    if bytes.len() < 2 || bytes[1] != b':' || !bytes[0].is_ascii_alphabetic() {
        return text;
    }

    let drive = (bytes[0] as char).to_ascii_lowercase();
    let rest = &text[2..];
    match flavor {
        MountFlavor::Subsystem => format!("/mnt/{}{}", drive, rest),
        MountFlavor::Emulation => format!("/{}{}", drive, rest),
    }
}

/// Maps native paths to paths the POSIX shell understands.
pub trait PathTranslator: Send + Sync {
    fn to_posix(&self, exec: &ProcessExecutor, path: &Path) -> Result<String>;
}

/// Finds the mount flavor by asking the shell for its working directory.
#[derive(Debug, Default)]
pub struct MountProbe {
    flavor: OnceLock<MountFlavor>,
}

impl MountProbe {
    pub fn new() -> Self {
        MountProbe {
            flavor: OnceLock::new(),
        }
    }

    fn flavor(&self, exec: &ProcessExecutor) -> Result<MountFlavor> {
        if let Some(flavor) = self.flavor.get() {
            return Ok(*flavor);
        }

        let out = exec.capture(Dialect::Posix, "pwd", &[], None)?;
        let flavor = if out.text().trim_start().starts_with("/mnt/") {
            MountFlavor::Subsystem
        } else {
            MountFlavor::Emulation
        };
        tracing::debug!("POSIX shell mount flavor: {:?}", flavor);
        Ok(*self.flavor.get_or_init(|| flavor))
    }
}

impl PathTranslator for MountProbe {
    fn to_posix(&self, exec: &ProcessExecutor, path: &Path) -> Result<String> {
        Ok(translate(path, self.flavor(exec)?))
    }
}

/// Translator for hosts whose native paths already are POSIX paths.
#[derive(Debug, Default)]
pub struct NativeTranslator;

impl PathTranslator for NativeTranslator {
    fn to_posix(&self, _exec: &ProcessExecutor, path: &Path) -> Result<String> {
        Ok(path.display().to_string())
    }
}

/// Applies a package's patches to its canonical directory.
pub struct PatchApplier<'a> {
    ctx: &'a GlobalContext,
    exec: &'a ProcessExecutor,
    translator: &'a dyn PathTranslator,
}

impl<'a> PatchApplier<'a> {
    pub fn new(
        ctx: &'a GlobalContext,
        exec: &'a ProcessExecutor,
        translator: &'a dyn PathTranslator,
    ) -> Self {
        PatchApplier {
            ctx,
            exec,
            translator,
        }
    }

    /// Apply every patch of the descriptor inside `dir`.
    ///
    /// Returns the number of patches applied.
    pub fn apply(&self, desc: &PackageDescriptor, dir: &Path) -> Result<usize> {
        let src = self.ctx.package_src_dir(&desc.name);

        for patch in &desc.patches {
            let path = self.locate(desc, &src, patch)?;
            let posix = self.translator.to_posix(self.exec, &path)?;
            tracing::info!("Applying patch {}", patch.display());
            let out = self
                .exec
                .run(Dialect::Posix, "patch", &to_args(["-flp1", "-i", posix.as_str()]), Some(dir))?;
            check(desc, patch, out.code, out.text())?;
        }

        for patch in &desc.win_patches {
            let path = self.locate(desc, &src, patch)?;
            tracing::info!("Applying patch {} (CRLF)", patch.display());
            let mut args = to_args(["apply", "--reject", "--ignore-whitespace", "--whitespace=fix"]);
            args.push(path.display().to_string());
            let out = self.exec.run(Dialect::Batch, "git", &args, Some(dir))?;
            check(desc, patch, out.code, out.text())?;
        }

        Ok(desc.patches.len() + desc.win_patches.len())
    }

    fn locate(&self, desc: &PackageDescriptor, src: &Path, patch: &Path) -> Result<PathBuf> {
        let path = src.join(patch);
        if !path.is_file() {
            return Err(ContribError::MissingPatch {
                package: desc.name.clone(),
                patch: path,
            }
            .into());
        }
        Ok(path)
    }
}

fn check(desc: &PackageDescriptor, patch: &Path, code: i32, stderr: &str) -> Result<()> {
    if code != 0 {
        return Err(ContribError::PatchFailed {
            package: desc.name.clone(),
            patch: patch.to_path_buf(),
            code,
            stderr: stderr.to_string(),
        }
        .into());
    }
    Ok(())
}
