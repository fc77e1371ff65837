//! Configuration file support for winmake.
//!
//! A project may carry a `winmake.toml` next to its sources. Every key is
//! optional; a missing file means defaults. Command-line flags are applied
//! on top with [`Config::with_overrides`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "winmake.toml";

/// Default Windows SDK used when a descriptor does not ask for one.
pub const DEFAULT_SDK: &str = "10.0.16299.0";

/// Default platform toolset forced into every project file.
pub const DEFAULT_TOOLSET: &str = "v141";

/// winmake configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Contrib directory layout
    pub paths: PathsConfig,

    /// Toolchain selection
    pub toolchain: ToolchainConfig,

    /// Interpreter overrides
    pub shell: ShellConfig,

    /// Network settings
    pub net: NetConfig,

    /// The in-tree root package
    pub root: RootConfig,
}

/// Contrib directory layout, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Package descriptors and patches (`<src>/<name>/package.json`)
    pub src: PathBuf,

    /// Shared build root holding canonical directories and build records
    pub build: PathBuf,

    /// Downloaded archive cache
    pub tarballs: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            src: PathBuf::from("contrib").join("src"),
            build: PathBuf::from("contrib").join("build"),
            tarballs: PathBuf::from("contrib").join("tarballs"),
        }
    }
}

/// Toolchain selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Windows SDK version
    pub sdk: String,

    /// Platform toolset (e.g. v141)
    pub toolset: String,

    /// Target platform passed to the build tool and the environment script
    pub arch: String,

    /// Directory holding the installer-locator utility
    pub installer_root: Option<PathBuf>,

    /// Oldest accepted toolchain major version
    pub min_version: u32,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            sdk: DEFAULT_SDK.to_string(),
            toolset: DEFAULT_TOOLSET.to_string(),
            arch: "x64".to_string(),
            installer_root: None,
            min_version: 15,
        }
    }
}

/// Explicit interpreter locations, one per script dialect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub batch: Option<PathBuf>,
    pub script_host: Option<PathBuf>,
    pub posix: Option<PathBuf>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Try the secondary downloader when the primary one fails
    pub fallback: bool,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig { fallback: true }
    }
}

/// The package built in place from the project tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    pub name: String,
    pub dir: PathBuf,
}

impl Default for RootConfig {
    fn default() -> Self {
        RootConfig {
            name: "daemon".to_string(),
            dir: PathBuf::from("msvc"),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load `winmake.toml` from the project root, or defaults if absent.
    pub fn discover(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if path.exists() {
            tracing::debug!("Using configuration {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides (a `None` keeps the configured value).
    pub fn with_overrides(mut self, sdk: Option<String>, toolset: Option<String>) -> Self {
        if let Some(sdk) = sdk {
            self.toolchain.sdk = sdk;
        }
        if let Some(toolset) = toolset {
            self.toolchain.toolset = toolset;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.toolchain.sdk, DEFAULT_SDK);
        assert_eq!(config.toolchain.toolset, DEFAULT_TOOLSET);
        assert_eq!(config.toolchain.arch, "x64");
        assert_eq!(config.paths.build, PathBuf::from("contrib").join("build"));
        assert_eq!(config.root.name, "daemon");
        assert!(config.net.fallback);
    }

    #[test]
    fn test_config_load_partial() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[toolchain]
toolset = "v142"

[paths]
build = "out/contrib"

[net]
fallback = false
"#,
        )
        .unwrap();

        let config = Config::discover(tmp.path()).unwrap();
        assert_eq!(config.toolchain.toolset, "v142");
        assert_eq!(config.toolchain.sdk, DEFAULT_SDK);
        assert_eq!(config.paths.build, PathBuf::from("out/contrib"));
        assert_eq!(config.paths.src, PathBuf::from("contrib").join("src"));
        assert!(!config.net.fallback);
    }

    #[test]
    fn test_config_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::discover(tmp.path()).unwrap();
        assert_eq!(config.toolchain.sdk, DEFAULT_SDK);
    }

    #[test]
    fn test_config_malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "[toolchain\nsdk = 1").unwrap();
        assert!(Config::discover(tmp.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(Some("10.0.18362.0".into()), None);
        assert_eq!(config.toolchain.sdk, "10.0.18362.0");
        assert_eq!(config.toolchain.toolset, DEFAULT_TOOLSET);
    }
}
