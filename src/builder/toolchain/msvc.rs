//! MSVC environment capture and project-file settings.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::builder::runner::{Dialect, ProcessExecutor};
use crate::resolver::errors::ContribError;

/// Meta-build generator name for a Visual Studio major version.
pub fn generator_name(major_version: u32) -> String {
    match major_version {
        15 => "Visual Studio 15 2017 Win64".to_string(),
        17 => "Visual Studio 17 2022".to_string(),
        v => format!("Visual Studio {} 2019", v),
    }
}

/// Batch line that runs the environment script and dumps the result.
///
/// Quotes are stripped from `PATH` first; `vcvarsall.bat` chokes on them.
pub fn env_command(env_script: &Path, arch: &str, sdk: &str) -> String {
    format!(
        "set path=%path:\"=% && call \"{}\" {} {} && set",
        env_script.display(),
        arch,
        sdk
    )
}

/// Parse `set` output into a variable map.
pub fn parse_environment(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.is_empty() && !key.contains(char::is_whitespace))
        .map(|(key, value)| (key.to_string(), value.trim_end_matches('\r').to_string()))
        .collect()
}

/// Run the environment command and return the variables it prints.
pub(super) fn capture_environment(
    exec: &ProcessExecutor,
    command: &str,
    sdk: &str,
) -> Result<BTreeMap<String, String>> {
    let out = exec.capture(Dialect::Batch, command, &[], None)?;

    let vars = parse_environment(out.text());
    if !out.success() || vars.is_empty() {
        return Err(ContribError::ToolchainEnvironment {
            sdk: sdk.to_string(),
            code: out.code,
            stderr: out.text().to_string(),
        }
        .into());
    }

    tracing::debug!("Captured {} toolchain variables", vars.len());
    Ok(vars)
}

/// Rewrite the SDK and toolset elements of a project file in place.
///
/// Returns the number of elements rewritten; a project without them is
/// left untouched.
pub fn force_project_settings(project: &Path, sdk: &str, toolset: &str) -> Result<usize> {
    let original = std::fs::read_to_string(project)
        .with_context(|| format!("failed to read project: {}", project.display()))?;

    let mut text = original.clone();
    let mut replaced = 0;
    for (element, value) in [("WindowsTargetPlatformVersion", sdk), ("PlatformToolset", toolset)] {
        let re = Regex::new(&format!(r"(?s)<{0}(\s[^>]*)?>.*?</{0}>", element))?;
        let count = re.find_iter(&text).count();
        if count == 0 {
            tracing::debug!("No <{}> in {}", element, project.display());
            continue;
        }

        text = re
            .replace_all(&text, |caps: &Captures<'_>| {
                format!(
                    "<{0}{1}>{2}</{0}>",
                    element,
                    caps.get(1).map_or("", |m| m.as_str()),
                    value
                )
            })
            .into_owned();
        replaced += count;
    }

    if text != original {
        std::fs::write(project, text)
            .with_context(|| format!("failed to write project: {}", project.display()))?;
    }
    Ok(replaced)
}

/// Arguments for one build-tool invocation.
pub fn build_tool_args(
    arch: &str,
    configuration: &str,
    toolset: &str,
    use_env: bool,
    project: &Path,
) -> Vec<String> {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    vec![
        "/nologo".to_string(),
        "/verbosity:normal".to_string(),
        format!("/maxcpucount:{}", cpus),
        format!("/p:Platform={}", arch),
        format!("/p:Configuration={}", configuration),
        format!("/p:PlatformToolset={}", toolset),
        format!("/p:useenv={}", use_env),
        project.display().to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = r#"<Project>
  <PropertyGroup Label="Globals">
    <WindowsTargetPlatformVersion>8.1</WindowsTargetPlatformVersion>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)'=='Debug'" Label="Configuration">
    <PlatformToolset>v140</PlatformToolset>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)'=='Release'" Label="Configuration">
    <PlatformToolset Condition="true">
      v140
    </PlatformToolset>
  </PropertyGroup>
</Project>
"#;

    #[test]
    fn test_generator_names() {
        assert_eq!(generator_name(15), "Visual Studio 15 2017 Win64");
        assert_eq!(generator_name(16), "Visual Studio 16 2019");
        assert_eq!(generator_name(17), "Visual Studio 17 2022");
    }

    #[test]
    fn test_parse_environment() {
        let vars = parse_environment(
            "**********\r\n** Visual Studio 2019 Developer Command Prompt\r\nINCLUDE=C:\\VC\\include;\r\nPath=C:\\a=b;C:\\c\r\n=C:=C:\\\r\n",
        );
        assert_eq!(vars.get("INCLUDE").map(String::as_str), Some("C:\\VC\\include;"));
        assert_eq!(vars.get("Path").map(String::as_str), Some("C:\\a=b;C:\\c"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn test_force_project_settings() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("zlib.vcxproj");
        std::fs::write(&project, PROJECT).unwrap();

        let count = force_project_settings(&project, "10.0.16299.0", "v141").unwrap();
        assert_eq!(count, 3);

        let text = std::fs::read_to_string(&project).unwrap();
        assert!(text.contains("<WindowsTargetPlatformVersion>10.0.16299.0</WindowsTargetPlatformVersion>"));
        assert!(text.contains("<PlatformToolset>v141</PlatformToolset>"));
        assert!(text.contains("<PlatformToolset Condition=\"true\">v141</PlatformToolset>"));
        assert!(!text.contains("v140"));
        assert!(text.contains("'$(Configuration)'=='Debug'"));
    }

    #[test]
    fn test_force_project_settings_without_elements() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("plain.vcxproj");
        std::fs::write(&project, "<Project />\n").unwrap();

        assert_eq!(force_project_settings(&project, "10.0", "v142").unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&project).unwrap(), "<Project />\n");
    }

    #[test]
    fn test_build_tool_args() {
        let args = build_tool_args("x64", "Release", "v141", true, Path::new("zlib.vcxproj"));
        assert_eq!(args[0], "/nologo");
        assert!(args.contains(&"/p:Platform=x64".to_string()));
        assert!(args.contains(&"/p:useenv=true".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("zlib.vcxproj"));
    }
}
