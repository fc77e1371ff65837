//! User-friendly diagnostic messages.
//!
//! Every fatal error is rendered with its root cause, the facts that led to
//! it, and the fixes worth trying.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a package descriptor cannot be found.
    pub const NO_DESCRIPTOR: &str = "Run `winmake list` to see the packages that have a package.json";

    /// Suggestion when a build phase fails.
    pub const BUILD_FAILED: &str = "Run `winmake build <name> --verbose` for more details";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str = "Check your network connection and the package url";

    /// Suggestion when a cached archive is unusable.
    pub const PURGE_ARCHIVES: &str = "Run `winmake purge` to drop the archive cache";

    /// Suggestion when the toolchain cannot be found.
    pub const INSTALL_TOOLCHAIN: &str =
        "Install Visual Studio 2017 or newer with the \"Desktop development with C++\" workload";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("failed to apply patch `0001-fix.patch` to `zlib`")
            .with_location("contrib/src/zlib/0001-fix.patch")
            .with_context("patch exited with code 1")
            .with_suggestion("Rebase the patch on zlib 1.3")
            .with_suggestion("Run `winmake clean zlib` and try again");

        let output = diag.format(false);
        assert!(output.starts_with("error: failed to apply patch"));
        assert!(output.contains("--> contrib/src/zlib/0001-fix.patch"));
        assert!(output.contains("= patch exited with code 1"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("2. Run `winmake clean zlib`"));
    }

    #[test]
    fn test_warning_without_suggestions() {
        let output = Diagnostic::warning("no tarballs to remove").format(false);
        assert_eq!(output, "warning: no tarballs to remove\n");
    }
}
