//! Rule-based validation of Claude Code configuration trees.
//!
//! Each validator inspects one artifact and returns a list of [`Finding`]s. Nothing in
//! this module fails with an `Err` because of what it finds: a missing CLAUDE.md or a
//! malformed `.mcp.json` is a finding like any other, and the caller decides what to do
//! with it (print it, gate CI on it, or hand it to the [`autofix`] module).
//!
//! # Validators
//!
//! | Validator | Input | Checks |
//! |-----------|-------|--------|
//! | [`claude_md::ClaudeMdValidator`] | `CLAUDE.md` | headers, mandated sections, `@include` references, long lines |
//! | [`settings::SettingsValidator`] | `settings.json` | `permissions.allow` / `permissions.deny` shape, deprecated keys |
//! | [`mcp::McpValidator`] | config directory | `mcpServers` shape, command resolution, optional process probe |
//! | [`template::TemplateValidator`] | template directory | required files, command library layout, framework expectations |
//! | [`tree::TreeChecker`] | `templates/` root | the structural invariants for every template at once |
//!
//! [`health::HealthChecker`] runs the project-level validators together and scores the
//! result.

pub mod autofix;
pub mod claude_md;
pub mod health;
pub mod mcp;
pub mod settings;
pub mod template;
pub mod tree;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How serious a finding is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, never affects exit status
    Info,
    /// Should be fixed; fails validation only in strict mode
    Warning,
    /// Invalid configuration
    Error,
    /// Configuration is unusable; fails the health check
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One result of a validation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub level: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub auto_fixable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Finding {
    pub fn new(level: Severity, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            file_path: None,
            line_number: None,
            suggestion: None,
            auto_fixable: false,
            metadata: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line_number = Some(line);
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub const fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Error or critical.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level >= Severity::Error
    }

    /// Warning, error or critical.
    #[must_use]
    pub fn is_warning_or_above(&self) -> bool {
        self.level >= Severity::Warning
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        if let Some(path) = &self.file_path {
            write!(f, " ({}", path.display())?;
            if let Some(line) = self.line_number {
                write!(f, ":{line}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Counts of findings per severity bucket. Critical counts as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindingCounts {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl FindingCounts {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.level {
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Error | Severity::Critical => counts.errors += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// A single-purpose configuration check.
///
/// `validate` recomputes findings from disk on every call. The provided helpers
/// interpret a slice of findings the same way for every validator.
pub trait Validator {
    /// Stable name used to group findings in reports.
    fn name(&self) -> &'static str;

    /// Run every check and return the findings.
    fn validate(&mut self) -> Vec<Finding>;

    fn has_errors(findings: &[Finding]) -> bool
    where
        Self: Sized,
    {
        findings.iter().any(Finding::is_error)
    }

    fn has_warnings(findings: &[Finding]) -> bool
    where
        Self: Sized,
    {
        findings.iter().any(Finding::is_warning_or_above)
    }

    fn errors(findings: &[Finding]) -> Vec<&Finding>
    where
        Self: Sized,
    {
        findings.iter().filter(|f| f.is_error()).collect()
    }

    fn warnings(findings: &[Finding]) -> Vec<&Finding>
    where
        Self: Sized,
    {
        findings.iter().filter(|f| f.level == Severity::Warning).collect()
    }
}

/// Locate `settings.json` for a config directory: `.claude/settings.json` first, then
/// a top-level `settings.json`.
#[must_use]
pub fn find_settings_file(config_dir: &Path) -> Option<PathBuf> {
    [config_dir.join(".claude").join("settings.json"), config_dir.join("settings.json")]
        .into_iter()
        .find(|p| p.is_file())
}
