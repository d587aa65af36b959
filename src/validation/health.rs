//! Project health: every project-level validator in one pass, plus a score.
//!
//! The score starts at 100 and loses 10 points per error and 2 per warning, floored at
//! zero. A project with no findings at all scores 100.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use super::autofix::{AutoFixer, FixResult};
use super::claude_md::ClaudeMdValidator;
use super::mcp::McpValidator;
use super::settings::SettingsValidator;
use super::{Finding, FindingCounts, Severity, Validator, find_settings_file};
use crate::config::ToolConfig;

/// Findings produced by one validator.
#[derive(Debug, Clone)]
pub struct ValidatorFindings {
    pub name: String,
    pub findings: Vec<Finding>,
}

/// Overall status band derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    NeedsAttention,
    Critical,
}

impl HealthStatus {
    #[must_use]
    pub const fn from_score(score: u32) -> Self {
        if score >= 80 {
            Self::Healthy
        } else if score >= 50 {
            Self::NeedsAttention
        } else {
            Self::Critical
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "HEALTHY",
            Self::NeedsAttention => "NEEDS ATTENTION",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Format of a saved report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Snapshot of one health run.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub timestamp: DateTime<Local>,
    pub config_dir: PathBuf,
    pub validators: Vec<ValidatorFindings>,
}

impl HealthReport {
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.validators.iter().flat_map(|v| v.findings.iter())
    }

    #[must_use]
    pub fn counts(&self) -> FindingCounts {
        FindingCounts::from_findings(self.findings())
    }

    #[must_use]
    pub fn health_score(&self) -> u32 {
        let counts = self.counts();
        if counts.total() == 0 {
            return 100;
        }
        let penalty = counts.errors.saturating_mul(10).saturating_add(counts.warnings.saturating_mul(2));
        u32::try_from(100usize.saturating_sub(penalty)).unwrap_or(0)
    }

    #[must_use]
    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_score(self.health_score())
    }

    #[must_use]
    pub fn has_critical_issues(&self) -> bool {
        self.findings().any(|f| f.level == Severity::Critical)
    }

    #[must_use]
    pub fn fixable_issues(&self) -> Vec<&Finding> {
        self.findings().filter(|f| f.auto_fixable).collect()
    }

    /// Unique suggestions in the order they were first seen.
    #[must_use]
    pub fn recommendations(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for suggestion in self.findings().filter_map(|f| f.suggestion.as_deref()) {
            if !seen.contains(&suggestion) {
                seen.push(suggestion);
            }
        }
        seen
    }

    /// Plain-text rendering. Info findings are hidden unless `show_all` is set.
    #[must_use]
    pub fn render_text(&self, show_all: bool) -> String {
        let counts = self.counts();
        let mut out = String::new();

        let _ = writeln!(out, "Configuration Health Check");
        let _ = writeln!(out, "==========================");
        let _ = writeln!(out, "Status:   {} ({}/100)", self.status(), self.health_score());
        let _ = writeln!(out, "Errors:   {}", counts.errors);
        let _ = writeln!(out, "Warnings: {}", counts.warnings);
        let _ = writeln!(out, "Info:     {}", counts.info);
        let _ = writeln!(out, "Checked:  {}", self.timestamp.format("%Y-%m-%d %H:%M:%S"));

        for group in &self.validators {
            let visible: Vec<&Finding> = group
                .findings
                .iter()
                .filter(|f| show_all || f.level != Severity::Info)
                .collect();
            if visible.is_empty() {
                continue;
            }

            let _ = writeln!(out, "\n{}", group.name);
            let _ = writeln!(out, "{}", "-".repeat(group.name.len()));
            for finding in visible {
                let _ = writeln!(out, "{finding}");
                if let Some(suggestion) = &finding.suggestion {
                    let _ = writeln!(out, "  Suggestion: {suggestion}");
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn save_report(&self, path: &Path, format: ReportFormat) -> Result<()> {
        let content = match format {
            ReportFormat::Json => {
                let mut json = self.to_json()?;
                json.push('\n');
                json
            }
            ReportFormat::Text => self.render_text(true),
        };
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write health report: {}", path.display()))
    }
}

#[derive(Serialize)]
struct FindingRecord<'a> {
    level: Severity,
    message: &'a str,
    file_path: Option<&'a Path>,
    line_number: Option<usize>,
    suggestion: Option<&'a str>,
    auto_fixable: bool,
}

impl<'a> From<&'a Finding> for FindingRecord<'a> {
    fn from(f: &'a Finding) -> Self {
        Self {
            level: f.level,
            message: &f.message,
            file_path: f.file_path.as_deref(),
            line_number: f.line_number,
            suggestion: f.suggestion.as_deref(),
            auto_fixable: f.auto_fixable,
        }
    }
}

#[derive(Serialize)]
struct SummaryRecord {
    total_errors: usize,
    total_warnings: usize,
    total_info: usize,
}

/// Validator groups in run order.
struct ValidatorMap<'a>(&'a [ValidatorFindings]);

impl Serialize for ValidatorMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in self.0 {
            let records: Vec<FindingRecord<'_>> = group.findings.iter().map(Into::into).collect();
            map.serialize_entry(&group.name, &records)?;
        }
        map.end()
    }
}

impl Serialize for HealthReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let counts = self.counts();
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry("timestamp", &self.timestamp.to_rfc3339())?;
        map.serialize_entry("health_score", &self.health_score())?;
        map.serialize_entry("status", &self.status())?;
        map.serialize_entry("has_critical_issues", &self.has_critical_issues())?;
        map.serialize_entry(
            "summary",
            &SummaryRecord {
                total_errors: counts.errors,
                total_warnings: counts.warnings,
                total_info: counts.info,
            },
        )?;
        map.serialize_entry("validators", &ValidatorMap(&self.validators))?;
        map.end()
    }
}

/// Result of [`HealthChecker::auto_fix`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoFixStats {
    pub dry_run: bool,
    pub fixable_issues_found: usize,
    pub fixes_applied: usize,
    pub fixes_failed: usize,
    pub success_rate: f64,
    pub backups_created: usize,
    /// Planned fixes on a dry run, applied ones otherwise.
    pub fixes: Vec<FixResult>,
}

/// Runs the project validators against one configuration directory.
pub struct HealthChecker {
    config_dir: PathBuf,
    config: ToolConfig,
    probe: bool,
    results: Vec<ValidatorFindings>,
}

impl HealthChecker {
    pub fn new(config_dir: impl Into<PathBuf>, config: ToolConfig) -> Self {
        let probe = config.probe_mcp_servers;
        Self {
            config_dir: config_dir.into(),
            config,
            probe,
            results: Vec::new(),
        }
    }

    /// Override whether MCP servers are started during the check.
    #[must_use]
    pub const fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Run every applicable validator, replacing the previous results.
    pub async fn run(&mut self) -> HealthReport {
        self.results.clear();

        if !self.config_dir.is_dir() {
            self.results.push(ValidatorFindings {
                name: "health".to_string(),
                findings: vec![
                    Finding::new(
                        Severity::Critical,
                        format!("Configuration directory not found: {}", self.config_dir.display()),
                    )
                    .with_file(&self.config_dir),
                ],
            });
            return self.report();
        }

        let claude_md = self.config_dir.join("CLAUDE.md");
        if claude_md.is_file() {
            self.record(&mut ClaudeMdValidator::new(claude_md, &self.config));
        }

        if let Some(settings) = find_settings_file(&self.config_dir) {
            self.record(&mut SettingsValidator::new(settings, &self.config));
        }

        let mut mcp = McpValidator::new(&self.config_dir);
        self.record(&mut mcp);
        if self.probe {
            let probed = mcp.probe_servers(self.config.probe_timeout()).await;
            if let Some(group) = self.results.iter_mut().find(|g| g.name == mcp.name()) {
                group.findings.extend(probed);
            }
        }

        self.report()
    }

    fn record(&mut self, validator: &mut impl Validator) {
        tracing::debug!("Running validator '{}'", validator.name());
        let findings = validator.validate();
        self.results.push(ValidatorFindings {
            name: validator.name().to_string(),
            findings,
        });
    }

    /// Report over the most recent run.
    #[must_use]
    pub fn report(&self) -> HealthReport {
        HealthReport {
            timestamp: Local::now(),
            config_dir: self.config_dir.clone(),
            validators: self.results.clone(),
        }
    }

    #[must_use]
    pub fn health_score(&self) -> u32 {
        self.report().health_score()
    }

    #[must_use]
    pub fn has_critical_issues(&self) -> bool {
        self.results
            .iter()
            .flat_map(|g| g.findings.iter())
            .any(|f| f.level == Severity::Critical)
    }

    #[must_use]
    pub fn fixable_issues(&self) -> Vec<&Finding> {
        self.results
            .iter()
            .flat_map(|g| g.findings.iter())
            .filter(|f| f.auto_fixable)
            .collect()
    }

    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        self.report().recommendations().into_iter().map(str::to_string).collect()
    }

    /// Repair every file that has a fixable finding, then re-run the check.
    pub async fn auto_fix(&mut self, dry_run: bool) -> Result<AutoFixStats> {
        if self.results.is_empty() {
            self.run().await;
        }

        let all: Vec<Finding> =
            self.results.iter().flat_map(|g| g.findings.iter().cloned()).collect();
        let fixable = AutoFixer::fixable_issues(&all);

        let mut files: Vec<&Path> = Vec::new();
        for finding in &fixable {
            if let Some(path) = finding.file_path.as_deref()
                && !files.contains(&path)
            {
                files.push(path);
            }
        }

        let mut fixer = AutoFixer::new(&self.config_dir, &self.config);
        for file in &files {
            fixer.fix_file(file, dry_run)?;
        }

        let summary = fixer.summary();
        let stats = AutoFixStats {
            dry_run,
            fixable_issues_found: fixable.len(),
            fixes_applied: if dry_run { 0 } else { summary.successful_fixes },
            fixes_failed: summary.failed_fixes,
            success_rate: summary.success_rate,
            backups_created: summary.backups_created,
            fixes: fixer.results().to_vec(),
        };

        if !dry_run && stats.fixes_applied > 0 {
            self.run().await;
        }
        Ok(stats)
    }
}
