//! Output helpers shared by the CLI commands.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::migration::MigrationResult;
use crate::validation::health::ReportFormat;
use crate::validation::{Finding, Severity};

/// Output format for commands that can report as JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// The directory to operate on: `dir` if given, else the current directory.
///
/// The path must exist and be a directory.
pub fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine the current directory")?,
    };
    if !dir.is_dir() {
        return Err(crate::core::CcsetupError::ConfigDirNotFound {
            path: dir.display().to_string(),
        }
        .into());
    }
    Ok(dir)
}

/// Colored marker for a finding's severity.
#[must_use]
pub fn severity_marker(level: Severity) -> colored::ColoredString {
    match level {
        Severity::Info => "ℹ".blue(),
        Severity::Warning => "⚠".yellow(),
        Severity::Error => "✗".red(),
        Severity::Critical => "✗".red().bold(),
    }
}

/// Print one finding with its location and suggestion.
pub fn print_finding(finding: &Finding, base: &Path) {
    let mut location = String::new();
    if let Some(path) = &finding.file_path {
        let shown = path.strip_prefix(base).unwrap_or(path);
        location = format!(" ({}", shown.display());
        if let Some(line) = finding.line_number {
            location.push_str(&format!(":{line}"));
        }
        location.push(')');
    }
    println!("  {} {}{}", severity_marker(finding.level), finding.message, location.dimmed());
    if let Some(suggestion) = &finding.suggestion {
        println!("      {} {suggestion}", "→".green());
    }
}

pub fn print_success(message: &str) {
    println!("{} {message}", "✓".green());
}

pub fn print_warning(message: &str) {
    println!("{} {message}", "⚠".yellow());
}

pub fn print_failure(message: &str) {
    println!("{} {message}", "✗".red());
}

pub fn print_migration_result(result: &MigrationResult) {
    if result.is_success() {
        print_success(&result.message);
    } else {
        print_failure(&result.message);
    }
    if !result.files_affected.is_empty() {
        println!("  {} file(s) affected", result.files_affected.len());
    }
    if let Some(backup) = &result.backup_path {
        println!("  Backup: {}", backup.display());
    }
    for warning in &result.warnings {
        println!("  {} {warning}", "⚠".yellow());
    }
    for error in result.errors.iter().filter(|e| **e != result.message) {
        println!("  {} {error}", "✗".red());
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
