//! Versioning, diffing, backup and upgrade of a project's Claude configuration.
//!
//! - [`version`] reads and writes `.version` / `.metadata.json` and detects drift
//! - [`diff`] compares two configuration directories change by change
//! - [`backup`] snapshots the configuration into zip archives and restores them
//! - [`conflict`] detects and resolves conflicts between a local and a remote file
//! - [`upgrade`] walks a project forward through the template version table

pub mod backup;
pub mod conflict;
pub mod diff;
pub mod upgrade;
pub mod version;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// State of a migration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    RollbackRequired,
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::RollbackRequired => "rollback_required",
        };
        f.write_str(s)
    }
}

/// Outcome of a restore, upgrade or rollback.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub status: MigrationStatus,
    pub message: String,
    pub source_version: Option<String>,
    pub target_version: Option<String>,
    pub files_affected: Vec<PathBuf>,
    pub backup_path: Option<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub timestamp: DateTime<Local>,
}

impl MigrationResult {
    pub fn new(status: MigrationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            source_version: None,
            target_version: None,
            files_affected: Vec::new(),
            backup_path: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            timestamp: Local::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(MigrationStatus::Success, message)
    }

    /// A failed result whose only error is `message`.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut result = Self::new(MigrationStatus::Failed, message.clone());
        result.errors.push(message);
        result
    }

    #[must_use]
    pub fn with_versions(mut self, source: Option<String>, target: Option<String>) -> Self {
        self.source_version = source;
        self.target_version = target;
        self
    }

    #[must_use]
    pub fn with_backup(mut self, backup_path: Option<PathBuf>) -> Self {
        self.backup_path = backup_path;
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files_affected = files;
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == MigrationStatus::Success
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.status == MigrationStatus::Failed
    }

    #[must_use]
    pub fn needs_rollback(&self) -> bool {
        self.status == MigrationStatus::RollbackRequired
    }
}

/// Kind of difference between two configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Moved,
    Conflict,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Moved => "moved",
            Self::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// How much a change matters to a running project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One difference found by [`diff::SmartDiffEngine`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigChange {
    pub change_type: ChangeType,
    pub file_path: PathBuf,
    pub section: Option<String>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub line_number: Option<usize>,
    pub description: String,
    pub impact_level: ImpactLevel,
    pub auto_mergeable: bool,
}

impl ConfigChange {
    pub fn new(change_type: ChangeType, file_path: impl Into<PathBuf>, description: impl Into<String>) -> Self {
        Self {
            change_type,
            file_path: file_path.into(),
            section: None,
            old_value: None,
            new_value: None,
            line_number: None,
            description: description.into(),
            impact_level: ImpactLevel::Low,
            auto_mergeable: false,
        }
    }
}
