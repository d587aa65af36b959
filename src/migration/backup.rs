//! Zip snapshots of a project's Claude configuration.
//!
//! Archives live in `<config>/.claude/backups/<name>.zip`. Each one holds the matched
//! configuration files under their relative paths plus a `backup_metadata.json` entry
//! describing the snapshot. Restoring always takes a safety backup first, so a restore
//! can itself be undone.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::version::VersionManager;
use super::{MigrationResult, MigrationStatus};
use crate::core::{CcsetupError, ErrorContext};
use crate::utils::fs::{calculate_checksum, compile_patterns, ensure_dir, find_files};

pub const BACKUP_METADATA_FILE: &str = "backup_metadata.json";

pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &[
    "CLAUDE.md",
    ".mcp.json",
    ".claude/settings.json",
    ".claude/settings.local.json.example",
    ".claude/commands/**/*.md",
    ".claude/personas/**/*.md",
    ".version",
    ".metadata.json",
];

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    ".claude/backups/**",
    ".claude/settings.local.json",
    ".claude/.cache/**",
    "**/__pycache__/**",
    "**/*.pyc",
    "**/node_modules/**",
];

/// Summary of one archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub timestamp: DateTime<Local>,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub description: String,
    pub files_count: usize,
    pub version: Option<String>,
    pub checksum: Option<String>,
}

/// The `backup_metadata.json` entry embedded in each archive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ArchiveMetadata {
    #[serde(default)]
    timestamp: Option<DateTime<Local>>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    files_count: Option<usize>,
    #[serde(default)]
    total_size: u64,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    include_patterns: Vec<String>,
    #[serde(default)]
    exclude_patterns: Vec<String>,
}

/// Creates, lists and restores configuration backups.
pub struct BackupManager {
    config_dir: PathBuf,
    backups_dir: PathBuf,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl BackupManager {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let backups_dir = config_dir.join(".claude").join("backups");
        Self {
            config_dir,
            backups_dir,
            include_patterns: DEFAULT_INCLUDE_PATTERNS.iter().map(|s| (*s).to_string()).collect(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Archive every matched configuration file.
    ///
    /// Without an explicit `name` the archive is called `backup_<YYYYmmdd_HHMMSS>`; a
    /// numeric suffix is added if that name is already taken.
    pub fn create(&self, description: &str, name: Option<&str>) -> Result<BackupInfo> {
        ensure_dir(&self.backups_dir)?;

        let timestamp = Local::now();
        let base = name.map_or_else(|| timestamp.format("backup_%Y%m%d_%H%M%S").to_string(), str::to_string);
        if !is_valid_name(&base) {
            return Err(CcsetupError::InvalidBackup {
                path: base,
                reason: "backup names cannot contain path separators".to_string(),
            }
            .into());
        }
        let name = self.unique_name(&base);
        let path = self.archive_path(&name);

        match self.write_archive(&path, description, timestamp) {
            Ok(()) => {
                tracing::info!("Created backup {name} at {}", path.display());
                self.read_info(&path)
            }
            Err(e) => {
                if path.exists() {
                    let _ = std::fs::remove_file(&path);
                }
                Err(e.context(format!("Failed to create backup {name}")))
            }
        }
    }

    fn write_archive(&self, path: &Path, description: &str, timestamp: DateTime<Local>) -> Result<()> {
        let include = compile_patterns(&self.include_patterns)?;
        let exclude = compile_patterns(&self.exclude_patterns)?;
        let files = find_files(&self.config_dir, &include, &exclude);

        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut total_size = 0;
        for file_path in &files {
            let Some(rel) = crate::utils::fs::relative_slash_path(&self.config_dir, file_path) else {
                continue;
            };
            let content = std::fs::read(file_path)
                .with_context(|| format!("Failed to read {}", file_path.display()))?;
            zip.start_file(rel.as_str(), options)?;
            zip.write_all(&content)?;
            total_size += content.len() as u64;
        }

        let metadata = ArchiveMetadata {
            timestamp: Some(timestamp),
            description: description.to_string(),
            files_count: Some(files.len()),
            total_size,
            version: VersionManager::new(&self.config_dir).detect_current_version().map(|v| v.to_string()),
            include_patterns: self.include_patterns.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
        };
        zip.start_file(BACKUP_METADATA_FILE, options)?;
        zip.write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())?;
        zip.finish()?;
        Ok(())
    }

    /// Every readable archive, newest first. Unreadable archives are logged and skipped.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        if !self.backups_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let entries = std::fs::read_dir(&self.backups_dir)
            .with_context(|| format!("Failed to read {}", self.backups_dir.display()))?;
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "zip") {
                continue;
            }
            match self.read_info(&path) {
                Ok(info) => backups.push(info),
                Err(e) => tracing::warn!("Skipping unreadable backup {}: {e:#}", path.display()),
            }
        }

        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// Restore the files of backup `name` into the configuration directory.
    ///
    /// Unknown names and unconfirmed restores produce a failed result rather than an
    /// error.
    pub fn restore(&self, name: &str, confirm: bool) -> MigrationResult {
        let path = match self.existing_archive(name) {
            Ok(path) => path,
            Err(e) => {
                let mut result = MigrationResult::failed(format!("Backup not found: {name}"));
                if let Some(ctx) = e.downcast_ref::<ErrorContext>()
                    && let Some(suggestion) = &ctx.suggestion
                {
                    result.warnings.push(suggestion.clone());
                }
                return result;
            }
        };

        if !confirm {
            let mut result = MigrationResult::new(MigrationStatus::Failed, "Restore cancelled - confirmation required");
            result.warnings.push("Pass --yes to proceed with the restore".to_string());
            return result;
        }

        let safety = match self.create(&format!("Pre-restore safety backup before {name}"), None) {
            Ok(info) => info,
            Err(e) => return MigrationResult::failed(format!("Failed to create safety backup: {e:#}")),
        };

        match self.extract(&path) {
            Ok(files) => {
                tracing::info!("Restored {} files from {name}", files.len());
                MigrationResult::success(format!("Configuration restored from backup: {name}"))
                    .with_files(files)
                    .with_backup(Some(safety.path))
            }
            Err(e) => MigrationResult::failed(format!("Failed to restore backup {name}: {e:#}"))
                .with_backup(Some(safety.path)),
        }
    }

    fn extract(&self, archive_path: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(archive_path)
            .with_context(|| format!("Failed to open {}", archive_path.display()))?;
        let mut archive = ZipArchive::new(file)?;
        let mut restored = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() || entry.name() == BACKUP_METADATA_FILE {
                continue;
            }
            let Some(rel) = entry.enclosed_name() else {
                tracing::warn!("Skipping unsafe archive entry {}", entry.name());
                continue;
            };

            let target = self.config_dir.join(rel);
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            let mut out = File::create(&target)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            std::io::copy(&mut entry, &mut out)?;
            restored.push(target);
        }
        Ok(restored)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.existing_archive(name)?;
        std::fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        tracing::info!("Deleted backup {name}");
        Ok(())
    }

    /// Delete all but the `keep` newest backups. Returns how many were deleted.
    pub fn cleanup_old(&self, keep: usize) -> Result<usize> {
        let backups = self.list()?;
        let mut deleted = 0;
        for backup in backups.iter().skip(keep) {
            match std::fs::remove_file(&backup.path) {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!("Failed to delete {}: {e}", backup.path.display()),
            }
        }
        Ok(deleted)
    }

    /// Combined size in bytes of every archive.
    pub fn total_size(&self) -> Result<u64> {
        Ok(self.list()?.iter().map(|b| b.size_bytes).sum())
    }

    /// Copy backup `name` to `dest`.
    pub fn export(&self, name: &str, dest: &Path) -> Result<PathBuf> {
        let path = self.existing_archive(name)?;
        if let Some(parent) = dest.parent()
            && !parent.as_os_str().is_empty()
        {
            ensure_dir(parent)?;
        }
        std::fs::copy(&path, dest)
            .with_context(|| format!("Failed to export {name} to {}", dest.display()))?;
        Ok(dest.to_path_buf())
    }

    /// Copy an external archive into the backups directory.
    ///
    /// The archive must be readable as a zip file. Without `name` it is stored as
    /// `imported_<YYYYmmdd_HHMMSS>`.
    pub fn import(&self, source: &Path, name: Option<&str>) -> Result<BackupInfo> {
        if !source.is_file() {
            return Err(CcsetupError::FileSystemError {
                operation: "import".to_string(),
                path: source.display().to_string(),
            }
            .into());
        }
        ensure_dir(&self.backups_dir)?;

        let base = name.map_or_else(
            || Local::now().format("imported_%Y%m%d_%H%M%S").to_string(),
            str::to_string,
        );
        if !is_valid_name(&base) {
            return Err(CcsetupError::InvalidBackup {
                path: base,
                reason: "backup names cannot contain path separators".to_string(),
            }
            .into());
        }
        let target = self.archive_path(&self.unique_name(&base));
        std::fs::copy(source, &target)
            .with_context(|| format!("Failed to import {}", source.display()))?;

        match self.read_info(&target) {
            Ok(info) => Ok(info),
            Err(e) => {
                let _ = std::fs::remove_file(&target);
                Err(CcsetupError::InvalidBackup {
                    path: source.display().to_string(),
                    reason: format!("{e:#}"),
                }
                .into())
            }
        }
    }

    /// Read the summary of one archive.
    pub fn read_info(&self, path: &Path) -> Result<BackupInfo> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let size_bytes = file.metadata()?.len();
        let modified: Option<DateTime<Local>> = file.metadata()?.modified().ok().map(DateTime::from);
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("Not a zip archive: {}", path.display()))?;

        let metadata = match archive.by_name(BACKUP_METADATA_FILE) {
            Ok(mut entry) => {
                let mut text = String::new();
                entry.read_to_string(&mut text)?;
                serde_json::from_str(&text).unwrap_or_else(|e| {
                    tracing::warn!("Malformed {BACKUP_METADATA_FILE} in {}: {e}", path.display());
                    ArchiveMetadata::default()
                })
            }
            Err(_) => ArchiveMetadata::default(),
        };

        let entries = archive.file_names().filter(|n| *n != BACKUP_METADATA_FILE).count();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(BackupInfo {
            name,
            timestamp: metadata.timestamp.or(modified).unwrap_or_else(Local::now),
            path: path.to_path_buf(),
            size_bytes,
            description: metadata.description,
            files_count: metadata.files_count.unwrap_or(entries),
            version: metadata.version,
            checksum: calculate_checksum(path).ok(),
        })
    }

    /// Names of existing backups close to `name`, best match first.
    #[must_use]
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let Ok(backups) = self.list() else {
            return Vec::new();
        };
        let threshold = name.len().max(3) / 2;
        let mut scored: Vec<(usize, String)> = backups
            .into_iter()
            .map(|b| (strsim::levenshtein(name, &b.name), b.name))
            .filter(|(distance, _)| *distance <= threshold)
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, n)| n).collect()
    }

    fn existing_archive(&self, name: &str) -> Result<PathBuf> {
        let path = self.archive_path(name);
        if is_valid_name(name) && path.is_file() {
            return Ok(path);
        }

        let error = CcsetupError::BackupNotFound { name: name.to_string() };
        let similar = self.similar_names(name);
        let context = if similar.is_empty() {
            ErrorContext::new(error).with_suggestion("Run 'ccsetup backup list' to see available backups")
        } else {
            ErrorContext::new(error).with_suggestion(format!("Did you mean: {}?", similar.join(", ")))
        };
        Err(context.into())
    }

    fn archive_path(&self, name: &str) -> PathBuf {
        self.backups_dir.join(format!("{name}.zip"))
    }

    fn unique_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 1;
        while self.archive_path(&name).exists() {
            name = format!("{base}_{counter}");
            counter += 1;
        }
        name
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}
