//! Walks a project forward through the template version table.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::backup::{BackupInfo, BackupManager};
use super::version::{METADATA_FILE, VERSION_FILE, Version, VersionManager};
use super::{MigrationResult, MigrationStatus};
use crate::core::CcsetupError;
use crate::utils::fs::{read_text_file, write_json_file, write_text_file};
use crate::validation::claude_md::has_section;

/// Every template release, oldest first.
pub const TEMPLATE_VERSIONS: &[(&str, &str)] = &[
    ("1.0.0", "Initial template version"),
    ("1.1.0", "Added persona support and improved MCP configuration"),
    ("1.2.0", "Enhanced security settings and validation"),
    ("2.0.0", "Major restructure with new command system"),
    ("2.0.1", "Enhanced validation and migration system"),
];

const PERSONAS_SINCE: Version = Version::new(1, 1, 0);
const PERMISSIONS_SINCE: Version = Version::new(1, 2, 0);

const MAJOR_UPGRADE_RISK: &str = "Major version upgrade - may require manual review";

/// The newest entry of [`TEMPLATE_VERSIONS`].
#[must_use]
pub fn latest_version() -> Version {
    template_versions().last().map_or_else(|| Version::new(1, 0, 0), |(v, _)| v.clone())
}

fn template_versions() -> Vec<(Version, &'static str)> {
    TEMPLATE_VERSIONS
        .iter()
        .filter_map(|(v, desc)| Version::parse(v).ok().map(|v| (v, *desc)))
        .collect()
}

/// What an upgrade to `target_version` would do.
#[derive(Debug, Clone, Serialize)]
pub struct UpgradePreview {
    pub current_version: Option<Version>,
    pub target_version: Version,
    /// Release notes of every version passed on the way.
    pub changes: Vec<String>,
    /// Files the upgrade steps would touch, relative to the config directory.
    pub files_affected: Vec<String>,
    pub risks: Vec<String>,
    pub backup_recommended: bool,
}

/// What [`UpgradeAssistant::sync_metadata`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSync {
    /// No version existed; the project was stamped with the latest template version.
    Initialized(Version),
    /// A current version existed without metadata, which was created.
    MetadataCreated(Version),
    /// The configuration drifted from its recorded checksum and metadata was refreshed.
    Refreshed { backup: Option<String> },
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepAction {
    WriteVersion,
    WriteMetadata,
    AddPersonasSection,
    EnsurePermissions,
}

#[derive(Debug, Clone)]
struct UpgradeStep {
    description: &'static str,
    action: StepAction,
    target: PathBuf,
}

pub struct UpgradeAssistant {
    config_dir: PathBuf,
    versions: VersionManager,
    backups: BackupManager,
}

impl UpgradeAssistant {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            versions: VersionManager::new(&config_dir),
            backups: BackupManager::new(&config_dir),
            config_dir,
        }
    }

    #[must_use]
    pub const fn version_manager(&self) -> &VersionManager {
        &self.versions
    }

    #[must_use]
    pub const fn backup_manager(&self) -> &BackupManager {
        &self.backups
    }

    /// The latest version when none is detected, otherwise the first newer release.
    #[must_use]
    pub fn check_for_upgrades(&self) -> Option<Version> {
        let Some(current) = self.versions.detect_current_version() else {
            return Some(latest_version());
        };
        template_versions().into_iter().map(|(v, _)| v).find(|v| *v > current)
    }

    #[must_use]
    pub fn preview_upgrade(&self, target: &Version) -> UpgradePreview {
        let current = self.versions.detect_current_version();

        let changes = template_versions()
            .into_iter()
            .filter(|(v, _)| v <= target && current.as_ref().is_none_or(|c| v > c))
            .map(|(v, desc)| format!("{v}: {desc}"))
            .collect();

        let files_affected = self
            .steps_for(target)
            .iter()
            .filter_map(|step| crate::utils::fs::relative_slash_path(&self.config_dir, &step.target))
            .collect();

        let mut risks = Vec::new();
        if current.as_ref().is_some_and(|c| c.major() != target.major()) {
            risks.push(MAJOR_UPGRADE_RISK.to_string());
        }

        UpgradePreview {
            current_version: current,
            target_version: target.clone(),
            changes,
            files_affected,
            risks,
            backup_recommended: true,
        }
    }

    /// Back up, apply every step for `target`, then record the new version.
    ///
    /// A failing step restores the backup. The result is `Failed` when that restore
    /// succeeded and `RollbackRequired` when it did not or no backup was taken.
    pub fn perform_upgrade(&self, target: &Version, create_backup: bool) -> MigrationResult {
        let current = self.versions.detect_current_version();
        let versions = (current.as_ref().map(ToString::to_string), Some(target.to_string()));

        if let Some(current) = &current
            && !Self::can_migrate(current, target)
        {
            return MigrationResult::failed(format!("Cannot upgrade from {current} to {target}"))
                .with_versions(versions.0, versions.1);
        }
        if !template_versions().iter().any(|(v, _)| v == target) {
            return MigrationResult::failed(CcsetupError::InvalidVersion { version: target.to_string() }.to_string())
                .with_versions(versions.0, versions.1);
        }

        let backup = if create_backup {
            let from = current.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string);
            match self.backups.create(&format!("Pre-upgrade backup from {from} to {target}"), None) {
                Ok(info) => Some(info),
                Err(e) => {
                    return MigrationResult::failed(format!("Failed to create pre-upgrade backup: {e:#}"))
                        .with_versions(versions.0, versions.1);
                }
            }
        } else {
            None
        };
        let backup_path = backup.as_ref().map(|b| b.path.clone());

        let mut affected = Vec::new();
        // Files the steps create are not in the backup, so a rollback has to remove them.
        let mut created = Vec::new();
        for step in self.steps_for(target) {
            tracing::debug!("Upgrade step: {}", step.description);
            let existed = step.target.exists();
            let outcome = self.execute(&step, target);
            if !existed && step.target.exists() {
                created.push(step.target.clone());
            }
            match outcome {
                Ok(true) => affected.push(step.target.clone()),
                Ok(false) => {}
                Err(e) => {
                    let message = format!("Upgrade failed at step: {}", step.description);
                    return self
                        .roll_back(backup.as_ref(), &created, &message, &e)
                        .with_versions(versions.0, versions.1)
                        .with_backup(backup_path);
                }
            }
        }

        if let Err(e) = self.record_version(target) {
            return self
                .roll_back(backup.as_ref(), &created, "Upgrade failed while recording the new version", &e)
                .with_versions(versions.0, versions.1)
                .with_backup(backup_path);
        }

        let from = versions.0.clone().unwrap_or_else(|| "unknown".to_string());
        tracing::info!("Upgraded {} from {from} to {target}", self.config_dir.display());
        MigrationResult::success(format!("Successfully upgraded from {from} to {target}"))
            .with_versions(versions.0, versions.1)
            .with_files(affected)
            .with_backup(backup_path)
    }

    pub fn rollback(&self, backup_name: &str) -> MigrationResult {
        self.backups.restore(backup_name, true)
    }

    /// Backups taken before upgrades, newest first.
    pub fn upgrade_history(&self) -> Result<Vec<BackupInfo>> {
        Ok(self
            .backups
            .list()?
            .into_iter()
            .filter(|b| b.description.to_lowercase().contains("upgrade"))
            .collect())
    }

    #[must_use]
    pub fn can_migrate(source: &Version, target: &Version) -> bool {
        target >= source
    }

    /// Bring `.version` and `.metadata.json` in line with the files on disk.
    ///
    /// Drift is backed up before the metadata is refreshed when `create_backup` is set.
    pub fn sync_metadata(&self, create_backup: bool) -> Result<MetadataSync> {
        let Some(current) = self.versions.detect_current_version() else {
            let latest = latest_version();
            self.versions.save_version(&latest)?;
            let metadata = self.versions.create_metadata(latest.clone(), "new_project", None, None)?;
            self.versions.save_metadata(&metadata)?;
            return Ok(MetadataSync::Initialized(latest));
        };

        let metadata = self.versions.load_metadata();
        if metadata.is_none() && current >= latest_version() {
            let metadata = self.versions.create_metadata(current.clone(), "setup_project", None, None)?;
            self.versions.save_metadata(&metadata)?;
            return Ok(MetadataSync::MetadataCreated(current));
        }

        if !self.versions.is_migration_needed() {
            return Ok(MetadataSync::UpToDate);
        }

        let backup = if create_backup {
            Some(self.backups.create("Pre-refresh backup before metadata update", None)?.name)
        } else {
            None
        };
        let refreshed = match metadata {
            Some(metadata) => self.versions.update_metadata(metadata)?,
            None => self.versions.create_metadata(current, "setup_project", None, None)?,
        };
        self.versions.save_metadata(&refreshed)?;
        Ok(MetadataSync::Refreshed { backup })
    }

    fn steps_for(&self, target: &Version) -> Vec<UpgradeStep> {
        let mut steps = vec![
            UpgradeStep {
                description: "Update version metadata",
                action: StepAction::WriteVersion,
                target: self.config_dir.join(VERSION_FILE),
            },
            UpgradeStep {
                description: "Update configuration metadata",
                action: StepAction::WriteMetadata,
                target: self.config_dir.join(METADATA_FILE),
            },
        ];
        if *target >= PERSONAS_SINCE {
            steps.push(UpgradeStep {
                description: "Add persona support to configuration",
                action: StepAction::AddPersonasSection,
                target: self.config_dir.join("CLAUDE.md"),
            });
        }
        if *target >= PERMISSIONS_SINCE {
            steps.push(UpgradeStep {
                description: "Enhance security settings",
                action: StepAction::EnsurePermissions,
                target: self.config_dir.join(".claude").join("settings.json"),
            });
        }
        steps
    }

    /// Returns whether the step changed its target.
    fn execute(&self, step: &UpgradeStep, target: &Version) -> Result<bool> {
        match step.action {
            StepAction::WriteVersion => {
                self.versions.save_version(target)?;
                Ok(true)
            }
            StepAction::WriteMetadata => {
                let metadata = match self.versions.load_metadata() {
                    Some(mut metadata) => {
                        metadata.version = target.clone();
                        self.versions.update_metadata(metadata)?
                    }
                    None => self.versions.create_metadata(target.clone(), "upgrade", None, None)?,
                };
                self.versions.save_metadata(&metadata)?;
                Ok(true)
            }
            StepAction::AddPersonasSection => add_personas_section(&step.target),
            StepAction::EnsurePermissions => ensure_permissions(&step.target),
        }
    }

    fn record_version(&self, target: &Version) -> Result<()> {
        self.versions.save_version(target)?;
        if let Some(mut metadata) = self.versions.load_metadata() {
            metadata.version = target.clone();
            let metadata = self.versions.update_metadata(metadata)?;
            self.versions.save_metadata(&metadata)?;
        }
        Ok(())
    }

    /// Restore `backup` and delete the `created` files it cannot know about.
    fn roll_back(
        &self,
        backup: Option<&BackupInfo>,
        created: &[PathBuf],
        message: &str,
        error: &anyhow::Error,
    ) -> MigrationResult {
        tracing::warn!("{message}: {error:#}");
        let mut result = MigrationResult::new(MigrationStatus::RollbackRequired, message);
        result.errors.push(format!("{error:#}"));

        let Some(backup) = backup else {
            return result;
        };
        let restored = self.backups.restore(&backup.name, true);
        if !restored.is_success() {
            result.errors.extend(restored.errors);
            return result;
        }

        let mut leftovers = Vec::new();
        for path in created {
            if let Err(e) = std::fs::remove_file(path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                leftovers.push(format!("Failed to remove {}: {e}", path.display()));
            }
        }
        if leftovers.is_empty() {
            result.status = MigrationStatus::Failed;
            result.warnings.push(format!("Configuration restored from backup: {}", backup.name));
        } else {
            result.errors.extend(leftovers);
        }
        result
    }
}

/// Append a `## Personas` skeleton to an existing CLAUDE.md that lacks one.
fn add_personas_section(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let mut content = read_text_file(path)?;
    if has_section(&content, "Personas") {
        return Ok(false);
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str("\n## Personas\n\n_List the personas this project uses._\n");
    write_text_file(path, &content)?;
    Ok(true)
}

/// Make sure `permissions.allow` and `permissions.deny` exist, creating the file if needed.
///
/// An existing file that is not a JSON object is an error.
fn ensure_permissions(path: &Path) -> Result<bool> {
    let mut settings = if path.is_file() {
        let text = read_text_file(path)?;
        serde_json::from_str::<Value>(&text).map_err(|e| CcsetupError::InvalidJson {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?
    } else {
        Value::Object(Map::new())
    };

    let root = settings
        .as_object_mut()
        .with_context(|| format!("{} is not a JSON object", path.display()))?;
    let permissions = root
        .entry("permissions")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .with_context(|| format!("'permissions' in {} is not an object", path.display()))?;

    let mut changed = !path.is_file();
    for key in ["allow", "deny"] {
        if !permissions.contains_key(key) {
            permissions.insert(key.to_string(), Value::Array(Vec::new()));
            changed = true;
        }
    }

    if changed {
        write_json_file(path, &settings, true)?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(version: Option<&str>) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "# Project\n\n## Project Overview\n").unwrap();
        if let Some(version) = version {
            fs::write(temp.path().join(".version"), version).unwrap();
        }
        temp
    }

    #[test]
    fn test_latest_version() {
        assert_eq!(latest_version().to_string(), "2.0.1");
    }

    #[test]
    fn test_check_for_upgrades() {
        let fresh = project(None);
        assert_eq!(UpgradeAssistant::new(fresh.path()).check_for_upgrades(), Some(latest_version()));

        let old = project(Some("1.0.0"));
        assert_eq!(
            UpgradeAssistant::new(old.path()).check_for_upgrades().unwrap().to_string(),
            "1.1.0"
        );

        let current = project(Some("2.0.1"));
        assert!(UpgradeAssistant::new(current.path()).check_for_upgrades().is_none());
    }

    #[test]
    fn test_preview_flags_major_upgrade() {
        let temp = project(Some("1.2.0"));
        let assistant = UpgradeAssistant::new(temp.path());

        let preview = assistant.preview_upgrade(&Version::new(2, 0, 1));
        assert_eq!(preview.risks, vec![MAJOR_UPGRADE_RISK.to_string()]);
        assert_eq!(preview.changes.len(), 2);
        assert!(preview.files_affected.contains(&".claude/settings.json".to_string()));

        let minor = assistant.preview_upgrade(&Version::new(1, 2, 0));
        assert!(minor.risks.is_empty());
        assert!(minor.changes.is_empty());
    }

    #[test]
    fn test_perform_upgrade() {
        let temp = project(Some("1.0.0"));
        let assistant = UpgradeAssistant::new(temp.path());

        let result = assistant.perform_upgrade(&Version::new(1, 2, 0), true);
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(result.source_version.as_deref(), Some("1.0.0"));
        assert!(result.backup_path.as_ref().unwrap().exists());

        let claude_md = fs::read_to_string(temp.path().join("CLAUDE.md")).unwrap();
        assert!(claude_md.contains("## Personas"));
        let settings: Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join(".claude/settings.json")).unwrap()).unwrap();
        assert_eq!(settings["permissions"]["deny"], Value::Array(Vec::new()));

        let versions = assistant.version_manager();
        assert_eq!(versions.detect_current_version().unwrap().to_string(), "1.2.0");
        assert_eq!(versions.load_metadata().unwrap().version.to_string(), "1.2.0");
        assert!(!versions.is_migration_needed());

        let history = assistant.upgrade_history().unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_perform_upgrade_is_idempotent_on_personas() {
        let temp = project(Some("1.0.0"));
        let assistant = UpgradeAssistant::new(temp.path());
        assert!(assistant.perform_upgrade(&Version::new(1, 1, 0), false).is_success());
        assert!(assistant.perform_upgrade(&Version::new(2, 0, 0), false).is_success());

        let claude_md = fs::read_to_string(temp.path().join("CLAUDE.md")).unwrap();
        assert_eq!(claude_md.matches("## Personas").count(), 1);
    }

    #[test]
    fn test_failed_step_restores_backup() {
        let temp = project(Some("1.0.0"));
        fs::create_dir_all(temp.path().join(".claude")).unwrap();
        fs::write(temp.path().join(".claude/settings.json"), "{ not json").unwrap();
        let assistant = UpgradeAssistant::new(temp.path());

        let result = assistant.perform_upgrade(&Version::new(1, 2, 0), true);
        assert_eq!(result.status, MigrationStatus::Failed);
        assert!(result.message.contains("Enhance security settings"));
        assert!(!result.warnings.is_empty());
        assert_eq!(fs::read_to_string(temp.path().join(".version")).unwrap(), "1.0.0");
        assert!(!fs::read_to_string(temp.path().join("CLAUDE.md")).unwrap().contains("Personas"));
    }

    #[test]
    fn test_failed_step_removes_files_the_upgrade_created() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "# Project\n\nVersion: 1.0.0\n").unwrap();
        fs::create_dir_all(temp.path().join(".claude")).unwrap();
        fs::write(temp.path().join(".claude/settings.json"), "[1, 2]").unwrap();
        let assistant = UpgradeAssistant::new(temp.path());

        let result = assistant.perform_upgrade(&Version::new(2, 0, 1), true);
        assert_eq!(result.status, MigrationStatus::Failed);
        assert!(!temp.path().join(VERSION_FILE).exists());
        assert!(!temp.path().join(METADATA_FILE).exists());
        assert_eq!(assistant.version_manager().detect_current_version(), Some(Version::new(1, 0, 0)));
        assert_eq!(assistant.check_for_upgrades(), Some(Version::new(1, 1, 0)));
    }

    #[test]
    fn test_failed_step_without_backup_requires_rollback() {
        let temp = project(Some("1.0.0"));
        fs::create_dir_all(temp.path().join(".claude")).unwrap();
        fs::write(temp.path().join(".claude/settings.json"), "[]").unwrap();

        let result = UpgradeAssistant::new(temp.path()).perform_upgrade(&Version::new(2, 0, 1), false);
        assert!(result.needs_rollback());
    }

    #[test]
    fn test_rejects_downgrade_and_unknown_target() {
        let temp = project(Some("2.0.0"));
        let assistant = UpgradeAssistant::new(temp.path());
        assert!(!assistant.perform_upgrade(&Version::new(1, 2, 0), false).is_success());
        assert!(!assistant.perform_upgrade(&Version::new(9, 9, 9), false).is_success());
        assert!(UpgradeAssistant::can_migrate(&Version::new(1, 0, 0), &Version::new(1, 0, 0)));
    }

    #[test]
    fn test_sync_metadata_paths() {
        let fresh = project(None);
        let assistant = UpgradeAssistant::new(fresh.path());
        assert_eq!(assistant.sync_metadata(false).unwrap(), MetadataSync::Initialized(latest_version()));
        assert_eq!(assistant.sync_metadata(false).unwrap(), MetadataSync::UpToDate);

        fs::write(fresh.path().join("CLAUDE.md"), "# Edited\n").unwrap();
        let MetadataSync::Refreshed { backup } = assistant.sync_metadata(true).unwrap() else {
            panic!("expected refresh");
        };
        assert!(backup.is_some());
        assert_eq!(assistant.sync_metadata(false).unwrap(), MetadataSync::UpToDate);

        let existing = project(Some("2.0.1"));
        assert_eq!(
            UpgradeAssistant::new(existing.path()).sync_metadata(false).unwrap(),
            MetadataSync::MetadataCreated(latest_version())
        );
    }
}
