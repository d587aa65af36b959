//! Move a project between template versions.
//!
//! ```bash
//! ccsetup upgrade --check
//! ccsetup upgrade            # sync metadata and preview the next upgrade
//! ccsetup upgrade --yes      # apply it
//! ccsetup upgrade --to 2.0.1 --yes --no-backup
//! ccsetup rollback backup_20250101_120000
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{print_migration_result, print_success, print_warning, resolve_dir};
use crate::config::ToolConfig;
use crate::core::CcsetupError;
use crate::migration::upgrade::{MetadataSync, UpgradeAssistant, UpgradePreview};
use crate::migration::version::Version;

#[derive(Args)]
pub struct UpgradeCommand {
    /// Configuration directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Only report whether an upgrade is available
    #[arg(long)]
    pub check: bool,

    /// Upgrade to this version instead of the next available one
    #[arg(long, value_name = "VERSION")]
    pub to: Option<String>,

    /// Skip the pre-upgrade backup
    #[arg(long)]
    pub no_backup: bool,

    /// Apply the upgrade instead of only previewing it
    #[arg(short, long)]
    pub yes: bool,
}

impl UpgradeCommand {
    pub async fn execute(self, config: &ToolConfig) -> Result<()> {
        let dir = resolve_dir(self.dir.clone())?;
        let assistant = UpgradeAssistant::new(&dir);
        let current = assistant.version_manager().detect_current_version();

        if self.check {
            let shown = current.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string);
            println!("Current version: {}", shown.bold());
            match assistant.check_for_upgrades() {
                Some(next) => print_warning(&format!("Upgrade available: {next}")),
                None => print_success("Configuration is up to date"),
            }
            return Ok(());
        }

        let target = match &self.to {
            Some(version) => Some(Version::parse(version)?),
            None => {
                match assistant.sync_metadata(!self.no_backup)? {
                    MetadataSync::Initialized(version) => {
                        print_success(&format!("Project initialized with latest template version {version}"));
                        return Ok(());
                    }
                    MetadataSync::MetadataCreated(version) => {
                        print_success(&format!("Created metadata for existing project (version {version})"));
                        return Ok(());
                    }
                    MetadataSync::Refreshed { backup } => {
                        let note = backup.map(|b| format!(" (backup: {b})")).unwrap_or_default();
                        print_success(&format!("Configuration metadata refreshed{note}"));
                    }
                    MetadataSync::UpToDate => {}
                }
                assistant.check_for_upgrades()
            }
        };

        let Some(target) = target else {
            print_success("Configuration is up to date");
            return Ok(());
        };

        print_preview(&assistant.preview_upgrade(&target));
        if !self.yes {
            println!("\nRun with --yes to apply the upgrade.");
            return Ok(());
        }

        let result = assistant.perform_upgrade(&target, !self.no_backup);
        println!();
        print_migration_result(&result);
        if !result.is_success() {
            return Err(CcsetupError::UpgradeFailed { reason: result.message }.into());
        }

        match assistant.backup_manager().cleanup_old(config.backup_keep) {
            Ok(0) => {}
            Ok(removed) => tracing::info!("Removed {removed} old backup(s)"),
            Err(e) => tracing::warn!("Backup cleanup failed: {e:#}"),
        }
        Ok(())
    }
}

fn print_preview(preview: &UpgradePreview) {
    let current = preview.current_version.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string);
    println!("{} {current} → {}", "Upgrade:".bold(), preview.target_version.to_string().bold());
    for change in &preview.changes {
        println!("  • {change}");
    }
    if !preview.files_affected.is_empty() {
        println!("  Files: {}", preview.files_affected.join(", "));
    }
    for risk in &preview.risks {
        print_warning(risk);
    }
    if preview.backup_recommended {
        println!("  A backup is recommended before upgrading.");
    }
}

#[derive(Args)]
pub struct RollbackCommand {
    /// Backup to restore
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Configuration directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl RollbackCommand {
    pub async fn execute(self) -> Result<()> {
        let dir = resolve_dir(self.dir)?;
        let result = UpgradeAssistant::new(&dir).rollback(&self.name);
        print_migration_result(&result);
        if result.is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(result.message))
        }
    }
}
