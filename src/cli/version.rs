//! Show tool and configuration versions.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_json, resolve_dir};
use crate::migration::upgrade::{UpgradeAssistant, latest_version};

#[derive(Args)]
pub struct VersionCommand {
    /// Configuration directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl VersionCommand {
    pub async fn execute(self) -> Result<()> {
        let dir = resolve_dir(self.dir)?;
        let assistant = UpgradeAssistant::new(&dir);
        let versions = assistant.version_manager();

        let current = versions.detect_current_version();
        let metadata = versions.load_metadata();
        let latest = latest_version();
        let migration_needed = versions.is_migration_needed();
        let upgrade = assistant.check_for_upgrades();
        let history = assistant.upgrade_history()?;

        if self.format == OutputFormat::Json {
            return print_json(&serde_json::json!({
                "tool_version": env!("CARGO_PKG_VERSION"),
                "config_version": current,
                "latest_template_version": latest,
                "upgrade_available": upgrade,
                "migration_needed": migration_needed,
                "metadata": metadata,
                "upgrade_backups": history,
            }));
        }

        println!("ccsetup {}", env!("CARGO_PKG_VERSION").bold());
        let shown = current.as_ref().map_or_else(|| "unknown".dimmed().to_string(), ToString::to_string);
        println!("Configuration version: {shown}");
        println!("Latest template version: {latest}");
        if let Some(metadata) = &metadata {
            println!("Template type: {}", metadata.template_type);
            println!("Last updated: {}", metadata.updated_at.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(last) = history.first() {
            println!("Last upgrade backup: {} ({})", last.name, last.description);
        }
        if let Some(next) = upgrade {
            println!("{} Upgrade available: {next} (run `ccsetup upgrade`)", "⚠".yellow());
        } else if migration_needed {
            println!("{} Metadata is missing or out of date (run `ccsetup upgrade`)", "⚠".yellow());
        }
        Ok(())
    }
}
