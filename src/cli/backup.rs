//! Manage configuration backups.
//!
//! ```bash
//! ccsetup backup create -d "before refactor"
//! ccsetup backup list
//! ccsetup backup restore backup_20250101_120000 --yes
//! ccsetup backup cleanup --keep 5
//! ccsetup backup export backup_20250101_120000 ./saved.zip
//! ccsetup backup import ./saved.zip --name from-laptop
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_json, print_migration_result, print_success, resolve_dir};
use crate::config::ToolConfig;
use crate::core::CcsetupError;
use crate::migration::backup::{BackupInfo, BackupManager};

#[derive(Args)]
pub struct BackupDir {
    /// Configuration directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// Archive the current configuration
    Create {
        /// What the backup is for
        #[arg(short, long, default_value = "Manual backup")]
        description: String,

        /// Archive name (defaults to backup_<timestamp>)
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        target: BackupDir,
    },

    /// List backups, newest first
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        target: BackupDir,
    },

    /// Restore a backup over the current configuration
    Restore {
        name: String,

        /// Confirm the restore
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        target: BackupDir,
    },

    /// Delete a backup
    Delete {
        name: String,

        #[command(flatten)]
        target: BackupDir,
    },

    /// Delete all but the newest backups
    Cleanup {
        /// How many to keep (defaults to `backup_keep` from the tool config)
        #[arg(long)]
        keep: Option<usize>,

        #[command(flatten)]
        target: BackupDir,
    },

    /// Copy a backup archive out of the project
    Export {
        name: String,
        destination: PathBuf,

        #[command(flatten)]
        target: BackupDir,
    },

    /// Copy an external archive into the project's backups
    Import {
        source: PathBuf,

        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        target: BackupDir,
    },
}

impl BackupCommand {
    const fn target(&self) -> &BackupDir {
        match self {
            Self::Create { target, .. }
            | Self::List { target, .. }
            | Self::Restore { target, .. }
            | Self::Delete { target, .. }
            | Self::Cleanup { target, .. }
            | Self::Export { target, .. }
            | Self::Import { target, .. } => target,
        }
    }

    pub async fn execute(self, config: &ToolConfig) -> Result<()> {
        let dir = resolve_dir(self.target().dir.clone())?;
        let manager = BackupManager::new(&dir);

        match self {
            Self::Create { description, name, .. } => {
                let info = manager.create(&description, name.as_deref())?;
                print_success(&format!("Created backup {} ({} files)", info.name.bold(), info.files_count));
                println!("  {}", info.path.display());
            }
            Self::List { format, .. } => {
                let backups = manager.list()?;
                match format {
                    OutputFormat::Json => print_json(&backups)?,
                    OutputFormat::Text => print_backups(&backups, manager.total_size()?),
                }
            }
            Self::Restore { name, yes, .. } => {
                let known = manager.list()?.iter().any(|b| b.name == name);
                if known && !yes {
                    return Err(CcsetupError::RestoreNotConfirmed { name }.into());
                }
                let result = manager.restore(&name, yes);
                print_migration_result(&result);
                if !result.is_success() {
                    return Err(anyhow::anyhow!(result.message));
                }
            }
            Self::Delete { name, .. } => {
                manager.delete(&name)?;
                print_success(&format!("Deleted backup {name}"));
            }
            Self::Cleanup { keep, .. } => {
                let keep = keep.unwrap_or(config.backup_keep);
                let removed = manager.cleanup_old(keep)?;
                print_success(&format!("Removed {removed} backup(s), kept the newest {keep}"));
            }
            Self::Export { name, destination, .. } => {
                let path = manager.export(&name, &destination)?;
                print_success(&format!("Exported {name} to {}", path.display()));
            }
            Self::Import { source, name, .. } => {
                let info = manager.import(&source, name.as_deref())?;
                print_success(&format!("Imported {} as {}", source.display(), info.name.bold()));
            }
        }
        Ok(())
    }
}

fn print_backups(backups: &[BackupInfo], total_size: u64) {
    if backups.is_empty() {
        println!("No backups found");
        return;
    }
    for backup in backups {
        let version = backup.version.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {} files  {}  v{version}",
            backup.name.bold(),
            backup.timestamp.format("%Y-%m-%d %H:%M:%S"),
            backup.files_count,
            format_size(backup.size_bytes),
        );
        if !backup.description.is_empty() {
            println!("    {}", backup.description.dimmed());
        }
    }
    println!("\n{} backup(s), {} total", backups.len(), format_size(total_size));
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{size:.1} {}", UNITS[unit]) }
}
