//! Resolve conflicts between a local file and an updated template file.
//!
//! ```bash
//! ccsetup merge CLAUDE.md ../template/CLAUDE.md
//! ccsetup merge settings.json ../template/settings.json --strategy json_prefer_structure
//! ccsetup merge settings.json ../template/settings.json --apply
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_json, print_success};
use crate::core::CcsetupError;
use crate::migration::conflict::{ConflictResolver, Resolution, Strategy, conflict_backup_path};

#[derive(Args)]
pub struct MergeCommand {
    /// The file to resolve into
    #[arg(value_name = "LOCAL")]
    pub local: PathBuf,

    /// The incoming version of the file
    #[arg(value_name = "REMOTE")]
    pub remote: PathBuf,

    /// Write every confident resolution back to LOCAL
    #[arg(long)]
    pub apply: bool,

    /// Strategy to propose where it applies (e.g. prefer_local, json_deep_merge)
    #[arg(long, conflicts_with = "apply")]
    pub strategy: Option<String>,

    /// Do not keep a .conflict_backup copy of LOCAL when applying
    #[arg(long, requires = "apply")]
    pub no_backup: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl MergeCommand {
    pub async fn execute(self) -> Result<()> {
        for file in [&self.local, &self.remote] {
            if !file.is_file() {
                return Err(CcsetupError::FileSystemError {
                    operation: "read".to_string(),
                    path: file.display().to_string(),
                }
                .into());
            }
        }

        let strategy = self.strategy.as_deref().map(str::parse::<Strategy>).transpose()?;
        let resolver = ConflictResolver::new().with_backups(!self.no_backup);

        let resolutions: Vec<Resolution> = if self.apply {
            resolver.auto_resolve_file(&self.local, &self.remote)?
        } else {
            resolver
                .detect_conflicts(&self.local, &self.remote)?
                .iter()
                .map(|c| resolver.resolve(c, strategy))
                .collect()
        };

        if self.format == OutputFormat::Json {
            return print_json(&resolutions);
        }

        if resolutions.is_empty() {
            print_success("No conflicts");
            return Ok(());
        }

        for resolution in &resolutions {
            print_resolution(resolution, self.apply);
        }

        let applied = resolutions.iter().filter(|r| r.applied).count();
        if self.apply {
            println!("\n{applied} of {} resolution(s) applied", resolutions.len());
            let backup = conflict_backup_path(&self.local);
            if applied > 0 && backup.exists() {
                println!("Backup: {}", backup.display());
            }
        } else {
            let ready = resolutions.iter().filter(|r| r.is_auto_applicable()).count();
            println!("\n{ready} of {} resolution(s) can be applied with --apply", resolutions.len());
        }
        Ok(())
    }
}

fn print_resolution(resolution: &Resolution, applying: bool) {
    let conflict = &resolution.conflict;
    let location = conflict
        .section
        .clone()
        .or_else(|| (!conflict.key_path.is_empty()).then(|| conflict.key_path.join(".")))
        .unwrap_or_default();
    println!("{} {} {}", format!("[{}]", conflict.conflict_type).bold(), conflict.description, location.dimmed());
    println!(
        "    {} {} ({:.0}% confidence)",
        "→".green(),
        resolution.strategy,
        resolution.confidence * 100.0
    );
    println!("      {}", resolution.explanation.dimmed());
    if resolution.requires_review {
        println!("    {} needs manual review", "⚠".yellow());
    } else if applying && !resolution.applied {
        println!("    {} not applied", "⚠".yellow());
    }
}
