//! Compare two configuration directories.
//!
//! ```bash
//! ccsetup diff ./old ./new
//! ccsetup diff ./old ./new --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

use super::common::{OutputFormat, print_json, print_success};
use crate::core::CcsetupError;
use crate::migration::diff::SmartDiffEngine;
use crate::migration::{ConfigChange, ImpactLevel};

#[derive(Args)]
pub struct DiffCommand {
    /// Baseline configuration directory
    #[arg(value_name = "OLD")]
    pub old: PathBuf,

    /// Configuration directory to compare against the baseline
    #[arg(value_name = "NEW")]
    pub new: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl DiffCommand {
    pub async fn execute(self) -> Result<()> {
        for dir in [&self.old, &self.new] {
            if !dir.is_dir() {
                return Err(CcsetupError::ConfigDirNotFound {
                    path: dir.display().to_string(),
                }
                .into());
            }
        }

        let mut engine = SmartDiffEngine::new();
        let changes = engine.compare_configurations(&self.old, &self.new)?;
        let summary = SmartDiffEngine::summary(&changes);

        match self.format {
            OutputFormat::Json => print_json(&serde_json::json!({
                "summary": summary,
                "changes": changes,
            }))?,
            OutputFormat::Text => {
                if changes.is_empty() {
                    print_success("No changes");
                    return Ok(());
                }
                for impact in [ImpactLevel::Critical, ImpactLevel::High, ImpactLevel::Medium, ImpactLevel::Low] {
                    let group = engine.changes_by_impact(impact);
                    if group.is_empty() {
                        continue;
                    }
                    println!("{} ({})", impact_label(impact), group.len());
                    for change in group {
                        print_change(change);
                    }
                }
                let impacts: Vec<String> = summary.by_impact.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                println!(
                    "\n{} change(s) ({}), {} auto-mergeable, {} need review",
                    summary.total_changes,
                    impacts.join(", "),
                    summary.auto_mergeable,
                    summary.requires_review
                );
            }
        }
        Ok(())
    }
}

fn impact_label(impact: ImpactLevel) -> ColoredString {
    let label = format!("{impact} impact");
    match impact {
        ImpactLevel::Low => label.dimmed(),
        ImpactLevel::Medium => label.yellow(),
        ImpactLevel::High => label.red(),
        ImpactLevel::Critical => label.red().bold(),
    }
}

fn print_change(change: &ConfigChange) {
    let merge = if change.auto_mergeable { "auto".green() } else { "review".yellow() };
    println!("  [{merge}] {}", change.description);
    if let Some(section) = change.section.as_deref().filter(|s| change.line_number.is_some() && !s.is_empty()) {
        println!("      {} {section}", "in".dimmed());
    }
}
