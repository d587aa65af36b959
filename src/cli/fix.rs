//! Apply automatic repairs to a project's configuration.
//!
//! ```bash
//! ccsetup fix --dry-run
//! ccsetup fix ./project
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_failure, print_json, print_success, resolve_dir};
use crate::config::ToolConfig;
use crate::validation::health::{AutoFixStats, HealthChecker};

#[derive(Args)]
pub struct FixCommand {
    /// Configuration directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl FixCommand {
    pub async fn execute(self, config: ToolConfig) -> Result<()> {
        let dir = resolve_dir(self.dir)?;
        let mut checker = HealthChecker::new(&dir, config).with_probe(false);
        let before = checker.run().await.health_score();

        let stats = checker.auto_fix(self.dry_run).await?;
        let after = checker.report().health_score();

        match self.format {
            OutputFormat::Json => print_json(&stats)?,
            OutputFormat::Text => {
                print_fix_stats(&stats);
                if !self.dry_run && stats.fixes_applied > 0 {
                    println!("Health score: {before} → {after}");
                }
            }
        }
        Ok(())
    }
}

/// Print one line per planned or applied fix followed by the totals.
pub fn print_fix_stats(stats: &AutoFixStats) {
    if stats.fixable_issues_found == 0 {
        print_success("No fixable issues found");
        return;
    }

    let heading = if stats.dry_run { "Planned fixes" } else { "Applied fixes" };
    println!("{}", heading.bold());
    for fix in &stats.fixes {
        let name = fix.file_path.file_name().map_or_else(
            || fix.file_path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        );
        let line = format!("[{}] {name}: {}", fix.fix_type, fix.description);
        if fix.success {
            print_success(&line);
        } else {
            print_failure(&line);
        }
    }

    if stats.dry_run {
        println!("\n{} fix(es) would be applied. Run without --dry-run to apply them.", stats.fixes.len());
    } else {
        println!(
            "\n{} applied, {} failed ({:.0}% success), {} backup(s) created",
            stats.fixes_applied, stats.fixes_failed, stats.success_rate, stats.backups_created
        );
    }
}
