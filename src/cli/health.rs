//! Scored health check of a project's configuration.
//!
//! ```bash
//! ccsetup health
//! ccsetup health ./project --format json --output health.json
//! ccsetup health --fix --dry-run
//! ```
//!
//! Exits non-zero only when a critical issue is found.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_failure, print_json, print_success, print_warning};
use super::fix::print_fix_stats;
use crate::config::ToolConfig;
use crate::core::CcsetupError;
use crate::validation::health::{HealthChecker, HealthStatus};

#[derive(Args)]
pub struct HealthCommand {
    /// Configuration directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Include informational findings in text output
    #[arg(long)]
    pub show_all: bool,

    /// Apply automatic fixes after the check
    #[arg(long)]
    pub fix: bool,

    /// With --fix, only show what would change
    #[arg(long, requires = "fix")]
    pub dry_run: bool,

    /// Do not start MCP servers to test connectivity
    #[arg(long)]
    pub no_probe: bool,

    /// Also write the report to this file
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl HealthCommand {
    pub async fn execute(self, config: ToolConfig) -> Result<()> {
        // A missing directory is reported as a critical finding, not an error.
        let dir = match self.dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let probe = config.probe_mcp_servers && !self.no_probe;
        let mut checker = HealthChecker::new(&dir, config).with_probe(probe);
        let mut report = checker.run().await;

        let fix_stats = if self.fix && !report.has_critical_issues() {
            let stats = checker.auto_fix(self.dry_run).await?;
            report = checker.report();
            Some(stats)
        } else {
            None
        };

        match self.format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Text => {
                print!("{}", report.render_text(self.show_all));
                println!();
                let line = format!("Health score: {}/100", report.health_score());
                match report.status() {
                    HealthStatus::Healthy => print_success(&line),
                    HealthStatus::NeedsAttention => print_warning(&line),
                    HealthStatus::Critical => print_failure(&line),
                }

                let recommendations = report.recommendations();
                if !recommendations.is_empty() {
                    println!("\n{}", "Recommendations".bold());
                    for recommendation in recommendations {
                        println!("  • {recommendation}");
                    }
                }
                let fixable = report.fixable_issues().len();
                if fixable > 0 && !self.fix {
                    println!("\n{fixable} issue(s) can be fixed automatically with 'ccsetup health --fix'");
                }
                if let Some(stats) = &fix_stats {
                    println!();
                    print_fix_stats(stats);
                }
            }
        }

        if let Some(path) = &self.output {
            report.save_report(path, self.format.into()).await?;
            tracing::info!("Saved health report to {}", path.display());
        }

        if report.has_critical_issues() {
            return Err(CcsetupError::ValidationFailed {
                errors: report.counts().errors,
            }
            .into());
        }
        Ok(())
    }
}
