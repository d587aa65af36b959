//! Checks over a whole template tree, for CI.
//!
//! ```bash
//! ccsetup templates check
//! ccsetup templates check ./templates --format json
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, print_failure, print_finding, print_json, print_success};
use crate::config::ToolConfig;
use crate::core::CcsetupError;
use crate::validation::tree::TreeChecker;

#[derive(Subcommand)]
pub enum TemplatesCommand {
    /// Check every CLAUDE.md, settings.json and .mcp.json below ROOT
    Check(CheckArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Templates root (defaults to `templates_dir` from the tool config)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl TemplatesCommand {
    pub async fn execute(self, config: &ToolConfig) -> Result<()> {
        match self {
            Self::Check(args) => args.execute(config),
        }
    }
}

impl CheckArgs {
    fn execute(self, config: &ToolConfig) -> Result<()> {
        let root = self.root.unwrap_or_else(|| PathBuf::from(&config.templates_dir));
        let report = TreeChecker::new(&root, config.required_sections.clone()).check()?;
        let counts = report.counts();

        match self.format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Text => {
                println!("Checked {} file(s) under {}", report.files_checked, root.display().to_string().bold());
                for finding in &report.findings {
                    print_finding(finding, &root);
                }
                if report.passed() {
                    print_success("All templates passed");
                } else {
                    print_failure(&format!("{} error(s), {} warning(s)", counts.errors, counts.warnings));
                }
            }
        }

        if report.passed() {
            Ok(())
        } else {
            Err(CcsetupError::ValidationFailed { errors: counts.errors }.into())
        }
    }
}
