//! Validate a project's Claude configuration.
//!
//! Runs the CLAUDE.md, settings.json and MCP validators against a directory, plus the
//! template structure validator when the directory uses the template layout (a
//! top-level `settings.json`) or `--template` is passed.
//!
//! # Examples
//!
//! ```bash
//! ccsetup validate
//! ccsetup validate ./my-project --strict --no-probe
//! ccsetup validate --format json
//! ```
//!
//! The command fails when any error is found, or with `--strict` when any warning is.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::common::{OutputFormat, print_failure, print_finding, print_json, print_success, resolve_dir};
use crate::config::ToolConfig;
use crate::core::CcsetupError;
use crate::validation::claude_md::ClaudeMdValidator;
use crate::validation::health::ValidatorFindings;
use crate::validation::mcp::McpValidator;
use crate::validation::settings::SettingsValidator;
use crate::validation::template::TemplateValidator;
use crate::validation::{Finding, FindingCounts, Validator, find_settings_file};

#[derive(Args)]
pub struct ValidateCommand {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// Do not start MCP servers to test connectivity
    #[arg(long)]
    pub no_probe: bool,

    /// Always run the template structure checks
    #[arg(long)]
    pub template: bool,
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    valid: bool,
    strict: bool,
    summary: Summary,
    validators: BTreeMap<&'a str, &'a [Finding]>,
}

#[derive(Serialize)]
struct Summary {
    errors: usize,
    warnings: usize,
    info: usize,
}

impl ValidateCommand {
    pub async fn execute(self, config: &ToolConfig) -> Result<()> {
        let dir = resolve_dir(self.dir.clone())?;
        let groups = self.run_validators(&dir, config).await;

        let counts = FindingCounts::from_findings(groups.iter().flat_map(|g| g.findings.iter()));
        let valid = counts.errors == 0 && (!self.strict || counts.warnings == 0);

        match self.format {
            OutputFormat::Json => print_json(&ValidationOutput {
                valid,
                strict: self.strict,
                summary: Summary {
                    errors: counts.errors,
                    warnings: counts.warnings,
                    info: counts.info,
                },
                validators: groups.iter().map(|g| (g.name.as_str(), g.findings.as_slice())).collect(),
            })?,
            OutputFormat::Text => print_text(&dir, &groups, counts, valid),
        }

        if valid {
            Ok(())
        } else {
            let errors = if self.strict { counts.errors + counts.warnings } else { counts.errors };
            Err(CcsetupError::ValidationFailed { errors }.into())
        }
    }

    async fn run_validators(&self, dir: &Path, config: &ToolConfig) -> Vec<ValidatorFindings> {
        let mut groups = Vec::new();

        let mut claude_md = ClaudeMdValidator::new(dir.join("CLAUDE.md"), config);
        groups.push(run(&mut claude_md));

        let settings_path = find_settings_file(dir).unwrap_or_else(|| dir.join(".claude").join("settings.json"));
        groups.push(run(&mut SettingsValidator::new(settings_path, config)));

        let mut mcp = McpValidator::new(dir);
        let mut mcp_group = run(&mut mcp);
        if config.probe_mcp_servers && !self.no_probe {
            mcp_group.findings.extend(mcp.probe_servers(config.probe_timeout()).await);
        }
        groups.push(mcp_group);

        if self.template || dir.join("settings.json").is_file() {
            groups.push(run(&mut TemplateValidator::new(dir)));
        } else {
            tracing::debug!("{} is not a template directory, skipping template checks", dir.display());
        }
        groups
    }
}

fn run(validator: &mut impl Validator) -> ValidatorFindings {
    tracing::debug!("Running validator '{}'", validator.name());
    ValidatorFindings {
        name: validator.name().to_string(),
        findings: validator.validate(),
    }
}

fn print_text(dir: &Path, groups: &[ValidatorFindings], counts: FindingCounts, valid: bool) {
    println!("Validating {}", dir.display().to_string().bold());
    for group in groups {
        println!("\n{}", group.name.bold());
        if group.findings.is_empty() {
            print_success("No issues");
            continue;
        }
        for finding in &group.findings {
            print_finding(finding, dir);
        }
    }

    println!();
    let summary = format!(
        "{} error(s), {} warning(s), {} info",
        counts.errors, counts.warnings, counts.info
    );
    if valid {
        print_success(&format!("Validation passed: {summary}"));
    } else {
        print_failure(&format!("Validation failed: {summary}"));
    }
}
