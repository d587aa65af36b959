//! Scaffold a project's Claude configuration.
//!
//! ```bash
//! ccsetup setup --framework fastapi
//! ccsetup setup --framework django --mode team --create-local-template
//! ccsetup setup --framework web-scraping --mcp-servers github,puppeteer --output-dir ./scraper
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{print_success, print_warning};
use crate::config::ToolConfig;
use crate::setup::{Database, Environment, Framework, Mode, ProjectSetup, SetupOptions, SetupReport};
use crate::validation::health::{HealthChecker, HealthStatus};

#[derive(Args)]
pub struct SetupCommand {
    /// Project framework (core, fastapi, django, flask, data-science, cli-tool, web-scraping)
    #[arg(long, default_value = "core")]
    pub framework: Framework,

    /// Solo developer or shared team setup
    #[arg(long, value_enum, default_value = "solo")]
    pub mode: Mode,

    /// Project name (defaults to the output directory's name)
    #[arg(long)]
    pub project_name: Option<String>,

    /// Database to wire an MCP server for (defaults to the framework's usual choice)
    #[arg(long, value_enum)]
    pub database: Option<Database>,

    /// Target environment
    #[arg(long, value_enum, default_value = "development")]
    pub environment: Environment,

    /// MCP servers to configure (defaults to the framework's recommendations)
    #[arg(long, value_delimiter = ',')]
    pub mcp_servers: Option<Vec<String>>,

    /// Where to write the configuration (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write .claude/settings.local.json.example (team mode)
    #[arg(long)]
    pub create_local_template: bool,

    /// Overwrite files that already exist
    #[arg(long)]
    pub force: bool,
}

impl SetupCommand {
    fn into_options(self) -> Result<SetupOptions> {
        let output_dir = match self.output_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let mut options = SetupOptions::new(self.framework, output_dir);
        options.mode = self.mode;
        options.project_name = self.project_name;
        options.database = self.database;
        options.environment = self.environment;
        options.mcp_servers = self.mcp_servers;
        options.create_local_template = self.create_local_template;
        options.force = self.force;
        Ok(options)
    }

    pub async fn execute(self, config: ToolConfig) -> Result<()> {
        let options = self.into_options()?;
        let dir = options.output_dir.clone();

        println!(
            "Setting up {} ({}) in {}",
            options.project_name().bold(),
            options.framework.display_name(),
            dir.display()
        );
        let report = ProjectSetup::new(options, &config).run()?;
        print_report(&report, &dir);

        let mut checker = HealthChecker::new(&dir, config).with_probe(false);
        let health = checker.run().await;
        let score = health.health_score();
        match health.status() {
            HealthStatus::Healthy => print_success(&format!("Health score: {score}/100")),
            _ => {
                print_warning(&format!("Health score: {score}/100"));
                for recommendation in health.recommendations() {
                    println!("  • {recommendation}");
                }
            }
        }
        Ok(())
    }
}

fn print_report(report: &SetupReport, dir: &std::path::Path) {
    let shown = |p: &PathBuf| p.strip_prefix(dir).unwrap_or(p).display().to_string();
    for path in &report.created {
        print_success(&format!("Wrote {}", shown(path)));
    }
    for path in &report.skipped {
        print_warning(&format!("Kept existing {} (use --force to overwrite)", shown(path)));
    }
    if !report.servers.is_empty() {
        println!("MCP servers: {}", report.servers.join(", "));
    }
    for name in &report.unknown_servers {
        print_warning(&format!("Unknown MCP server '{name}' was skipped"));
    }
    if report.gitignore_updated {
        print_success("Updated .gitignore");
    }
}
