//! Command-line interface for ccsetup.
//!
//! Each subcommand lives in its own module with a clap `Args` struct and an async
//! `execute`. Commands print their results to stdout; logs go to stderr through
//! `tracing` so `--format json` output stays machine readable.
//!
//! # Commands
//!
//! - `validate` - run every validator against a project directory
//! - `health` - score a project's configuration, optionally repairing it
//! - `fix` - apply automatic repairs
//! - `templates check` - enforce the structural invariants over a template tree
//! - `upgrade` / `rollback` - move a project between template versions
//! - `backup` - create, list, restore and manage configuration snapshots
//! - `diff` / `merge` - compare two configurations and reconcile files
//! - `personas` - list, suggest and activate personas
//! - `setup` - scaffold a new project non-interactively
//! - `version` - show the tool and configuration versions
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log at `debug` / `error` (`RUST_LOG` takes precedence)
//! - `--config <PATH>` - tool configuration file instead of `~/.ccsetup/config.toml`
//! - `--no-color` - disable colored output

mod backup;
pub mod common;
mod diff;
mod fix;
mod health;
mod merge;
mod personas;
mod setup;
mod templates;
mod upgrade;
pub mod validate;
mod version;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ToolConfig;

#[derive(Parser)]
#[command(
    name = "ccsetup",
    about = "Validate, migrate and scaffold Claude Code configuration",
    version,
    long_about = "ccsetup checks CLAUDE.md, settings.json and .mcp.json files, tracks configuration versions, \
                  takes backups and sets up new projects."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the tool configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project's Claude configuration
    Validate(validate::ValidateCommand),

    /// Run a scored health check
    Health(health::HealthCommand),

    /// Automatically repair fixable issues
    Fix(fix::FixCommand),

    /// Check template trees
    #[command(subcommand)]
    Templates(templates::TemplatesCommand),

    /// Check for and apply template upgrades
    Upgrade(upgrade::UpgradeCommand),

    /// Restore the configuration from a backup
    Rollback(upgrade::RollbackCommand),

    /// Manage configuration backups
    #[command(subcommand)]
    Backup(backup::BackupCommand),

    /// Compare two configuration directories
    Diff(diff::DiffCommand),

    /// Detect and resolve conflicts between two versions of a file
    Merge(merge::MergeCommand),

    /// List, suggest and activate personas
    #[command(subcommand)]
    Personas(personas::PersonasCommand),

    /// Scaffold Claude configuration for a project
    Setup(setup::SetupCommand),

    /// Show tool and configuration versions
    Version(version::VersionCommand),
}

impl Cli {
    /// Set up logging and colors, load the tool configuration and run the command.
    pub async fn execute(self) -> Result<()> {
        self.init_logging();
        if self.no_color {
            colored::control::set_override(false);
        }

        let config = ToolConfig::load_with_optional(self.config.clone()).await?;
        tracing::debug!("Loaded tool configuration: {config:?}");

        match self.command {
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::Health(cmd) => cmd.execute(config).await,
            Commands::Fix(cmd) => cmd.execute(config).await,
            Commands::Templates(cmd) => cmd.execute(&config).await,
            Commands::Upgrade(cmd) => cmd.execute(&config).await,
            Commands::Rollback(cmd) => cmd.execute().await,
            Commands::Backup(cmd) => cmd.execute(&config).await,
            Commands::Diff(cmd) => cmd.execute().await,
            Commands::Merge(cmd) => cmd.execute().await,
            Commands::Personas(cmd) => cmd.execute(&config).await,
            Commands::Setup(cmd) => cmd.execute(config).await,
            Commands::Version(cmd) => cmd.execute().await,
        }
    }

    /// The log filter: `RUST_LOG` when set, else derived from `--verbose` / `--quiet`.
    fn log_filter(&self) -> EnvFilter {
        if std::env::var("RUST_LOG").is_ok_and(|v| !v.is_empty()) {
            return EnvFilter::from_default_env();
        }
        let level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        EnvFilter::new(level)
    }

    fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(!self.no_color)
            .try_init();
    }
}
