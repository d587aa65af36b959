//! Argument parsing tests for the CLI.
//!
//! Command behaviour is covered by the integration tests; these only check that
//! flags land in the right fields and that invalid combinations are rejected.

use clap::Parser;
use std::path::PathBuf;

use super::common::OutputFormat;
use super::{Cli, Commands};
use crate::setup::{Database, Framework, Mode};

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["ccsetup"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn test_cli_help_and_unknown_command() {
    assert!(Cli::try_parse_from(["ccsetup", "--help"]).is_err());
    assert!(Cli::try_parse_from(["ccsetup", "install"]).is_err());
    assert!(Cli::try_parse_from(["ccsetup"]).is_err());
}

#[test]
fn test_global_flags() {
    let cli = parse(&["validate", "--verbose", "--no-color", "--config", "/tmp/tool.toml"]);
    assert!(cli.verbose);
    assert!(cli.no_color);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/tool.toml")));

    let cli = parse(&["-q", "health"]);
    assert!(cli.quiet);
    assert!(!cli.verbose);

    assert!(Cli::try_parse_from(["ccsetup", "-v", "-q", "validate"]).is_err());
}

#[test]
fn test_validate_args() {
    let cli = parse(&["validate", "./project", "--format", "json", "--strict", "--no-probe"]);
    let Commands::Validate(cmd) = cli.command else {
        panic!("expected validate");
    };
    assert_eq!(cmd.dir, Some(PathBuf::from("./project")));
    assert_eq!(cmd.format, OutputFormat::Json);
    assert!(cmd.strict);
    assert!(cmd.no_probe);
    assert!(!cmd.template);

    assert!(Cli::try_parse_from(["ccsetup", "validate", "--format", "yaml"]).is_err());
}

#[test]
fn test_health_dry_run_requires_fix() {
    assert!(Cli::try_parse_from(["ccsetup", "health", "--dry-run"]).is_err());

    let cli = parse(&["health", "--fix", "--dry-run", "--output", "report.json"]);
    let Commands::Health(cmd) = cli.command else {
        panic!("expected health");
    };
    assert!(cmd.fix);
    assert!(cmd.dry_run);
    assert_eq!(cmd.output, Some(PathBuf::from("report.json")));
}

#[test]
fn test_templates_check() {
    let cli = parse(&["templates", "check", "./templates"]);
    let Commands::Templates(super::templates::TemplatesCommand::Check(args)) = cli.command else {
        panic!("expected templates check");
    };
    assert_eq!(args.root, Some(PathBuf::from("./templates")));
    assert_eq!(args.format, OutputFormat::Text);
}

#[test]
fn test_upgrade_args() {
    let cli = parse(&["upgrade", "--to", "2.0.1", "--yes", "--no-backup"]);
    let Commands::Upgrade(cmd) = cli.command else {
        panic!("expected upgrade");
    };
    assert_eq!(cmd.to.as_deref(), Some("2.0.1"));
    assert!(cmd.yes);
    assert!(cmd.no_backup);
    assert!(!cmd.check);

    let cli = parse(&["rollback", "backup_20250101_120000", "--dir", "/tmp/p"]);
    let Commands::Rollback(cmd) = cli.command else {
        panic!("expected rollback");
    };
    assert_eq!(cmd.name, "backup_20250101_120000");
    assert_eq!(cmd.dir, Some(PathBuf::from("/tmp/p")));
}

#[test]
fn test_backup_subcommands() {
    use super::backup::BackupCommand;

    let cli = parse(&["backup", "create", "-d", "before refactor", "--name", "snap"]);
    let Commands::Backup(BackupCommand::Create { description, name, .. }) = cli.command else {
        panic!("expected backup create");
    };
    assert_eq!(description, "before refactor");
    assert_eq!(name.as_deref(), Some("snap"));

    let cli = parse(&["backup", "cleanup", "--keep", "3", "--dir", "/tmp/p"]);
    let Commands::Backup(BackupCommand::Cleanup { keep, target }) = cli.command else {
        panic!("expected backup cleanup");
    };
    assert_eq!(keep, Some(3));
    assert_eq!(target.dir, Some(PathBuf::from("/tmp/p")));

    assert!(Cli::try_parse_from(["ccsetup", "backup", "restore"]).is_err());
}

#[test]
fn test_merge_strategy_conflicts_with_apply() {
    assert!(Cli::try_parse_from(["ccsetup", "merge", "a.json", "b.json", "--apply", "--strategy", "prefer_local"]).is_err());
    assert!(Cli::try_parse_from(["ccsetup", "merge", "a.json", "b.json", "--no-backup"]).is_err());

    let cli = parse(&["merge", "a.json", "b.json", "--strategy", "prefer_local"]);
    let Commands::Merge(cmd) = cli.command else {
        panic!("expected merge");
    };
    assert_eq!(cmd.strategy.as_deref(), Some("prefer_local"));
    assert!(!cmd.apply);
}

#[test]
fn test_personas_subcommands() {
    use super::personas::PersonasCommand;

    let cli = parse(&["personas", "suggest", "fix", "the", "auth", "flow", "--dir", "/tmp/project"]);
    let Commands::Personas(PersonasCommand::Suggest { context, command, format, target }) = cli.command else {
        panic!("expected personas suggest");
    };
    assert_eq!(context, vec!["fix", "the", "auth", "flow"]);
    assert_eq!(command, None);
    assert_eq!(format, OutputFormat::Text);
    assert_eq!(target.dir, Some(PathBuf::from("/tmp/project")));

    let cli = parse(&["personas", "suggest", "--command", "/load-test", "--format", "json"]);
    let Commands::Personas(PersonasCommand::Suggest { context, command, format, .. }) = cli.command else {
        panic!("expected personas suggest");
    };
    assert!(context.is_empty());
    assert_eq!(command.as_deref(), Some("/load-test"));
    assert_eq!(format, OutputFormat::Json);

    let cli = parse(&["personas", "info", "DevOps Engineer", "--template"]);
    let Commands::Personas(PersonasCommand::Info { name, template, .. }) = cli.command else {
        panic!("expected personas info");
    };
    assert_eq!(name, "DevOps Engineer");
    assert!(template);

    assert!(Cli::try_parse_from(["ccsetup", "personas", "suggest"]).is_err());
    assert!(Cli::try_parse_from(["ccsetup", "personas", "suggest", "api", "--command", "api-design"]).is_err());
    assert!(Cli::try_parse_from(["ccsetup", "personas", "activate"]).is_err());
}

#[test]
fn test_setup_args() {
    let cli = parse(&[
        "setup",
        "--framework",
        "FastAPI",
        "--mode",
        "team",
        "--database",
        "sqlite",
        "--mcp-servers",
        "github,puppeteer",
        "--create-local-template",
    ]);
    let Commands::Setup(cmd) = cli.command else {
        panic!("expected setup");
    };
    assert_eq!(cmd.framework, Framework::Fastapi);
    assert_eq!(cmd.mode, Mode::Team);
    assert_eq!(cmd.database, Some(Database::Sqlite));
    assert_eq!(cmd.mcp_servers, Some(vec!["github".to_string(), "puppeteer".to_string()]));
    assert!(cmd.create_local_template);
    assert!(!cmd.force);

    let cli = parse(&["setup"]);
    let Commands::Setup(cmd) = cli.command else {
        panic!("expected setup");
    };
    assert_eq!(cmd.framework, Framework::Core);
    assert_eq!(cmd.mode, Mode::Solo);

    assert!(Cli::try_parse_from(["ccsetup", "setup", "--framework", "rails"]).is_err());
}

#[test]
fn test_log_filter_levels() {
    // RUST_LOG overrides the flags, so only assert when it is unset
    if std::env::var("RUST_LOG").is_ok() {
        return;
    }
    assert_eq!(parse(&["-v", "version"]).log_filter().to_string(), "debug");
    assert_eq!(parse(&["-q", "version"]).log_filter().to_string(), "error");
    assert_eq!(parse(&["version"]).log_filter().to_string(), "warn");
}
