use ccsetup_cli::config::{CONFIG_PATH_ENV, ToolConfig};
use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

use crate::common::TestProject;

const NARROW_CONFIG: &str = r#"
probe_mcp_servers = false
required_sections = ["Overview"]
max_line_length = 40
"#;

fn narrow_project() -> TestProject {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", "# Tool\n\n## Overview\n\nA short description.\n").unwrap();
    project.write(".claude/settings.json", fixtures::SETTINGS_JSON).unwrap();
    project.write("narrow.toml", NARROW_CONFIG).unwrap();
    project
}

#[test]
fn test_config_flag_changes_required_sections() {
    let project = narrow_project();

    // the default sections are missing, which --strict turns into a failure
    project
        .run_ccsetup(&["validate", "--strict"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("Required section 'Project Overview' not found");

    project
        .run_ccsetup(&["--config", "narrow.toml", "validate", "--strict"])
        .unwrap()
        .assert_success();
}

#[test]
fn test_config_flag_changes_line_limit() {
    let project = narrow_project();
    project
        .write("CLAUDE.md", "# Tool\n\n## Overview\n\nThis line is comfortably longer than forty characters.\n")
        .unwrap();

    project
        .run_ccsetup(&["--config", "narrow.toml", "validate"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Very long line");
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", fixtures::COMPLETE_CLAUDE_MD).unwrap();
    project.write(".claude/settings.json", fixtures::SETTINGS_JSON).unwrap();

    project
        .run_ccsetup(&["--config", "does-not-exist.toml", "validate", "--no-probe"])
        .unwrap()
        .assert_success();
}

#[test]
fn test_malformed_config_file_is_reported() {
    let project = TestProject::new().unwrap();
    project.write("bad.toml", "backup_keep = \"lots\"\n").unwrap();

    project
        .command()
        .args(["--config", "bad.toml", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[tokio::test]
#[serial]
async fn test_environment_variable_selects_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("env.toml");
    ToolConfig {
        backup_keep: 7,
        probe_timeout_secs: 5,
        ..ToolConfig::default()
    }
    .save_to(&path)
    .await
    .unwrap();

    // SAFETY: serialized with the other tests that touch the environment
    unsafe { std::env::set_var(CONFIG_PATH_ENV, &path) };
    let config = ToolConfig::load().await;
    unsafe { std::env::remove_var(CONFIG_PATH_ENV) };

    let config = config.unwrap();
    assert_eq!(config.backup_keep, 7);
    assert_eq!(config.probe_timeout().as_secs(), 5);
    assert_eq!(config.required_sections, ToolConfig::default().required_sections);
}
