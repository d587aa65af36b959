use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;

use crate::common::{FileAssert, TestProject};

fn project_with(claude_md: &str) -> TestProject {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", claude_md).unwrap();
    project.write(".claude/settings.json", fixtures::SETTINGS_JSON).unwrap();
    project.write(".mcp.json", fixtures::MCP_JSON).unwrap();
    project
}

#[test]
fn test_health_complete_project() {
    let project = project_with(fixtures::COMPLETE_CLAUDE_MD);
    project
        .run_ccsetup(&["health"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Configuration Health Check")
        .assert_stdout_contains("Errors:   0")
        .assert_stdout_contains("Health score:");
}

#[test]
fn test_health_missing_directory_is_critical() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["health", "missing-dir"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Configuration directory not found"));
}

#[test]
fn test_health_suggests_fix() {
    let project = project_with(fixtures::PARTIAL_CLAUDE_MD);
    project
        .run_ccsetup(&["health"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Required section 'Critical Rules' not found")
        .assert_stdout_contains("can be fixed automatically");
}

#[test]
fn test_health_fix_dry_run_leaves_files() {
    let project = project_with(fixtures::PARTIAL_CLAUDE_MD);
    project
        .run_ccsetup(&["health", "--fix", "--dry-run"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Planned fixes");
    assert_eq!(project.read("CLAUDE.md").unwrap(), fixtures::PARTIAL_CLAUDE_MD);
}

#[test]
fn test_fix_adds_missing_sections() {
    let project = project_with(fixtures::PARTIAL_CLAUDE_MD);
    project
        .run_ccsetup(&["fix"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Applied fixes");

    let content = project.read("CLAUDE.md").unwrap();
    assert!(content.contains("## Critical Rules"));
    assert!(content.contains("## Claude-Specific Instructions"));

    project
        .run_ccsetup(&["validate", "--strict"])
        .unwrap()
        .assert_success();
}

#[test]
fn test_fix_nothing_to_do() {
    let project = project_with(fixtures::COMPLETE_CLAUDE_MD);
    project
        .run_ccsetup(&["fix"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No fixable issues found");
}

#[test]
fn test_health_saves_json_report() {
    let project = project_with(fixtures::PARTIAL_CLAUDE_MD);
    let report = project.project_path().join("health.json");
    let output = project
        .run_ccsetup(&["health", "--format", "json", "--output", report.to_str().unwrap()])
        .unwrap();
    output.assert_success();
    assert!(output.json()["validators"].is_object());

    FileAssert::exists(&report);
    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert!(saved["validators"]["claude_config"].is_array());
}
