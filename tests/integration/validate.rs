use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;

use crate::common::TestProject;

fn complete_project() -> TestProject {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", fixtures::COMPLETE_CLAUDE_MD).unwrap();
    project.write(".claude/settings.json", fixtures::SETTINGS_JSON).unwrap();
    project.write(".mcp.json", fixtures::MCP_JSON).unwrap();
    project
}

#[test]
fn test_validate_complete_project() {
    let project = complete_project();
    let output = project.run_ccsetup(&["validate"]).unwrap();
    output
        .assert_success()
        .assert_stdout_contains("claude_config")
        .assert_stdout_contains("Validation passed");
}

#[test]
fn test_validate_missing_sections_are_warnings() {
    let project = complete_project();
    project.write("CLAUDE.md", fixtures::PARTIAL_CLAUDE_MD).unwrap();

    let output = project.run_ccsetup(&["validate"]).unwrap();
    output
        .assert_success()
        .assert_stdout_contains("Required section 'Critical Rules' not found");

    project
        .command()
        .args(["validate", "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation failed"));
}

#[test]
fn test_validate_reports_broken_includes() {
    let project = complete_project();
    project.write("CLAUDE.md", &fixtures::broken_claude_md()).unwrap();

    let output = project.run_ccsetup(&["validate"]).unwrap();
    output
        .assert_failure()
        .assert_stdout_contains("Referenced YAML file not found: shared/missing.yml")
        .assert_stdout_contains("Malformed @include statement");
}

#[test]
fn test_validate_resolves_yaml_includes() {
    let project = complete_project();
    let content = format!("{}\n@include shared/rules.yml#Core_Rules\n", fixtures::COMPLETE_CLAUDE_MD);
    project.write("CLAUDE.md", &content).unwrap();
    project.write("shared/rules.yml", fixtures::RULES_YAML).unwrap();

    project.run_ccsetup(&["validate"]).unwrap().assert_success();

    project.write("CLAUDE.md", &content.replace("Core_Rules", "Other_Rules")).unwrap();
    project
        .run_ccsetup(&["validate"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("Section 'Other_Rules' not found");
}

#[test]
fn test_validate_invalid_mcp_server() {
    let project = complete_project();
    project.write(".mcp.json", fixtures::INVALID_MCP_JSON).unwrap();

    let output = project.run_ccsetup(&["validate", "--no-probe"]).unwrap();
    output
        .assert_failure()
        .assert_stdout_contains("MCP server 'broken' missing required field: command");
}

#[test]
fn test_validate_json_output() {
    let project = complete_project();
    project.write("CLAUDE.md", fixtures::PARTIAL_CLAUDE_MD).unwrap();

    let output = project.run_ccsetup(&["validate", "--format", "json"]).unwrap();
    output.assert_success();
    let json = output.json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["summary"]["errors"], 0);
    assert_eq!(json["summary"]["warnings"], 2);
    assert!(json["validators"]["claude_config"].is_array());
    assert!(json["validators"].get("template").is_none());
}

#[test]
fn test_validate_missing_directory() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["validate", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn test_validate_empty_project_fails() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&["validate"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("CLAUDE.md file not found");
}
