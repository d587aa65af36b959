use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;

use crate::common::TestProject;

fn write_template(project: &TestProject, name: &str, claude_md: &str) {
    project.write(&format!("templates/{name}/CLAUDE.md"), claude_md).unwrap();
    project.write(&format!("templates/{name}/settings.json"), fixtures::SETTINGS_JSON).unwrap();
    project.write(&format!("templates/{name}/.mcp.json"), fixtures::MCP_JSON).unwrap();
}

#[test]
fn test_templates_check_passes() {
    let project = TestProject::new().unwrap();
    write_template(&project, "core", fixtures::COMPLETE_CLAUDE_MD);
    write_template(&project, "web", fixtures::COMPLETE_CLAUDE_MD);

    // templates_dir from the tool config is relative to the working directory
    project
        .run_ccsetup(&["templates", "check"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Checked 6 file(s)")
        .assert_stdout_contains("All templates passed");
}

#[test]
fn test_templates_check_missing_section_is_an_error() {
    let project = TestProject::new().unwrap();
    write_template(&project, "core", fixtures::COMPLETE_CLAUDE_MD);
    write_template(&project, "partial", fixtures::PARTIAL_CLAUDE_MD);

    project
        .command()
        .args(["templates", "check", "templates"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Missing mandated section '## Critical Rules'"))
        .stdout(predicate::str::contains("partial"));
}

#[test]
fn test_templates_check_shape_errors_as_json() {
    let project = TestProject::new().unwrap();
    write_template(&project, "core", fixtures::COMPLETE_CLAUDE_MD);
    project.write("templates/core/.mcp.json", fixtures::INVALID_MCP_JSON).unwrap();
    project.write("templates/core/settings.json", r#"{"permissions": []}"#).unwrap();

    let output = project.run_ccsetup(&["templates", "check", "--format", "json"]).unwrap();
    output.assert_failure();
    let json = output.json();
    assert_eq!(json["files_checked"], 3);
    let messages: Vec<String> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["message"].as_str().unwrap().to_string())
        .collect();
    assert!(messages.iter().any(|m| m.contains("Server 'broken' is missing 'command'")));
    assert!(messages.iter().any(|m| m.contains("'permissions' must be an object")));
}

#[test]
fn test_templates_check_missing_root() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["templates", "check", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}
