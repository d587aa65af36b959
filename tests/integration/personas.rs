use predicates::prelude::*;

use crate::common::{FileAssert, TestProject};

#[test]
fn test_personas_list_and_info() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&["personas", "list"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Architect (architect)")
        .assert_stdout_contains("DevOps Engineer (devops-engineer)")
        .assert_stdout_contains("No persona currently active");

    let output = project.run_ccsetup(&["personas", "list", "--format", "json"]).unwrap();
    output.assert_success();
    let json = output.json();
    assert_eq!(json.as_array().unwrap().len(), 9);
    assert_eq!(json[1]["id"], "data-scientist");

    project
        .run_ccsetup(&["personas", "info", "security engineer"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Security Engineer Persona")
        .assert_stdout_contains("Secrets Management")
        .assert_stdout_contains("security-audit");

    project
        .command()
        .args(["personas", "info", "wizard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown persona: wizard"))
        .stderr(predicate::str::contains("ccsetup personas list"));
}

#[test]
fn test_personas_suggest() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&["personas", "suggest", "harden", "auth", "before", "deployment"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Suggested personas for 'harden auth before deployment'")
        .assert_stdout_contains("DevOps Engineer")
        .assert_stdout_contains("Security Engineer");

    let output = project
        .run_ccsetup(&["personas", "suggest", "--command", "/performance-audit", "--format", "json"])
        .unwrap();
    output.assert_success();
    let json = output.json();
    let ids: Vec<&str> = json.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["architect", "performance-engineer"]);

    project
        .run_ccsetup(&["personas", "suggest", "linux", "packages"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No persona suggestions for 'linux packages'");
}

#[test]
fn test_personas_activation_persists() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&["personas", "activate", "architect"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Activated Architect persona");
    assert_eq!(project.read(".claude/active_persona").unwrap(), "architect\n");

    project
        .run_ccsetup(&["personas", "activate", "Tester"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Deactivated Architect")
        .assert_stdout_contains("Activated Tester persona");
    project
        .run_ccsetup(&["personas", "list"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Currently active: Tester");

    project
        .run_ccsetup(&["personas", "deactivate"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Deactivated Tester persona");
    FileAssert::not_exists(project.project_path().join(".claude/active_persona"));
    project
        .run_ccsetup(&["personas", "deactivate"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No persona is currently active");
}

#[test]
fn test_personas_templates_are_scanned() {
    let project = TestProject::new().unwrap();
    project.write("templates/personas/architect.md", "# Architect\n\nThink in systems.\n").unwrap();
    project.write(".claude/personas/architect.md", "# Architect\n\nThis project's architect.\n").unwrap();
    project.write(".claude/personas/reviewer.md", "# Reviewer\n").unwrap();

    project
        .run_ccsetup(&["personas", "info", "architect", "--template"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("This project's architect.");
    project
        .run_ccsetup(&["personas", "info", "tester", "--template"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No template found for Tester");
    project
        .run_ccsetup(&["personas", "list"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("reviewer.md does not match a known persona");

    let output = project.run_ccsetup(&["personas", "export"]).unwrap();
    output.assert_success();
    let json = output.json();
    assert!(json["architect"]["template_path"].as_str().unwrap().ends_with("architect.md"));
    assert!(json["tester"]["template_path"].is_null());
}
