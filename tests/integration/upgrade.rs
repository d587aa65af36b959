use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;
use serde_json::Value;

use crate::common::{FileAssert, TestProject};

fn project_at(version: &str) -> TestProject {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", fixtures::COMPLETE_CLAUDE_MD).unwrap();
    project.write(".claude/settings.json", r#"{"theme": "dark"}"#).unwrap();
    project.write(".version", &format!("{version}\n")).unwrap();
    project
}

#[test]
fn test_upgrade_check() {
    let project = project_at("1.0.0");
    project
        .run_ccsetup(&["upgrade", "--check"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Current version: 1.0.0")
        .assert_stdout_contains("Upgrade available: 1.1.0");

    let latest = project_at("2.0.1");
    latest
        .run_ccsetup(&["upgrade", "--check"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Configuration is up to date");
}

#[test]
fn test_upgrade_preview_does_not_write() {
    let project = project_at("1.0.0");
    project
        .run_ccsetup(&["upgrade", "--to", "2.0.0"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("1.1.0: Added persona support")
        .assert_stdout_contains("Major version upgrade - may require manual review")
        .assert_stdout_contains("Run with --yes");

    assert_eq!(project.read(".version").unwrap().trim(), "1.0.0");
    assert!(project.backups().is_empty());
}

#[test]
fn test_upgrade_applies_steps_and_rolls_back() {
    let project = project_at("1.0.0");
    project
        .run_ccsetup(&["upgrade", "--to", "1.2.0", "--yes"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Successfully upgraded from 1.0.0 to 1.2.0");

    assert_eq!(project.read(".version").unwrap().trim(), "1.2.0");
    assert!(project.read("CLAUDE.md").unwrap().contains("## Personas"));
    let settings: Value = serde_json::from_str(&project.read(".claude/settings.json").unwrap()).unwrap();
    assert_eq!(settings["theme"], "dark");
    assert!(settings["permissions"]["allow"].is_array());
    assert!(settings["permissions"]["deny"].is_array());

    let backups = project.backups();
    assert_eq!(backups.len(), 1);
    let name = backups[0].trim_end_matches(".zip").to_string();

    project
        .run_ccsetup(&["rollback", &name])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Configuration restored from backup");
    assert_eq!(project.read(".version").unwrap().trim(), "1.0.0");
    assert!(!project.read("CLAUDE.md").unwrap().contains("## Personas"));
}

#[test]
fn test_upgrade_failure_restores_backup() {
    let project = project_at("1.1.0");
    project.write(".claude/settings.json", "[1, 2]").unwrap();

    project
        .command()
        .args(["upgrade", "--to", "1.2.0", "--yes"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Upgrade failed at step: Enhance security settings"))
        .stdout(predicate::str::contains("Configuration restored from backup"));

    assert_eq!(project.read(".version").unwrap().trim(), "1.1.0");
    assert_eq!(project.read(".claude/settings.json").unwrap(), "[1, 2]");
}

#[test]
fn test_upgrade_failure_removes_created_version_files() {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", &format!("Version: 1.0.0\n\n{}", fixtures::COMPLETE_CLAUDE_MD)).unwrap();
    project.write(".claude/settings.json", "[1, 2]").unwrap();

    project
        .run_ccsetup(&["upgrade", "--to", "2.0.1", "--yes"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("Configuration restored from backup");

    FileAssert::not_exists(project.project_path().join(".version"));
    FileAssert::not_exists(project.project_path().join(".metadata.json"));
    project
        .run_ccsetup(&["upgrade", "--check"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Current version: 1.0.0")
        .assert_stdout_contains("Upgrade available: 1.1.0");
}

#[test]
fn test_upgrade_rejects_downgrade_and_unknown_versions() {
    let project = project_at("1.2.0");
    project
        .run_ccsetup(&["upgrade", "--to", "1.0.0", "--yes"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("Cannot upgrade from 1.2.0 to 1.0.0");

    project
        .run_ccsetup(&["upgrade", "--to", "3.0.0", "--yes"])
        .unwrap()
        .assert_failure();
    assert!(project.backups().is_empty());

    project
        .command()
        .args(["upgrade", "--to", "not-a-version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-version"));
}

#[test]
fn test_upgrade_initializes_unversioned_project() {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", fixtures::COMPLETE_CLAUDE_MD).unwrap();

    project
        .run_ccsetup(&["upgrade"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Project initialized with latest template version 2.0.1");
    assert_eq!(project.read(".version").unwrap().trim(), "2.0.1");

    let metadata: Value = serde_json::from_str(&project.read(".metadata.json").unwrap()).unwrap();
    assert_eq!(metadata["template_type"], "new_project");
}

#[test]
fn test_version_command() {
    let project = project_at("1.0.0");
    project
        .run_ccsetup(&["version"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains(concat!("ccsetup ", env!("CARGO_PKG_VERSION")))
        .assert_stdout_contains("Configuration version: 1.0.0")
        .assert_stdout_contains("Latest template version: 2.0.1")
        .assert_stdout_contains("Upgrade available: 1.1.0");

    let output = project.run_ccsetup(&["version", "--format", "json"]).unwrap();
    output.assert_success();
    let json = output.json();
    assert_eq!(json["config_version"], "1.0.0");
    assert_eq!(json["migration_needed"], true);
}
