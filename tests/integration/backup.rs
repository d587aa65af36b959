use ccsetup_cli::test_utils::fixtures;
use predicates::prelude::*;

use crate::common::{FileAssert, TestProject};

fn configured_project() -> TestProject {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", fixtures::COMPLETE_CLAUDE_MD).unwrap();
    project.write(".claude/settings.json", fixtures::SETTINGS_JSON).unwrap();
    project.write(".mcp.json", fixtures::MCP_JSON).unwrap();
    project
}

#[test]
fn test_backup_create_and_list() {
    let project = configured_project();
    project
        .run_ccsetup(&["backup", "create", "-d", "before refactor", "--name", "snap"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Created backup snap (3 files)");
    assert_eq!(project.backups(), vec!["snap.zip".to_string()]);

    project
        .run_ccsetup(&["backup", "list"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("snap")
        .assert_stdout_contains("before refactor")
        .assert_stdout_contains("1 backup(s)");

    let output = project.run_ccsetup(&["backup", "list", "--format", "json"]).unwrap();
    output.assert_success();
    let json = output.json();
    assert_eq!(json[0]["name"], "snap");
    assert_eq!(json[0]["files_count"], 3);
}

#[test]
fn test_backup_name_collision_gets_suffix() {
    let project = configured_project();
    project.run_ccsetup(&["backup", "create", "--name", "snap"]).unwrap().assert_success();
    project.run_ccsetup(&["backup", "create", "--name", "snap"]).unwrap().assert_success();
    assert_eq!(project.backups().len(), 2);
    assert!(project.backups().contains(&"snap.zip".to_string()));
}

#[test]
fn test_backup_restore_requires_confirmation() {
    let project = configured_project();
    project.run_ccsetup(&["backup", "create", "--name", "snap"]).unwrap().assert_success();
    project.write("CLAUDE.md", "# Changed\n").unwrap();

    project
        .command()
        .args(["backup", "restore", "snap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires confirmation"));
    assert_eq!(project.read("CLAUDE.md").unwrap(), "# Changed\n");

    project
        .run_ccsetup(&["backup", "restore", "snap", "--yes"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Configuration restored from backup: snap");
    assert_eq!(project.read("CLAUDE.md").unwrap(), fixtures::COMPLETE_CLAUDE_MD);

    // the restore took a safety backup of the changed state first
    assert_eq!(project.backups().len(), 2);
}

#[test]
fn test_backup_restore_unknown_name() {
    let project = configured_project();
    project
        .run_ccsetup(&["backup", "restore", "nope", "--yes"])
        .unwrap()
        .assert_failure()
        .assert_stdout_contains("Backup not found: nope");
}

#[test]
fn test_backup_delete_and_cleanup() {
    let project = configured_project();
    for name in ["a", "b", "c", "d", "e"] {
        project.run_ccsetup(&["backup", "create", "--name", name]).unwrap().assert_success();
    }

    project.run_ccsetup(&["backup", "delete", "a"]).unwrap().assert_success();
    assert_eq!(project.backups().len(), 4);

    // backup_keep = 3 in the test tool config
    project
        .run_ccsetup(&["backup", "cleanup"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Removed 1 backup(s)");
    assert_eq!(project.backups().len(), 3);

    project
        .run_ccsetup(&["backup", "cleanup", "--keep", "1"])
        .unwrap()
        .assert_success();
    assert_eq!(project.backups().len(), 1);
}

#[test]
fn test_backup_export_and_import() {
    let project = configured_project();
    project.run_ccsetup(&["backup", "create", "--name", "snap"]).unwrap().assert_success();

    let outside = project.sibling("exports").unwrap();
    let exported = outside.join("saved.zip");
    project
        .run_ccsetup(&["backup", "export", "snap", exported.to_str().unwrap()])
        .unwrap()
        .assert_success();
    FileAssert::exists(&exported);

    project
        .run_ccsetup(&["backup", "import", exported.to_str().unwrap(), "--name", "from-laptop"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("from-laptop");
    assert!(project.backups().contains(&"from-laptop.zip".to_string()));

    let bogus = outside.join("bogus.zip");
    std::fs::write(&bogus, "not a zip").unwrap();
    project
        .run_ccsetup(&["backup", "import", bogus.to_str().unwrap()])
        .unwrap()
        .assert_failure();
}
