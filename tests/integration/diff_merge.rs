use predicates::prelude::*;
use serde_json::Value;

use crate::common::{FileAssert, TestProject};

fn diff_dirs(project: &TestProject) -> (String, String) {
    project.write("old/CLAUDE.md", "# App\n\n## Rules\n\n- be careful\n").unwrap();
    project.write("old/settings.json", r#"{"theme": "dark", "model": "sonnet"}"#).unwrap();
    project.write("new/CLAUDE.md", "# App\n\n## Rules\n\n- be careful\n- write tests\n").unwrap();
    project
        .write("new/settings.json", r#"{"theme": "light", "model": "sonnet", "description": "shared"}"#)
        .unwrap();
    project.write("new/commands/review.md", "Review the diff.\n").unwrap();

    let root = project.project_path();
    (
        root.join("old").to_string_lossy().into_owned(),
        root.join("new").to_string_lossy().into_owned(),
    )
}

#[test]
fn test_diff_text_output() {
    let project = TestProject::new().unwrap();
    let (old, new) = diff_dirs(&project);

    project
        .run_ccsetup(&["diff", &old, &new])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Modified 'theme' in settings.json")
        .assert_stdout_contains("Added 'description' in settings.json")
        .assert_stdout_contains("File added: commands/review.md")
        .assert_stdout_contains("medium impact")
        .assert_stdout_contains("in CLAUDE.md")
        .assert_stdout_contains("auto-mergeable");
}

#[test]
fn test_diff_json_output() {
    let project = TestProject::new().unwrap();
    let (old, new) = diff_dirs(&project);

    let output = project.run_ccsetup(&["diff", &old, &new, "--format", "json"]).unwrap();
    output.assert_success();
    let json = output.json();
    let changes = json["changes"].as_array().unwrap();
    assert_eq!(json["summary"]["total_changes"], changes.len());
    assert!(changes.len() >= 4);
    assert!(changes.iter().any(|c| c["file_path"] == "commands/review.md"));
}

#[test]
fn test_diff_identical_and_missing_dirs() {
    let project = TestProject::new().unwrap();
    project.write("a/CLAUDE.md", "# Same\n").unwrap();
    project.write("b/CLAUDE.md", "# Same\n").unwrap();
    let root = project.project_path();

    project
        .run_ccsetup(&["diff", root.join("a").to_str().unwrap(), root.join("b").to_str().unwrap()])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No changes");

    project
        .command()
        .args(["diff", root.join("a").to_str().unwrap(), root.join("gone").to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration directory not found"));
}

#[test]
fn test_merge_json_apply() {
    let project = TestProject::new().unwrap();
    project.write("local.json", r#"{"theme": "dark", "model": "sonnet"}"#).unwrap();
    project
        .write("remote.json", r#"{"theme": "dark", "model": "sonnet", "description": "from template"}"#)
        .unwrap();
    let local = project.project_path().join("local.json");
    let remote = project.project_path().join("remote.json");

    project
        .run_ccsetup(&["merge", local.to_str().unwrap(), remote.to_str().unwrap()])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Key 'description' exists only in remote version")
        .assert_stdout_contains("1 of 1 resolution(s) can be applied with --apply");
    assert!(!project.read("local.json").unwrap().contains("description"));

    project
        .run_ccsetup(&["merge", local.to_str().unwrap(), remote.to_str().unwrap(), "--apply"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("1 of 1 resolution(s) applied");

    let merged: Value = serde_json::from_str(&project.read("local.json").unwrap()).unwrap();
    assert_eq!(merged["description"], "from template");
    assert_eq!(merged["theme"], "dark");
    FileAssert::exists(project.project_path().join("local.json.conflict_backup"));

    // nothing left to resolve
    project
        .run_ccsetup(&["merge", local.to_str().unwrap(), remote.to_str().unwrap()])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("No conflicts");
}

#[test]
fn test_merge_markdown_preview_with_strategy() {
    let project = TestProject::new().unwrap();
    project.write("local.md", "# App\n\n## Rules\n\n- keep it simple\n").unwrap();
    project
        .write("remote.md", "# App\n\n## Rules\n\n- prefer composition over inheritance in new modules\n")
        .unwrap();
    let local = project.project_path().join("local.md");
    let remote = project.project_path().join("remote.md");

    project
        .run_ccsetup(&[
            "merge",
            local.to_str().unwrap(),
            remote.to_str().unwrap(),
            "--strategy",
            "section_append",
        ])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Section '## Rules' differs between versions")
        .assert_stdout_contains("section_append");
    assert_eq!(project.read("local.md").unwrap(), "# App\n\n## Rules\n\n- keep it simple\n");
}

#[test]
fn test_merge_rejects_bad_input() {
    let project = TestProject::new().unwrap();
    project.write("local.json", "{}").unwrap();
    let local = project.project_path().join("local.json");
    let missing = project.project_path().join("missing.json");

    project
        .command()
        .args(["merge", local.to_str().unwrap(), missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));

    project
        .command()
        .args(["merge", local.to_str().unwrap(), local.to_str().unwrap(), "--strategy", "coin_flip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("coin_flip"));
}
