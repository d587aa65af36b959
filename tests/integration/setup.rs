use predicates::prelude::*;
use serde_json::Value;

use crate::common::{FileAssert, TestProject};

fn read_json(project: &TestProject, relative: &str) -> Value {
    serde_json::from_str(&project.read(relative).unwrap()).unwrap()
}

#[test]
fn test_setup_fastapi_solo() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&["setup", "--framework", "fastapi", "--project-name", "orders"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Setting up orders (FastAPI)")
        .assert_stdout_contains("Wrote CLAUDE.md")
        .assert_stdout_contains("Health score:");

    let claude_md = project.read("CLAUDE.md").unwrap();
    assert!(claude_md.starts_with("# orders\n"));
    assert!(claude_md.contains("## Critical Rules"));

    let mcp = read_json(&project, ".mcp.json");
    let servers = mcp["mcpServers"].as_object().unwrap();
    assert!(servers.contains_key("postgresql"));
    assert_eq!(servers["postgresql"]["args"][2], "postgresql://localhost/orders");

    let settings = read_json(&project, ".claude/settings.json");
    assert!(settings["permissions"]["allow"].as_array().unwrap().iter().any(|p| p == "Bash(uvicorn:*)"));
    assert_eq!(settings["env"]["DEBUG"], "True");

    assert_eq!(project.read(".version").unwrap().trim(), "2.0.1");
    let metadata = read_json(&project, ".metadata.json");
    assert_eq!(metadata["template_type"], "fastapi");

    FileAssert::not_exists(project.project_path().join(".gitignore"));

    // the generated configuration passes validation
    project.run_ccsetup(&["validate", "--no-probe"]).unwrap().assert_success();
}

#[test]
fn test_setup_team_mode() {
    let project = TestProject::new().unwrap();
    project
        .run_ccsetup(&[
            "setup",
            "--framework",
            "django",
            "--mode",
            "team",
            "--environment",
            "production",
            "--create-local-template",
        ])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Updated .gitignore");

    FileAssert::contains(project.project_path().join(".gitignore"), ".claude/settings.local.json");
    FileAssert::contains(
        project.project_path().join(".claude/settings.local.json.example"),
        "// Personal overrides",
    );
    let settings = read_json(&project, ".claude/settings.json");
    assert_eq!(settings["env"]["DJANGO_DEBUG"], "False");
}

#[test]
fn test_setup_explicit_servers() {
    let project = TestProject::new().unwrap();
    let output_dir = project.sibling("scraper").unwrap();
    project
        .run_ccsetup(&[
            "setup",
            "--framework",
            "web-scraping",
            "--database",
            "sqlite",
            "--mcp-servers",
            "puppeteer,bogus",
            "--output-dir",
            output_dir.to_str().unwrap(),
        ])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Unknown MCP server 'bogus' was skipped");

    let mcp: Value =
        serde_json::from_str(&std::fs::read_to_string(output_dir.join(".mcp.json")).unwrap()).unwrap();
    let names: Vec<&String> = mcp["mcpServers"].as_object().unwrap().keys().collect();
    assert_eq!(names.len(), 2);
    assert!(mcp["mcpServers"]["sqlite"].is_object());
    assert!(mcp["mcpServers"]["puppeteer"]["env"].is_object());
}

#[test]
fn test_setup_keeps_existing_files_without_force() {
    let project = TestProject::new().unwrap();
    project.write("CLAUDE.md", "# Mine\n").unwrap();

    project
        .run_ccsetup(&["setup"])
        .unwrap()
        .assert_success()
        .assert_stdout_contains("Kept existing CLAUDE.md");
    assert_eq!(project.read("CLAUDE.md").unwrap(), "# Mine\n");

    project.run_ccsetup(&["setup", "--force"]).unwrap().assert_success();
    assert_ne!(project.read("CLAUDE.md").unwrap(), "# Mine\n");
}

#[test]
fn test_setup_unknown_framework() {
    let project = TestProject::new().unwrap();
    project
        .command()
        .args(["setup", "--framework", "rails"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rails"));
}
