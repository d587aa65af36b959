//! Sample configuration file contents.
//!
//! The "complete" fixtures pass every validator with the default tool configuration
//! (the MCP server runs `sh`, which is on `PATH` on the platforms the tests run on).

/// CLAUDE.md with every default required section and no long lines.
pub const COMPLETE_CLAUDE_MD: &str = "\
# Example Project

Configuration for Claude Code.

## Project Overview

A small service used in tests.

## Development Workflow

Run the test suite before every commit.

## Critical Rules

Never commit secrets.

## Claude-Specific Instructions

Prefer small, focused changes.
";

/// CLAUDE.md missing two of the default required sections.
pub const PARTIAL_CLAUDE_MD: &str = "\
# Example Project

## Project Overview

A small service used in tests.

## Development Workflow

Run the test suite before every commit.
";

/// CLAUDE.md with a broken @include, a missing YAML reference and a long line.
pub fn broken_claude_md() -> String {
    format!(
        "# Broken Project\n\n## Project Overview\n\n@include shared/missing.yml#Rules\n@include\n\n{}\n",
        "x".repeat(240)
    )
}

/// settings.json with a permissions block.
pub const SETTINGS_JSON: &str = r#"{
  "permissions": {
    "allow": ["Read", "Edit", "Bash(git:*)"],
    "deny": ["Bash(rm -rf:*)"]
  }
}
"#;

/// settings.json carrying deprecated keys and no permissions.
pub const LEGACY_SETTINGS_JSON: &str = r#"{
  "claude": {
    "legacy": { "mode": true }
  },
  "theme": "dark"
}
"#;

/// `.mcp.json` with one server that is on `PATH`.
pub const MCP_JSON: &str = r#"{
  "mcpServers": {
    "shell": {
      "command": "sh",
      "args": ["-c", "exit 0"]
    }
  }
}
"#;

/// `.mcp.json` whose server lacks a command.
pub const INVALID_MCP_JSON: &str = r#"{
  "mcpServers": {
    "broken": {
      "args": ["--port", "3000"]
    }
  }
}
"#;

/// YAML file referenced from CLAUDE.md as `shared/rules.yml#Core_Rules`.
pub const RULES_YAML: &str = "\
Core_Rules:
  - Keep functions small
  - Write tests first
";
