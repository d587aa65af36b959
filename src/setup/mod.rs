//! Non-interactive project scaffolding.
//!
//! [`ProjectSetup`] writes a skeleton CLAUDE.md, `.claude/settings.json` and `.mcp.json`
//! for the chosen framework, stamps the project with the latest template version, and
//! in team mode adds the local-settings example and `.gitignore` entries. Existing
//! files are left alone unless `force` is set.

pub mod catalog;

pub use catalog::{Database, Environment, Framework, Mode};

use anyhow::Result;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

use crate::config::ToolConfig;
use crate::migration::upgrade::latest_version;
use crate::migration::version::VersionManager;
use crate::utils::fs::{ensure_dir, read_text_file, write_text_file};

const SECTION_PLACEHOLDER: &str = "_Describe this section._";

const LOCAL_TEMPLATE_HEADER: &str = "// Personal overrides for this project - NOT committed to Git
// Copy this file to settings.local.json and customize for your needs
// Add personal API keys, local paths, and individual preferences here

";

const GITIGNORE_MARKER: &str = ".claude/settings.local.json";

const GITIGNORE_ADDITIONS: &[&str] = &[
    "",
    "# Claude Code local settings (personal, not committed)",
    GITIGNORE_MARKER,
    "",
    "# Environment variables with secrets",
    ".env",
    ".env.local",
    ".env.*.local",
];

const GITIGNORE_BASE: &[&str] = &[
    "# Byte-compiled / optimized / DLL files",
    "__pycache__/",
    "*.py[cod]",
    "*$py.class",
    "",
    "# Virtual environments",
    "venv/",
    ".venv/",
    "env/",
    ".env/",
    "",
    "# IDE",
    ".vscode/",
    ".idea/",
    "*.swp",
    "*.swo",
    "",
    "# OS",
    ".DS_Store",
    "Thumbs.db",
];

/// Choices for one scaffolding run.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub framework: Framework,
    pub mode: Mode,
    /// Defaults to the output directory's name.
    pub project_name: Option<String>,
    /// Defaults to [`Framework::default_database`].
    pub database: Option<Database>,
    pub environment: Environment,
    /// Defaults to [`Framework::recommended_servers`].
    pub mcp_servers: Option<Vec<String>>,
    pub output_dir: PathBuf,
    pub create_local_template: bool,
    pub force: bool,
}

impl SetupOptions {
    pub fn new(framework: Framework, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            framework,
            mode: Mode::default(),
            project_name: None,
            database: None,
            environment: Environment::default(),
            mcp_servers: None,
            output_dir: output_dir.into(),
            create_local_template: false,
            force: false,
        }
    }

    #[must_use]
    pub fn project_name(&self) -> String {
        self.project_name.clone().unwrap_or_else(|| {
            self.output_dir
                .canonicalize()
                .ok()
                .as_deref()
                .unwrap_or(&self.output_dir)
                .file_name()
                .map_or_else(|| "my-project".to_string(), |n| n.to_string_lossy().into_owned())
        })
    }

    #[must_use]
    pub fn database(&self) -> Database {
        self.database.unwrap_or_else(|| self.framework.default_database())
    }
}

/// What a run wrote.
#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub created: Vec<PathBuf>,
    /// Files that already existed and were kept because `force` was not set.
    pub skipped: Vec<PathBuf>,
    pub servers: Vec<String>,
    /// Requested servers the catalogue does not know; they are left out of `.mcp.json`.
    pub unknown_servers: Vec<String>,
    pub gitignore_updated: bool,
}

pub struct ProjectSetup<'a> {
    options: SetupOptions,
    config: &'a ToolConfig,
}

impl<'a> ProjectSetup<'a> {
    pub const fn new(options: SetupOptions, config: &'a ToolConfig) -> Self {
        Self { options, config }
    }

    #[must_use]
    pub const fn options(&self) -> &SetupOptions {
        &self.options
    }

    pub fn run(&self) -> Result<SetupReport> {
        let dir = &self.options.output_dir;
        ensure_dir(dir)?;
        let mut report = SetupReport::default();

        let (servers, unknown) = self.selected_servers();
        report.servers.clone_from(&servers);
        report.unknown_servers = unknown;
        for name in &report.unknown_servers {
            tracing::warn!("Skipping unknown MCP server '{name}'");
        }

        self.write(&mut report, &dir.join("CLAUDE.md"), &self.claude_md())?;
        self.write(&mut report, &dir.join(".claude").join("settings.json"), &pretty(&self.settings())?)?;
        self.write(&mut report, &dir.join(".mcp.json"), &pretty(&self.mcp_config(&servers))?)?;

        if self.options.mode == Mode::Team {
            if self.options.create_local_template {
                let content = format!("{LOCAL_TEMPLATE_HEADER}{}", pretty(&self.local_settings())?);
                self.write(&mut report, &dir.join(".claude").join("settings.local.json.example"), &content)?;
            }
            report.gitignore_updated = update_gitignore(dir)?;
        }

        self.stamp_version(&mut report)?;
        tracing::info!(
            "Set up {} project in {} ({} files written)",
            self.options.framework,
            dir.display(),
            report.created.len()
        );
        Ok(report)
    }

    /// Requested (or recommended) servers, with the database server added when missing.
    fn selected_servers(&self) -> (Vec<String>, Vec<String>) {
        let requested: Vec<String> = self.options.mcp_servers.clone().unwrap_or_else(|| {
            self.options.framework.recommended_servers().iter().map(|s| (*s).to_string()).collect()
        });

        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for name in requested {
            let name = name.trim().to_string();
            if name.is_empty() || known.contains(&name) || unknown.contains(&name) {
                continue;
            }
            if catalog::server_config(&name).is_some() {
                known.push(name);
            } else {
                unknown.push(name);
            }
        }

        if let Some(db) = self.options.database().server()
            && !known.iter().any(|s| s == db)
        {
            known.insert(0, db.to_string());
        }
        (known, unknown)
    }

    fn write(&self, report: &mut SetupReport, path: &Path, content: &str) -> Result<()> {
        if path.exists() && !self.options.force {
            tracing::debug!("Keeping existing {}", path.display());
            report.skipped.push(path.to_path_buf());
            return Ok(());
        }
        write_text_file(path, content)?;
        report.created.push(path.to_path_buf());
        Ok(())
    }

    fn claude_md(&self) -> String {
        let framework = self.options.framework;
        let mut out = format!(
            "# {}\n\n{} project. Tech stack: {}.\n",
            self.options.project_name(),
            framework.display_name(),
            framework.tech_stack().join(", ")
        );
        for section in &self.config.required_sections {
            out.push_str(&format!("\n## {section}\n\n{SECTION_PLACEHOLDER}\n"));
        }
        out
    }

    fn settings(&self) -> Value {
        let (allow, deny) = catalog::default_permissions(self.options.framework);
        let mut env = Map::new();
        env.insert("DEBUG".to_string(), json!(self.options.environment.debug_flag()));
        if self.options.framework == Framework::Django {
            env.insert("DJANGO_DEBUG".to_string(), json!(self.options.environment.debug_flag()));
        }
        json!({
            "permissions": { "allow": allow, "deny": deny },
            "env": env,
        })
    }

    fn mcp_config(&self, servers: &[String]) -> Value {
        let project = self.options.project_name();
        let database = self.options.database();
        let mut entries = Map::new();
        for name in servers {
            let config = if database.server() == Some(name.as_str()) {
                catalog::database_server_config(database, &project)
            } else {
                catalog::server_config(name)
            };
            if let Some(config) = config {
                entries.insert(name.clone(), config);
            }
        }
        json!({ "mcpServers": entries })
    }

    fn local_settings(&self) -> Value {
        let mut env = Map::new();
        for (key, value) in [
            ("DEBUG_MODE", "true"),
            ("PERSONAL_API_KEY", "your-api-key-here"),
            ("LOCAL_DATA_PATH", "/path/to/your/local/data"),
        ] {
            env.insert(key.to_string(), json!(value));
        }
        let extra: &[(&str, &str)] = match self.options.framework {
            Framework::Fastapi => &[("API_PORT", "8001"), ("DATABASE_URL", "postgresql://localhost/personal_dev")],
            Framework::Django => &[("DJANGO_DEBUG", "True"), ("DJANGO_SECRET_KEY", "your-local-secret-key")],
            Framework::DataScience => &[("JUPYTER_PORT", "8889"), ("DATA_DIR", "/path/to/your/datasets")],
            _ => &[],
        };
        for (key, value) in extra {
            env.insert((*key).to_string(), json!(value));
        }
        json!({
            "permissions": { "allow": ["Bash(custom-personal-commands*)"], "deny": [] },
            "env": env,
        })
    }

    /// Write `.version` and `.metadata.json` for the latest template version.
    ///
    /// Each file is kept independently when it exists and `force` is not set. Fresh
    /// metadata records the version in `.version`, kept or new.
    fn stamp_version(&self, report: &mut SetupReport) -> Result<()> {
        let versions = VersionManager::new(&self.options.output_dir);
        let keep = |path: &Path| path.exists() && !self.options.force;

        let version = if keep(&versions.version_file()) {
            report.skipped.push(versions.version_file());
            versions.detect_current_version().unwrap_or_else(latest_version)
        } else {
            let latest = latest_version();
            versions.save_version(&latest)?;
            report.created.push(versions.version_file());
            latest
        };

        if keep(&versions.metadata_file()) {
            report.skipped.push(versions.metadata_file());
            return Ok(());
        }
        let metadata = versions.create_metadata(
            version,
            self.options.framework.id(),
            None,
            Some(format!("{} project ({:?} mode)", self.options.framework.display_name(), self.options.mode)),
        )?;
        versions.save_metadata(&metadata)?;
        report.created.push(versions.metadata_file());
        Ok(())
    }
}

fn pretty(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Add the local-settings ignore block unless it is already present. Returns whether
/// the file changed.
pub fn update_gitignore(dir: &Path) -> Result<bool> {
    let path = dir.join(".gitignore");
    let content = if path.exists() {
        let existing = read_text_file(&path)?;
        if existing.contains(GITIGNORE_MARKER) {
            return Ok(false);
        }
        format!("{existing}\n{}\n", GITIGNORE_ADDITIONS.join("\n"))
    } else {
        let mut lines = GITIGNORE_BASE.to_vec();
        lines.extend_from_slice(GITIGNORE_ADDITIONS);
        format!("{}\n", lines.join("\n"))
    };
    write_text_file(&path, &content)?;
    Ok(true)
}
