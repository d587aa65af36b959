//! Template directory checks.
//!
//! A template is a directory holding `CLAUDE.md`, `settings.json` and optionally a
//! `commands/` library grouped by category. Besides the layout, the validator guesses
//! which framework the template targets and checks it against that framework's
//! recommended MCP servers and CLAUDE.md vocabulary.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::{Finding, FindingCounts, Validator};

const REQUIRED_FILES: &[(&str, &str)] =
    &[("CLAUDE.md", "Main configuration file"), ("settings.json", "Claude Code settings")];

const COMMAND_CATEGORIES: &[&str] =
    &["development", "documentation", "planning", "quality", "utility", "workflow"];

const LOOSE_CODE_EXTENSIONS: &[&str] = &["py", "js", "ts"];

/// Command files shorter than this (trimmed) are reported as minimal.
const MIN_COMMAND_LENGTH: usize = 50;

/// READMEs smaller than this many bytes are reported as minimal.
const MIN_README_BYTES: u64 = 100;

/// The framework a template appears to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    Fastapi,
    Django,
    Flask,
    DataScience,
    CliTool,
    WebScraping,
    WebFramework,
    General,
    Core,
    Unknown,
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fastapi => "fastapi",
            Self::Django => "django",
            Self::Flask => "flask",
            Self::DataScience => "data-science",
            Self::CliTool => "cli-tool",
            Self::WebScraping => "web-scraping",
            Self::WebFramework => "web-framework",
            Self::General => "general",
            Self::Core => "core",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

impl TemplateType {
    /// Recommended MCP servers, CLAUDE.md keywords and a label for messages.
    const fn expectations(self) -> Option<(&'static [&'static str], &'static [&'static str], &'static str)> {
        match self {
            Self::Fastapi => Some((&["filesystem", "sqlite"], &["FastAPI", "async", "API"], "FastAPI")),
            Self::Django => Some((&["filesystem", "sqlite"], &["Django", "models", "views"], "Django")),
            Self::Flask => Some((&["filesystem"], &["Flask", "routes", "templates"], "Flask")),
            Self::DataScience => Some((
                &["filesystem", "sqlite", "memory"],
                &["data", "analysis", "jupyter", "pandas"],
                "data science",
            )),
            Self::CliTool => Some((&["filesystem"], &["CLI", "command", "argparse", "click"], "CLI tool")),
            Self::WebScraping => Some((
                &["filesystem", "memory"],
                &["scraping", "requests", "beautifulsoup", "selenium"],
                "web scraping",
            )),
            Self::WebFramework | Self::General | Self::Core | Self::Unknown => None,
        }
    }
}

/// Validates the structure of one template directory.
pub struct TemplateValidator {
    root: PathBuf,
    template_type: TemplateType,
    last_counts: FindingCounts,
}

impl TemplateValidator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let template_type = detect_template_type(&root);
        Self {
            root,
            template_type,
            last_counts: FindingCounts::default(),
        }
    }

    #[must_use]
    pub const fn template_type(&self) -> TemplateType {
        self.template_type
    }

    /// `max(0, 100 - 20 * errors - 5 * warnings)` over the last run; 100 when the last
    /// run found nothing.
    #[must_use]
    pub fn compatibility_score(&self) -> f64 {
        let counts = self.last_counts;
        if counts.total() == 0 {
            return 100.0;
        }
        let penalty = counts.errors as f64 * 20.0 + counts.warnings as f64 * 5.0;
        (100.0 - penalty).max(0.0)
    }

    fn settings(&self) -> Option<Value> {
        read_json(&self.root.join("settings.json"))
    }

    fn check_required_files(&self, findings: &mut Vec<Finding>) {
        for (name, description) in REQUIRED_FILES {
            let path = self.root.join(name);
            if !path.exists() {
                findings.push(
                    Finding::error(format!("Required file missing: {name} ({description})"))
                        .with_file(&path)
                        .fixable()
                        .with_suggestion(format!("Create {name} file")),
                );
            } else if path.metadata().is_ok_and(|m| m.is_file() && m.len() == 0) {
                findings.push(
                    Finding::warning(format!("Required file is empty: {name}"))
                        .with_file(&path)
                        .with_suggestion(format!("Add content to {name}")),
                );
            }
        }
    }

    fn check_layout(&self, findings: &mut Vec<Finding>) {
        let commands = self.root.join("commands");
        if commands.is_dir() {
            check_commands(&commands, findings);
        } else {
            findings.push(
                Finding::info("Commands directory not found")
                    .with_suggestion("Consider adding a commands/ directory with workflow templates"),
            );
        }

        let mut loose: Vec<String> = list_dir(&self.root)
            .into_iter()
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| LOOSE_CODE_EXTENSIONS.contains(&e))
            })
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .filter(|name| name != "setup.py")
            .collect();
        loose.sort();

        if !loose.is_empty() {
            findings.push(
                Finding::warning(format!("Found loose code files in root: {}", loose.join(", ")))
                    .with_suggestion("Consider organizing code files in appropriate subdirectories"),
            );
        }
    }

    fn check_framework(&self, findings: &mut Vec<Finding>) {
        let Some((servers, keywords, label)) = self.template_type.expectations() else {
            return;
        };

        let settings_path = self.root.join("settings.json");
        if let Some(settings) = self.settings() {
            let existing: BTreeSet<&str> = settings
                .get("mcpServers")
                .and_then(Value::as_object)
                .map(|m| m.keys().map(String::as_str).collect())
                .unwrap_or_default();
            let missing: Vec<&str> =
                servers.iter().copied().filter(|s| !existing.contains(s)).collect();
            if !missing.is_empty() {
                findings.push(
                    Finding::warning(format!(
                        "Missing recommended MCP servers for {label}: {}",
                        missing.join(", ")
                    ))
                    .with_file(&settings_path)
                    .with_suggestion(format!(
                        "Add {} MCP servers for better {label} support",
                        missing.join(", ")
                    )),
                );
            }
        }

        let claude_path = self.root.join("CLAUDE.md");
        if let Ok(content) = std::fs::read_to_string(&claude_path) {
            let lower = content.to_lowercase();
            let missing: Vec<&str> = keywords
                .iter()
                .copied()
                .filter(|k| !lower.contains(&k.to_lowercase()))
                .collect();
            if !missing.is_empty() {
                findings.push(
                    Finding::info(format!(
                        "CLAUDE.md might benefit from {label}-specific content: {}",
                        missing.join(", ")
                    ))
                    .with_file(&claude_path)
                    .with_suggestion(format!(
                        "Consider adding {label}-specific instructions and examples"
                    )),
                );
            }
        }
    }

    fn check_common(&self, findings: &mut Vec<Finding>) {
        let claude_has_version = std::fs::read_to_string(self.root.join("CLAUDE.md"))
            .is_ok_and(|c| c.to_lowercase().contains("version") || c.contains("v2.") || c.contains("v1."));
        let settings_has_version = self.settings().is_some_and(|s| s.get("version").is_some());
        if !claude_has_version && !settings_has_version {
            findings.push(
                Finding::info("No version information found in configuration")
                    .with_suggestion("Consider adding version information for better tracking"),
            );
        }

        let readme = self.root.join("README.md");
        match readme.metadata() {
            Err(_) => findings.push(
                Finding::info("No README.md found")
                    .with_suggestion("Consider adding a README.md with setup and usage instructions"),
            ),
            Ok(meta) if meta.len() < MIN_README_BYTES => findings.push(
                Finding::info("README.md seems minimal")
                    .with_file(&readme)
                    .with_suggestion("Consider expanding README.md with more detailed information"),
            ),
            Ok(_) => {}
        }

        if !self.root.join(".gitignore").exists() {
            findings.push(Finding::info("No .gitignore file found").with_suggestion(
                "Consider adding .gitignore to exclude unnecessary files from version control",
            ));
        }
    }
}

fn check_commands(commands: &Path, findings: &mut Vec<Finding>) {
    let categories: Vec<PathBuf> = list_dir(commands).into_iter().filter(|p| p.is_dir()).collect();
    let existing: BTreeSet<String> = categories
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let missing: Vec<&str> =
        COMMAND_CATEGORIES.iter().copied().filter(|c| !existing.contains(*c)).collect();
    if !missing.is_empty() {
        findings.push(
            Finding::info(format!("Missing command categories: {}", missing.join(", ")))
                .with_suggestion("Consider adding these common command categories"),
        );
    }

    for category in categories {
        let name = category.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let md_files: Vec<PathBuf> = list_dir(&category)
            .into_iter()
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "md"))
            .collect();

        if md_files.is_empty() {
            findings.push(
                Finding::warning(format!("Empty command category: {name}"))
                    .with_file(&category)
                    .with_suggestion(format!("Add command templates to {name}/ directory")),
            );
        }

        for file in md_files {
            check_command_file(&file, findings);
        }
    }
}

fn check_command_file(file: &Path, findings: &mut Vec<Finding>) {
    let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(_) => {
            findings.push(
                Finding::error(format!("Could not read command file: {name}")).with_file(file),
            );
            return;
        }
    };

    let trimmed = content.trim();
    if !trimmed.starts_with('#') {
        findings.push(
            Finding::warning(format!("Command file should start with markdown header: {name}"))
                .with_file(file)
                .with_suggestion("Add # Title at the beginning of the command file"),
        );
    }
    if trimmed.chars().count() < MIN_COMMAND_LENGTH {
        findings.push(
            Finding::info(format!("Command file seems minimal: {name}"))
                .with_file(file)
                .with_suggestion("Consider adding more detailed command documentation"),
        );
    }
}

/// Guess the framework from settings.json servers, then from CLAUDE.md keywords.
#[must_use]
pub fn detect_template_type(root: &Path) -> TemplateType {
    if let Some(settings) = read_json(&root.join("settings.json")) {
        let servers = settings.get("mcpServers").and_then(Value::as_object);
        let has = |name: &str| servers.is_some_and(|m| m.contains_key(name));
        return if has("filesystem") && has("sqlite") {
            TemplateType::DataScience
        } else if has("filesystem") {
            TemplateType::WebFramework
        } else {
            TemplateType::General
        };
    }

    if let Ok(content) = std::fs::read_to_string(root.join("CLAUDE.md")) {
        let content = content.to_lowercase();
        return if content.contains("fastapi") {
            TemplateType::Fastapi
        } else if content.contains("django") {
            TemplateType::Django
        } else if content.contains("flask") {
            TemplateType::Flask
        } else if content.contains("data science") || content.contains("jupyter") {
            TemplateType::DataScience
        } else if content.contains("cli") || content.contains("command line") {
            TemplateType::CliTool
        } else if content.contains("scraping") {
            TemplateType::WebScraping
        } else {
            TemplateType::Core
        };
    }

    TemplateType::Unknown
}

fn read_json(path: &Path) -> Option<Value> {
    std::fs::read_to_string(path).ok().and_then(|s| serde_json::from_str(&s).ok())
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(std::result::Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

impl Validator for TemplateValidator {
    fn name(&self) -> &'static str {
        "template"
    }

    fn validate(&mut self) -> Vec<Finding> {
        self.template_type = detect_template_type(&self.root);
        let mut findings = Vec::new();

        self.check_required_files(&mut findings);
        self.check_layout(&mut findings);
        self.check_framework(&mut findings);
        self.check_common(&mut findings);

        self.last_counts = FindingCounts::from_findings(&findings);
        findings
    }
}
