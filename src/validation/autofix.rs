//! Automatic repair of common configuration problems.
//!
//! Rules are chosen by file name and run in a fixed order, each one seeing the output of
//! the previous rule. A file is written at most once per [`AutoFixer::fix_file`] call, and
//! only after its original content has been copied to
//! `<config>/.claude/autofix_backups/<name>.<YYYYmmdd_HHMMSS>.backup`.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::claude_md::has_section;
use super::{Finding, Severity};
use crate::config::ToolConfig;
use crate::utils::fs::{ensure_dir, write_text_file};

/// Lines longer than this are wrapped by the fixer.
const WRAP_WIDTH: usize = 100;

const BACKUP_DIR: &str = "autofix_backups";

const SECTION_PLACEHOLDER: &str = "_Describe this section._";

/// Message fragments that mark a finding as repairable even when the validator did not
/// flag it as such.
const FIXABLE_KEYWORDS: &[&str] = &[
    "trailing whitespace",
    "long line",
    "missing header",
    "malformed include",
    "json syntax",
    "invalid json",
    "missing field",
    "invalid path",
    "deprecated setting",
    "required section",
];

/// Category of a repair, used to group the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    Headers,
    Includes,
    LineLength,
    Whitespace,
    Sections,
    JsonSyntax,
    McpFields,
    ServerPaths,
    Permissions,
    Deprecated,
}

impl fmt::Display for FixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Headers => "headers",
            Self::Includes => "includes",
            Self::LineLength => "line_length",
            Self::Whitespace => "whitespace",
            Self::Sections => "sections",
            Self::JsonSyntax => "json_syntax",
            Self::McpFields => "mcp_fields",
            Self::ServerPaths => "server_paths",
            Self::Permissions => "permissions",
            Self::Deprecated => "deprecated",
        };
        f.write_str(s)
    }
}

/// Outcome of one rule applied to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FixResult {
    pub file_path: PathBuf,
    pub fix_type: FixType,
    pub description: String,
    pub success: bool,
    pub backup_path: Option<PathBuf>,
}

/// Aggregate over every fix attempted by one [`AutoFixer`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixSummary {
    pub total_fixes_attempted: usize,
    pub successful_fixes: usize,
    pub failed_fixes: usize,
    pub success_rate: f64,
    pub fixes_by_type: BTreeMap<String, usize>,
    pub backups_created: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    ClaudeMd,
    McpJson,
    Settings,
}

impl FileKind {
    fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        match name {
            "CLAUDE.md" => Some(Self::ClaudeMd),
            ".mcp.json" => Some(Self::McpJson),
            n if n.ends_with("settings.json") => Some(Self::Settings),
            _ => None,
        }
    }

    fn rules(self) -> &'static [(FixType, Rule)] {
        match self {
            Self::ClaudeMd => CLAUDE_MD_RULES,
            Self::McpJson => MCP_RULES,
            Self::Settings => SETTINGS_RULES,
        }
    }
}

/// New content plus a human description of what changed.
struct Fix {
    content: String,
    description: String,
}

/// `Ok(None)` means the rule had nothing to do.
type Rule = fn(&AutoFixer, &str) -> Result<Option<Fix>>;

const CLAUDE_MD_RULES: &[(FixType, Rule)] = &[
    (FixType::Headers, AutoFixer::fix_missing_title),
    (FixType::Includes, AutoFixer::fix_malformed_includes),
    (FixType::LineLength, AutoFixer::fix_long_lines),
    (FixType::Whitespace, AutoFixer::fix_trailing_whitespace),
    (FixType::Sections, AutoFixer::fix_missing_sections),
];

const MCP_RULES: &[(FixType, Rule)] = &[
    (FixType::JsonSyntax, AutoFixer::fix_json_syntax),
    (FixType::McpFields, AutoFixer::fix_missing_mcp_fields),
    (FixType::ServerPaths, AutoFixer::fix_server_paths),
];

const SETTINGS_RULES: &[(FixType, Rule)] = &[
    (FixType::JsonSyntax, AutoFixer::fix_json_syntax),
    (FixType::Permissions, AutoFixer::fix_permissions),
    (FixType::Deprecated, AutoFixer::fix_deprecated_settings),
];

/// Applies repair rules to the files of one configuration directory.
pub struct AutoFixer {
    config_dir: PathBuf,
    create_backups: bool,
    required_sections: Vec<String>,
    deprecated_keys: Vec<String>,
    results: Vec<FixResult>,
}

impl AutoFixer {
    pub fn new(config_dir: impl Into<PathBuf>, config: &ToolConfig) -> Self {
        Self {
            config_dir: config_dir.into(),
            create_backups: true,
            required_sections: config.required_sections.clone(),
            deprecated_keys: config.deprecated_settings_keys.clone(),
            results: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_backups(mut self, create_backups: bool) -> Self {
        self.create_backups = create_backups;
        self
    }

    /// Every result recorded so far.
    #[must_use]
    pub fn results(&self) -> &[FixResult] {
        &self.results
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config_dir.join(".claude").join(BACKUP_DIR)
    }

    /// Run every rule that applies to `path`.
    ///
    /// Returns no results for a missing file or a file no rule set covers. With
    /// `dry_run` the results describe what would change and nothing is written.
    pub fn fix_file(&mut self, path: &Path, dry_run: bool) -> Result<Vec<FixResult>> {
        let Some(kind) = FileKind::of(path) else {
            tracing::debug!("No fix rules for {}", path.display());
            return Ok(Vec::new());
        };
        if !path.is_file() {
            return Ok(Vec::new());
        }

        let original = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let mut current = original.clone();
        let mut results = Vec::new();

        for (fix_type, rule) in kind.rules() {
            match rule(self, &current) {
                Ok(Some(fix)) if fix.content != current => {
                    tracing::debug!("{}: {}", path.display(), fix.description);
                    results.push(FixResult {
                        file_path: path.to_path_buf(),
                        fix_type: *fix_type,
                        description: fix.description,
                        success: true,
                        backup_path: None,
                    });
                    current = fix.content;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Fix '{fix_type}' failed for {}: {e:#}", path.display());
                    results.push(FixResult {
                        file_path: path.to_path_buf(),
                        fix_type: *fix_type,
                        description: format!("Failed to apply fix: {e:#}"),
                        success: false,
                        backup_path: None,
                    });
                }
            }
        }

        if current != original && !dry_run {
            let backup = if self.create_backups {
                Some(self.create_backup(path, &original)?)
            } else {
                None
            };
            write_text_file(path, &current)?;
            for result in results.iter_mut().filter(|r| r.success) {
                result.backup_path.clone_from(&backup);
            }
        }

        self.results.extend(results.iter().cloned());
        Ok(results)
    }

    fn create_backup(&self, path: &Path, content: &str) -> Result<PathBuf> {
        let dir = self.backup_dir();
        ensure_dir(&dir)?;

        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup = dir.join(format!("{name}.{timestamp}.backup"));

        std::fs::write(&backup, content)
            .with_context(|| format!("Failed to write backup: {}", backup.display()))?;
        Ok(backup)
    }

    /// Findings worth handing to [`fix_file`](Self::fix_file): warnings and above that
    /// are flagged auto-fixable or whose message names a repairable problem.
    #[must_use]
    pub fn fixable_issues(findings: &[Finding]) -> Vec<&Finding> {
        findings
            .iter()
            .filter(|f| f.level >= Severity::Warning)
            .filter(|f| {
                let message = f.message.to_lowercase();
                f.auto_fixable || FIXABLE_KEYWORDS.iter().any(|k| message.contains(k))
            })
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> FixSummary {
        let total = self.results.len();
        let successful = self.results.iter().filter(|r| r.success).count();

        let mut fixes_by_type = BTreeMap::new();
        for result in self.results.iter().filter(|r| r.success) {
            *fixes_by_type.entry(result.fix_type.to_string()).or_insert(0) += 1;
        }

        let mut backups: Vec<&PathBuf> =
            self.results.iter().filter_map(|r| r.backup_path.as_ref()).collect();
        backups.sort();
        backups.dedup();

        FixSummary {
            total_fixes_attempted: total,
            successful_fixes: successful,
            failed_fixes: total - successful,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64 * 100.0
            },
            fixes_by_type,
            backups_created: backups.len(),
        }
    }

    // CLAUDE.md rules

    fn fix_missing_title(&self, content: &str) -> Result<Option<Fix>> {
        if content.lines().any(|line| line.starts_with("# ")) {
            return Ok(None);
        }
        Ok(Some(Fix {
            content: format!("# CLAUDE.md\n\n{content}"),
            description: "Added title header".to_string(),
        }))
    }

    fn fix_malformed_includes(&self, content: &str) -> Result<Option<Fix>> {
        let re = Regex::new(r"@include\s+([^\s#]+)(?:#(\S+))?")?;
        let mut fixed = Vec::new();

        let replaced = re.replace_all(content, |caps: &Captures<'_>| {
            let original = &caps[0];
            let mut file = caps[1].to_string();
            if !file.ends_with(".yml") && !file.ends_with(".yaml") && file.contains('/') {
                file.push_str(".yml");
            }

            let rebuilt = match caps.get(2) {
                Some(section) => format!("@include {file}#{}", section.as_str()),
                None => format!("@include {file}"),
            };
            if rebuilt != original {
                fixed.push(rebuilt.clone());
            }
            rebuilt
        });

        if fixed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Fix {
            content: replaced.into_owned(),
            description: format!("Fixed include references: {}", fixed.join(", ")),
        }))
    }

    fn fix_long_lines(&self, content: &str) -> Result<Option<Fix>> {
        let mut output = Vec::new();
        let mut in_fence = false;
        let mut wrapped = 0;

        for line in content.split('\n') {
            let trimmed = line.trim_start();
            if trimmed.starts_with("```") {
                in_fence = !in_fence;
                output.push(line.to_string());
                continue;
            }

            if in_fence || trimmed.starts_with('#') || line.chars().count() <= WRAP_WIDTH {
                output.push(line.to_string());
                continue;
            }

            if line.contains(" - ") {
                let mut parts = line.split(" - ");
                output.push(parts.next().unwrap_or_default().to_string());
                output.extend(parts.map(|part| format!("  - {part}")));
                wrapped += 1;
            } else if line.contains(", ") {
                output.extend(wrap_at_commas(line));
                wrapped += 1;
            } else {
                output.push(line.to_string());
            }
        }

        if wrapped == 0 {
            return Ok(None);
        }
        Ok(Some(Fix {
            content: output.join("\n"),
            description: format!("Wrapped {wrapped} long lines"),
        }))
    }

    fn fix_trailing_whitespace(&self, content: &str) -> Result<Option<Fix>> {
        let mut changed = 0;
        let lines: Vec<&str> = content
            .split('\n')
            .map(|line| {
                let stripped = line.trim_end();
                if stripped.len() != line.len() {
                    changed += 1;
                }
                stripped
            })
            .collect();

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(Fix {
            content: lines.join("\n"),
            description: format!("Removed trailing whitespace from {changed} lines"),
        }))
    }

    fn fix_missing_sections(&self, content: &str) -> Result<Option<Fix>> {
        let missing: Vec<&String> =
            self.required_sections.iter().filter(|s| !has_section(content, s)).collect();
        if missing.is_empty() {
            return Ok(None);
        }

        let mut fixed = content.trim_end_matches('\n').to_string();
        for section in &missing {
            fixed.push_str(&format!("\n\n## {section}\n\n{SECTION_PLACEHOLDER}"));
        }
        fixed.push('\n');

        let names: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        Ok(Some(Fix {
            content: fixed,
            description: format!("Added missing sections: {}", names.join(", ")),
        }))
    }

    // JSON rules

    fn fix_json_syntax(&self, content: &str) -> Result<Option<Fix>> {
        let (value, stripped) = parse_lenient(content)?;
        let description = if stripped {
            "Fixed JSON syntax: removed trailing commas"
        } else {
            "Reformatted JSON"
        };
        Ok(Some(Fix {
            content: to_pretty(&value)?,
            description: description.to_string(),
        }))
    }

    fn fix_missing_mcp_fields(&self, content: &str) -> Result<Option<Fix>> {
        let Ok(mut data) = serde_json::from_str::<Value>(content) else {
            return Ok(None);
        };
        let Some(root) = data.as_object_mut() else {
            return Ok(None);
        };

        let mut fixes = Vec::new();
        if !root.contains_key("mcpServers") {
            root.insert("mcpServers".to_string(), Value::Object(Map::new()));
            fixes.push("added mcpServers section".to_string());
        }

        if let Some(servers) = root.get_mut("mcpServers").and_then(Value::as_object_mut) {
            for (name, server) in servers.iter_mut() {
                let Some(server) = server.as_object_mut() else {
                    continue;
                };
                if !server.contains_key("command") {
                    server.insert("command".to_string(), Value::String("python".to_string()));
                    fixes.push(format!("added default command for {name}"));
                }
                if !server.contains_key("args") {
                    server.insert("args".to_string(), Value::Array(Vec::new()));
                    fixes.push(format!("added empty args for {name}"));
                }
            }
        }

        json_fix(&data, fixes, "Fixed MCP fields")
    }

    fn fix_server_paths(&self, content: &str) -> Result<Option<Fix>> {
        let Ok(mut data) = serde_json::from_str::<Value>(content) else {
            return Ok(None);
        };

        let mut fixes = Vec::new();
        if let Some(servers) = data.get_mut("mcpServers").and_then(Value::as_object_mut) {
            for (name, server) in servers.iter_mut() {
                let Some(args) = server.get_mut("args").and_then(Value::as_array_mut) else {
                    continue;
                };
                for arg in args.iter_mut() {
                    let Some(text) = arg.as_str() else {
                        continue;
                    };
                    if !text.ends_with(".py") || Path::new(text).is_absolute() {
                        continue;
                    }
                    let candidate = self.config_dir.join(text);
                    if candidate.exists() {
                        let absolute = candidate.canonicalize().with_context(|| {
                            format!("Failed to resolve path: {}", candidate.display())
                        })?;
                        *arg = Value::String(absolute.display().to_string());
                        fixes.push(format!("fixed path for {name}"));
                    }
                }
            }
        }

        json_fix(&data, fixes, "Fixed server paths")
    }

    fn fix_permissions(&self, content: &str) -> Result<Option<Fix>> {
        let Ok(mut data) = serde_json::from_str::<Value>(content) else {
            return Ok(None);
        };
        let Some(root) = data.as_object_mut() else {
            return Ok(None);
        };

        let mut fixes = Vec::new();
        let permissions = root
            .entry("permissions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !permissions.is_object() {
            return Ok(None);
        }
        if let Some(permissions) = permissions.as_object_mut() {
            for key in ["allow", "deny"] {
                match permissions.get(key) {
                    None => {
                        permissions.insert(key.to_string(), Value::Array(Vec::new()));
                        fixes.push(format!("added permissions.{key}"));
                    }
                    Some(Value::String(rule)) => {
                        let rule = rule.clone();
                        permissions.insert(key.to_string(), Value::Array(vec![Value::String(rule)]));
                        fixes.push(format!("wrapped permissions.{key} in an array"));
                    }
                    Some(_) => {}
                }
            }
        }

        json_fix(&data, fixes, "Fixed permissions")
    }

    fn fix_deprecated_settings(&self, content: &str) -> Result<Option<Fix>> {
        let Ok(mut data) = serde_json::from_str::<Value>(content) else {
            return Ok(None);
        };

        let fixes: Vec<String> = self
            .deprecated_keys
            .iter()
            .filter(|key| remove_dotted(&mut data, key))
            .map(|key| format!("removed {key}"))
            .collect();

        json_fix(&data, fixes, "Removed deprecated settings")
    }
}

/// Parse JSON, retrying once with trailing commas stripped.
fn parse_lenient(content: &str) -> Result<(Value, bool)> {
    match serde_json::from_str(content) {
        Ok(value) => Ok((value, false)),
        Err(first) => {
            let re = Regex::new(r",(\s*[}\]])")?;
            let stripped = re.replace_all(content, "$1");
            let value = serde_json::from_str(&stripped)
                .with_context(|| format!("JSON syntax could not be repaired: {first}"))?;
            Ok((value, true))
        }
    }
}

fn to_pretty(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn json_fix(data: &Value, fixes: Vec<String>, label: &str) -> Result<Option<Fix>> {
    if fixes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Fix {
        content: to_pretty(data)?,
        description: format!("{label}: {}", fixes.join(", ")),
    }))
}

/// Remove a dotted key, either as a literal top-level key or as a nested path.
fn remove_dotted(root: &mut Value, path: &str) -> bool {
    let Some(object) = root.as_object_mut() else {
        return false;
    };
    if object.remove(path).is_some() {
        return true;
    }

    let mut parts: Vec<&str> = path.split('.').collect();
    let Some(last) = parts.pop() else {
        return false;
    };
    let mut node = root;
    for part in parts {
        match node.get_mut(part) {
            Some(next) => node = next,
            None => return false,
        }
    }
    node.as_object_mut().is_some_and(|o| o.remove(last).is_some())
}

/// Greedy wrap at `, ` boundaries; continuation lines are indented by two spaces.
fn wrap_at_commas(line: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pieces = line.split(", ");
    let mut current = pieces.next().unwrap_or_default().to_string();

    for piece in pieces {
        if current.chars().count() + 2 + piece.chars().count() > WRAP_WIDTH {
            current.push(',');
            lines.push(std::mem::take(&mut current));
            current = format!("  {piece}");
        } else {
            current.push_str(", ");
            current.push_str(piece);
        }
    }
    lines.push(current);
    lines
}
