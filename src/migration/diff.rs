//! Change detection between two configuration directories.
//!
//! JSON files are compared key by key on dotted paths; Markdown and YAML files are
//! compared line by line. Every change is rated for impact and for whether it can be
//! merged without review.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ChangeType, ConfigChange, ImpactLevel};
use crate::utils::fs::relative_slash_path;

/// Sections whose changes are always critical and never auto-merged.
const CRITICAL_SECTIONS: &[&str] = &["Core Configuration", "MCP Integration", "Security Standards", "mcpServers"];

const HIGH_IMPACT_KEYWORDS: &[&str] = &["security", "auth", "credentials", "secret", "key"];
const MEDIUM_IMPACT_KEYWORDS: &[&str] = &["config", "setting", "server", "database"];
const SAFE_TEXT_INDICATORS: &[&str] = &["#", "//", "<!--", "description", "example", "note"];

const HIGH_IMPACT_PATHS: &[&str] = &["version", "environment", "security"];
const MEDIUM_IMPACT_PATHS: &[&str] = &["settings", "config", "options"];
const SAFE_JSON_ADDITIONS: &[&str] = &["description", "author", "tags", "metadata"];

/// One step of a line diff. Indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Equal { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

/// Longest-common-subsequence line diff.
///
/// A shared prefix and suffix are matched up front so the quadratic table only covers
/// the region that actually differs.
#[must_use]
pub fn line_diff(old: &[&str], new: &[&str]) -> Vec<DiffOp> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let width = b.len() + 1;
    let mut lcs = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops: Vec<DiffOp> = (0..prefix).map(|k| DiffOp::Equal { old: k, new: k }).collect();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            ops.push(DiffOp::Equal { old: prefix + i, new: prefix + j });
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(DiffOp::Delete { old: prefix + i });
            i += 1;
        } else {
            ops.push(DiffOp::Insert { new: prefix + j });
            j += 1;
        }
    }
    ops.extend((i..a.len()).map(|k| DiffOp::Delete { old: prefix + k }));
    ops.extend((j..b.len()).map(|k| DiffOp::Insert { new: prefix + k }));

    let old_tail = old.len() - suffix;
    let new_tail = new.len() - suffix;
    ops.extend((0..suffix).map(|k| DiffOp::Equal { old: old_tail + k, new: new_tail + k }));
    ops
}

/// Counts over a set of changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub total_changes: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_impact: BTreeMap<String, usize>,
    pub auto_mergeable: usize,
    pub requires_review: usize,
}

/// Compares configuration trees.
#[derive(Debug, Default)]
pub struct SmartDiffEngine {
    changes: Vec<ConfigChange>,
}

impl SmartDiffEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All changes from `old_dir` to `new_dir`, ordered by relative file path.
    pub fn compare_configurations(&mut self, old_dir: &Path, new_dir: &Path) -> Result<Vec<ConfigChange>> {
        self.changes.clear();

        let old_files = config_files(old_dir);
        let new_files = config_files(new_dir);
        let names: BTreeSet<&String> = old_files.keys().chain(new_files.keys()).collect();

        for name in names {
            match (old_files.get(name), new_files.get(name)) {
                (Some(old), Some(new)) => self.compare_file(name, old, new)?,
                (Some(_), None) => {
                    let mut change = ConfigChange::new(ChangeType::Removed, name, format!("File removed: {name}"));
                    change.impact_level = ImpactLevel::High;
                    self.changes.push(change);
                }
                (None, Some(_)) => {
                    let mut change = ConfigChange::new(ChangeType::Added, name, format!("File added: {name}"));
                    change.impact_level = ImpactLevel::Medium;
                    change.auto_mergeable = file_auto_mergeable(Path::new(name));
                    self.changes.push(change);
                }
                (None, None) => {}
            }
        }

        tracing::debug!("Found {} changes between {} and {}", self.changes.len(), old_dir.display(), new_dir.display());
        Ok(self.changes.clone())
    }

    /// Changes from the last comparison with the given impact, in file order.
    #[must_use]
    pub fn changes_by_impact(&self, impact: ImpactLevel) -> Vec<&ConfigChange> {
        self.changes.iter().filter(|c| c.impact_level == impact).collect()
    }

    #[must_use]
    pub fn auto_mergeable_changes(&self) -> Vec<&ConfigChange> {
        self.changes.iter().filter(|c| c.auto_mergeable).collect()
    }

    #[must_use]
    pub fn summary(changes: &[ConfigChange]) -> ChangeSummary {
        let mut summary = ChangeSummary {
            total_changes: changes.len(),
            ..ChangeSummary::default()
        };
        for change in changes {
            *summary.by_type.entry(change.change_type.to_string()).or_insert(0) += 1;
            *summary.by_impact.entry(change.impact_level.to_string()).or_insert(0) += 1;
            if change.auto_mergeable {
                summary.auto_mergeable += 1;
            } else {
                summary.requires_review += 1;
            }
        }
        summary
    }

    fn compare_file(&mut self, name: &str, old: &Path, new: &Path) -> Result<()> {
        let old_content = crate::utils::fs::read_text_file(old)?;
        let new_content = crate::utils::fs::read_text_file(new)?;
        if old_content == new_content {
            return Ok(());
        }

        if name.ends_with(".json") {
            match (
                serde_json::from_str::<Value>(&old_content),
                serde_json::from_str::<Value>(&new_content),
            ) {
                (Ok(old_value), Ok(new_value)) => {
                    self.compare_json(name, &old_value, &new_value, "");
                    return Ok(());
                }
                _ => tracing::debug!("{name} is not valid JSON on both sides, comparing as text"),
            }
        }

        self.compare_text(name, &old_content, &new_content);
        Ok(())
    }

    fn compare_json(&mut self, name: &str, old: &Value, new: &Value, path: &str) {
        match (old, new) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();
                for key in keys {
                    let child = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                    match (old_map.get(key), new_map.get(key)) {
                        (Some(a), Some(b)) if a != b => self.compare_json(name, a, b, &child),
                        (Some(a), None) => self.push_json(name, ChangeType::Removed, &child, Some(a), None),
                        (None, Some(b)) => self.push_json(name, ChangeType::Added, &child, None, Some(b)),
                        _ => {}
                    }
                }
            }
            _ if old != new => self.push_json(name, ChangeType::Modified, path, Some(old), Some(new)),
            _ => {}
        }
    }

    fn push_json(&mut self, name: &str, change_type: ChangeType, path: &str, old: Option<&Value>, new: Option<&Value>) {
        let mut change = ConfigChange::new(change_type, name, format!("{} '{path}' in {name}", verb(change_type)));
        change.section = Some(path.to_string());
        change.old_value = old.cloned();
        change.new_value = new.cloned();
        change.impact_level = json_impact(path);
        change.auto_mergeable = json_auto_mergeable(path, change_type);
        self.changes.push(change);
    }

    fn compare_text(&mut self, name: &str, old_content: &str, new_content: &str) {
        let old_lines: Vec<&str> = old_content.lines().collect();
        let new_lines: Vec<&str> = new_content.lines().collect();
        let include = Regex::new(r"@include\s+([^\s#]+)").ok();

        let mut section: Option<String> = None;
        for op in line_diff(&old_lines, &new_lines) {
            let (line, change_type, line_number) = match op {
                DiffOp::Equal { old, .. } => {
                    if let Some(s) = header_section(old_lines[old]) {
                        section = Some(s);
                    }
                    continue;
                }
                DiffOp::Delete { old } => (old_lines[old], ChangeType::Removed, old + 1),
                DiffOp::Insert { new } => (new_lines[new], ChangeType::Added, new + 1),
            };

            if let Some(s) = header_section(line) {
                section = Some(s);
            }
            let line_section = detect_section(line, include.as_ref()).or_else(|| section.clone());
            let impact = text_impact(line, line_section.as_deref());

            let mut change = ConfigChange::new(change_type, name, format!("{} line {line_number} in {name}", verb(change_type)));
            let value = Some(Value::String(line.to_string()));
            if change_type == ChangeType::Removed {
                change.old_value = value;
            } else {
                change.new_value = value;
                change.auto_mergeable = text_auto_mergeable(line, line_section.as_deref());
            }
            change.line_number = Some(line_number);
            change.section = line_section;
            change.impact_level = impact;
            self.changes.push(change);
        }
    }
}

/// Relative path to file for CLAUDE.md, settings.json, top-level YAML and command files.
fn config_files(root: &Path) -> BTreeMap<String, PathBuf> {
    let mut files = BTreeMap::new();
    if !root.is_dir() {
        return files;
    }

    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let wanted = name == "CLAUDE.md"
                || name == "settings.json"
                || name.ends_with(".yml")
                || name.ends_with(".yaml");
            if wanted && path.is_file() {
                files.insert(name, path);
            }
        }
    }

    let commands = root.join("commands");
    for entry in WalkDir::new(&commands).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|e| e == "md")
            && let Some(rel) = relative_slash_path(root, path)
        {
            files.insert(rel, path.to_path_buf());
        }
    }
    files
}

const fn verb(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Added => "Added",
        ChangeType::Removed => "Removed",
        ChangeType::Modified => "Modified",
        ChangeType::Moved => "Moved",
        ChangeType::Conflict => "Conflict at",
    }
}

fn file_auto_mergeable(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
    let documentation = [".md", ".txt", ".rst"].iter().any(|ext| name.ends_with(ext));
    documentation && name != "claude.md" && name != "readme.md"
}

fn is_critical(section: Option<&str>) -> bool {
    section.is_some_and(|s| CRITICAL_SECTIONS.iter().any(|c| s.contains(c)))
}

fn json_impact(path: &str) -> ImpactLevel {
    let lower = path.to_lowercase();
    if path.contains("mcpServers") {
        ImpactLevel::Critical
    } else if HIGH_IMPACT_PATHS.iter().any(|p| lower.contains(p)) {
        ImpactLevel::High
    } else if MEDIUM_IMPACT_PATHS.iter().any(|p| lower.contains(p)) {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    }
}

fn json_auto_mergeable(path: &str, change_type: ChangeType) -> bool {
    if path.contains("mcpServers") || change_type != ChangeType::Added {
        return false;
    }
    let lower = path.to_lowercase();
    SAFE_JSON_ADDITIONS.iter().any(|p| lower.contains(p))
}

fn text_impact(line: &str, section: Option<&str>) -> ImpactLevel {
    let lower = line.to_lowercase();
    if is_critical(section) {
        ImpactLevel::Critical
    } else if HIGH_IMPACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ImpactLevel::High
    } else if MEDIUM_IMPACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    }
}

fn text_auto_mergeable(line: &str, section: Option<&str>) -> bool {
    if is_critical(section) {
        return false;
    }
    let lower = line.to_lowercase();
    SAFE_TEXT_INDICATORS.iter().any(|i| lower.contains(i))
}

fn header_section(line: &str) -> Option<String> {
    let trimmed = line.trim();
    trimmed
        .starts_with('#')
        .then(|| trimmed.trim_start_matches('#').trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Section named by the line itself: a header, an include target or a YAML key.
fn detect_section(line: &str, include: Option<&Regex>) -> Option<String> {
    if let Some(header) = header_section(line) {
        return Some(header);
    }
    if let Some(caps) = include.and_then(|re| re.captures(line)) {
        return Some(format!("Include: {}", &caps[1]));
    }
    let trimmed = line.trim_end();
    if trimmed.ends_with(':') && !trimmed.starts_with([' ', '\t', '-']) && !trimmed.is_empty() {
        return Some(trimmed.trim_end_matches(':').to_string());
    }
    None
}
