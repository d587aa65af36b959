//! Conflict detection and resolution between a local file and its remote counterpart.
//!
//! Each conflict type has a fixed set of strategies. Every strategy reports a confidence
//! in `[0, 1]`; without an explicit choice the most confident one wins. Only resolutions
//! with confidence of at least [`AUTO_APPLY_CONFIDENCE`] that need no review are written
//! back by [`ConflictResolver::auto_resolve_file`].
//!
//! Resolutions are applied where the conflict lives: a JSON conflict replaces the value
//! at its key path, a Markdown conflict replaces one section body, and only a plain-text
//! conflict rewrites the whole file.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::CcsetupError;
use crate::utils::fs::write_text_file;

/// Resolutions at or above this confidence are applied without review.
pub const AUTO_APPLY_CONFIDENCE: f64 = 0.8;

/// Word-set similarity above which two Markdown sections are considered the same text.
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Key used for Markdown content before the first heading.
const PREAMBLE: &str = "header";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    Content,
    Section,
    JsonMerge,
    Line,
    Structure,
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Content => "content",
            Self::Section => "section",
            Self::JsonMerge => "json_merge",
            Self::Line => "line",
            Self::Structure => "structure",
        };
        f.write_str(s)
    }
}

/// One disagreement between the local and the remote file.
///
/// Empty `local_value` / `remote_value` means the side does not have the key or
/// section at all. JSON values are stored pretty-printed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub file_path: PathBuf,
    pub section: Option<String>,
    /// Object keys leading to a JSON conflict; empty for text conflicts.
    pub key_path: Vec<String>,
    pub local_value: String,
    pub remote_value: String,
    pub description: String,
    pub auto_resolvable: bool,
}

/// How a conflict is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ContentMerge,
    PreferLocal,
    PreferRemote,
    SectionMerge,
    SectionAppend,
    JsonDeepMerge,
    JsonPreferStructure,
    PreserveBoth,
    Prioritize,
}

impl Strategy {
    const fn for_type(conflict_type: ConflictType) -> &'static [Self] {
        match conflict_type {
            ConflictType::Content => &[Self::ContentMerge, Self::PreferLocal, Self::PreferRemote],
            ConflictType::Section => &[Self::SectionMerge, Self::SectionAppend],
            ConflictType::JsonMerge => &[Self::JsonDeepMerge, Self::JsonPreferStructure],
            ConflictType::Line => &[Self::ContentMerge],
            ConflictType::Structure => &[Self::PreserveBoth, Self::Prioritize],
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ContentMerge => "content_merge",
            Self::PreferLocal => "prefer_local",
            Self::PreferRemote => "prefer_remote",
            Self::SectionMerge => "section_merge",
            Self::SectionAppend => "section_append",
            Self::JsonDeepMerge => "json_deep_merge",
            Self::JsonPreferStructure => "json_prefer_structure",
            Self::PreserveBoth => "preserve_both",
            Self::Prioritize => "prioritize",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = CcsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let strategy = match s {
            "content_merge" => Self::ContentMerge,
            "prefer_local" => Self::PreferLocal,
            "prefer_remote" => Self::PreferRemote,
            "section_merge" => Self::SectionMerge,
            "section_append" => Self::SectionAppend,
            "json_deep_merge" => Self::JsonDeepMerge,
            "json_prefer_structure" => Self::JsonPreferStructure,
            "preserve_both" => Self::PreserveBoth,
            "prioritize" => Self::Prioritize,
            other => {
                return Err(CcsetupError::Other {
                    message: format!("Unknown resolution strategy: {other}"),
                });
            }
        };
        Ok(strategy)
    }
}

/// A proposed (or applied) resolution for one conflict.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub conflict: Conflict,
    pub strategy: Strategy,
    pub resolved_value: String,
    pub confidence: f64,
    pub requires_review: bool,
    pub explanation: String,
    /// Set once the resolution has been written to the local file.
    pub applied: bool,
}

impl Resolution {
    fn new(conflict: &Conflict, strategy: Strategy, resolved_value: String, confidence: f64, explanation: impl Into<String>) -> Self {
        Self {
            conflict: conflict.clone(),
            strategy,
            resolved_value,
            confidence,
            requires_review: confidence < 0.5,
            explanation: explanation.into(),
            applied: false,
        }
    }

    #[must_use]
    pub fn is_auto_applicable(&self) -> bool {
        self.confidence >= AUTO_APPLY_CONFIDENCE && !self.requires_review
    }
}

/// Detects and resolves conflicts between two versions of a configuration file.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    create_backups: bool,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self { create_backups: true }
    }
}

impl ConflictResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_backups(mut self, create_backups: bool) -> Self {
        self.create_backups = create_backups;
        self
    }

    /// Conflicts between `local` and `remote`, chosen by the local file's extension.
    ///
    /// Returns nothing when either file is missing.
    pub fn detect_conflicts(&self, local: &Path, remote: &Path) -> Result<Vec<Conflict>> {
        if !local.is_file() || !remote.is_file() {
            return Ok(Vec::new());
        }
        let local_content = std::fs::read_to_string(local)
            .with_context(|| format!("Failed to read {}", local.display()))?;
        let remote_content = std::fs::read_to_string(remote)
            .with_context(|| format!("Failed to read {}", remote.display()))?;

        let extension = local.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let conflicts = match extension {
            "json" => match (
                serde_json::from_str::<Value>(&local_content),
                serde_json::from_str::<Value>(&remote_content),
            ) {
                (Ok(l), Ok(r)) => {
                    let mut conflicts = Vec::new();
                    compare_json(local, &l, &r, &mut Vec::new(), &mut conflicts);
                    conflicts
                }
                _ => text_conflicts(local, &local_content, &remote_content),
            },
            "md" => markdown_conflicts(local, &local_content, &remote_content),
            _ => text_conflicts(local, &local_content, &remote_content),
        };
        tracing::debug!("Found {} conflicts in {}", conflicts.len(), local.display());
        Ok(conflicts)
    }

    /// Resolve with `strategy` if it applies to the conflict type, otherwise with the
    /// most confident applicable strategy.
    #[must_use]
    pub fn resolve(&self, conflict: &Conflict, strategy: Option<Strategy>) -> Resolution {
        let candidates = Strategy::for_type(conflict.conflict_type);
        if let Some(strategy) = strategy
            && candidates.contains(&strategy)
        {
            return apply_strategy(conflict, strategy);
        }

        let mut best: Option<Resolution> = None;
        for candidate in candidates {
            let resolution = apply_strategy(conflict, *candidate);
            if best.as_ref().is_none_or(|b| resolution.confidence > b.confidence) {
                best = Some(resolution);
            }
        }
        best.unwrap_or_else(|| Resolution {
            requires_review: true,
            ..Resolution::new(conflict, Strategy::PreferLocal, conflict.local_value.clone(), 0.0, "No strategy applies")
        })
    }

    /// Detect, resolve and write back every confident resolution.
    ///
    /// The local file is copied to `<file>.conflict_backup` before the first write; an
    /// existing backup is left in place.
    pub fn auto_resolve_file(&self, local: &Path, remote: &Path) -> Result<Vec<Resolution>> {
        let conflicts = self.detect_conflicts(local, remote)?;
        let mut resolutions: Vec<Resolution> = conflicts.iter().map(|c| self.resolve(c, None)).collect();
        if !resolutions.iter().any(Resolution::is_auto_applicable) {
            return Ok(resolutions);
        }

        let original = std::fs::read_to_string(local)
            .with_context(|| format!("Failed to read {}", local.display()))?;
        let mut document = Document::parse(local, &original);
        for resolution in resolutions.iter_mut().filter(|r| r.is_auto_applicable()) {
            match document.apply(resolution) {
                Ok(()) => resolution.applied = true,
                Err(e) => tracing::warn!("Could not apply {} resolution: {e:#}", resolution.strategy),
            }
        }

        let updated = document.render()?;
        if updated != original {
            if self.create_backups {
                let backup = conflict_backup_path(local);
                if !backup.exists() {
                    std::fs::copy(local, &backup)
                        .with_context(|| format!("Failed to back up {}", local.display()))?;
                }
            }
            write_text_file(local, &updated)?;
            tracing::info!("Applied {} resolutions to {}", resolutions.iter().filter(|r| r.applied).count(), local.display());
        }
        Ok(resolutions)
    }
}

#[must_use]
pub fn conflict_backup_path(file: &Path) -> PathBuf {
    let mut name = file.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".conflict_backup");
    file.with_file_name(name)
}

// Detection

fn compare_json(file: &Path, local: &Value, remote: &Value, path: &mut Vec<String>, out: &mut Vec<Conflict>) {
    let conflict = |path: &[String], local_value: String, remote_value: String, description: String, auto: bool| Conflict {
        conflict_type: ConflictType::JsonMerge,
        file_path: file.to_path_buf(),
        section: Some(path.join(".")),
        key_path: path.to_vec(),
        local_value,
        remote_value,
        description,
        auto_resolvable: auto,
    };

    match (local, remote) {
        (Value::Object(l), Value::Object(r)) => {
            let mut keys: Vec<&String> = l.keys().collect();
            keys.extend(r.keys().filter(|k| !l.contains_key(*k)));
            for key in keys {
                path.push(key.clone());
                match (l.get(key), r.get(key)) {
                    (Some(a), Some(b)) => compare_json(file, a, b, path, out),
                    (Some(a), None) => out.push(conflict(
                        path.as_slice(),
                        pretty(a),
                        String::new(),
                        format!("Key '{}' exists only in local version", path.join(".")),
                        true,
                    )),
                    (None, Some(b)) => out.push(conflict(
                        path.as_slice(),
                        String::new(),
                        pretty(b),
                        format!("Key '{}' exists only in remote version", path.join(".")),
                        true,
                    )),
                    (None, None) => {}
                }
                path.pop();
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            if l != r {
                let auto = l.iter().all(|v| r.contains(v)) || r.iter().all(|v| l.contains(v));
                out.push(conflict(path.as_slice(), pretty(local), pretty(remote), format!("Array differs at path '{}'", path.join(".")), auto));
            }
        }
        _ if std::mem::discriminant(local) != std::mem::discriminant(remote) => out.push(conflict(
            path.as_slice(),
            pretty(local),
            pretty(remote),
            format!("Type mismatch at path '{}'", path.join(".")),
            false,
        )),
        _ if local != remote => out.push(conflict(
            path.as_slice(),
            pretty(local),
            pretty(remote),
            format!("Value differs at path '{}'", path.join(".")),
            false,
        )),
        _ => {}
    }
}

fn markdown_conflicts(file: &Path, local: &str, remote: &str) -> Vec<Conflict> {
    let local_sections = parse_sections(local);
    let remote_sections = parse_sections(remote);

    let mut names: Vec<&str> = local_sections.iter().map(|(h, _)| h.as_str()).collect();
    for (heading, _) in &remote_sections {
        if !names.contains(&heading.as_str()) {
            names.push(heading);
        }
    }

    let body = |sections: &[(String, Vec<String>)], name: &str| {
        sections.iter().find(|(h, _)| h == name).map(|(_, b)| b.join("\n")).unwrap_or_default()
    };

    names
        .into_iter()
        .filter_map(|name| {
            let l = body(&local_sections, name);
            let r = body(&remote_sections, name);
            (l != r).then(|| Conflict {
                conflict_type: ConflictType::Section,
                file_path: file.to_path_buf(),
                section: Some(name.to_string()),
                key_path: Vec::new(),
                auto_resolvable: section_auto_resolvable(&l, &r),
                description: format!("Section '{name}' differs between versions"),
                local_value: l,
                remote_value: r,
            })
        })
        .collect()
}

fn text_conflicts(file: &Path, local: &str, remote: &str) -> Vec<Conflict> {
    if local == remote {
        return Vec::new();
    }
    vec![Conflict {
        conflict_type: ConflictType::Content,
        file_path: file.to_path_buf(),
        section: None,
        key_path: Vec::new(),
        local_value: local.to_string(),
        remote_value: remote.to_string(),
        description: "File content differs between versions".to_string(),
        auto_resolvable: content_auto_resolvable(local, remote),
    }]
}

/// Headings in order of appearance with their body lines. Content before the first
/// heading is keyed by [`PREAMBLE`].
fn parse_sections(content: &str) -> Vec<(String, Vec<String>)> {
    let mut sections = vec![(PREAMBLE.to_string(), Vec::new())];
    for line in content.lines() {
        if line.starts_with('#') {
            sections.push((line.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line.to_string());
        }
    }
    sections
}

fn jaccard<'a>(a: &HashSet<&'a str>, b: &HashSet<&'a str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn section_auto_resolvable(local: &str, remote: &str) -> bool {
    if local.trim().is_empty() || remote.trim().is_empty() {
        return true;
    }
    let l_lower = local.to_lowercase();
    let r_lower = remote.to_lowercase();
    let l: HashSet<&str> = l_lower.split_whitespace().collect();
    let r: HashSet<&str> = r_lower.split_whitespace().collect();
    jaccard(&l, &r) > SIMILARITY_THRESHOLD
}

fn content_auto_resolvable(local: &str, remote: &str) -> bool {
    let l: HashSet<&str> = local.lines().collect();
    let r: HashSet<&str> = remote.lines().collect();
    if local.lines().count() < 3 || remote.lines().count() < 3 {
        return true;
    }
    jaccard(&l, &r) > SIMILARITY_THRESHOLD
}

// Strategies

fn apply_strategy(conflict: &Conflict, strategy: Strategy) -> Resolution {
    let local = &conflict.local_value;
    let remote = &conflict.remote_value;

    match strategy {
        Strategy::ContentMerge => {
            let (merged, clean) = merge_lines(local, remote);
            let confidence = if clean { 0.7 } else { 0.3 };
            let explanation = if clean {
                "Interleaved unique lines from both sides"
            } else {
                "Merged with LOCAL/REMOTE markers where lines could not be aligned"
            };
            Resolution::new(conflict, strategy, merged, confidence, explanation)
        }
        Strategy::PreferLocal => Resolution::new(conflict, strategy, local.clone(), 0.9, "Kept the local version"),
        Strategy::PreferRemote => Resolution::new(conflict, strategy, remote.clone(), 0.9, "Took the remote version"),
        Strategy::SectionMerge => {
            let (l, r) = (local.trim(), remote.trim());
            let (merged, confidence) = if l.is_empty() {
                (r.to_string(), 1.0)
            } else if r.is_empty() {
                (l.to_string(), 1.0)
            } else {
                (format!("{l}\n\n{r}"), 0.6)
            };
            let mut resolution = Resolution::new(conflict, strategy, merged, confidence, "Combined both section bodies");
            resolution.requires_review = confidence < AUTO_APPLY_CONFIDENCE;
            resolution
        }
        Strategy::SectionAppend => Resolution::new(
            conflict,
            strategy,
            format!("{local}\n\n--- From Remote ---\n{remote}"),
            0.8,
            "Appended the remote section below the local one",
        ),
        Strategy::JsonDeepMerge => match (parse_side(local), parse_side(remote)) {
            (Ok(l), Ok(r)) => {
                let merged = match (l, r) {
                    (Some(l), Some(r)) => deep_merge(l, r),
                    (Some(v), None) | (None, Some(v)) => v,
                    (None, None) => Value::Null,
                };
                Resolution::new(conflict, strategy, pretty(&merged), 0.8, "Merged objects recursively and unioned arrays")
            }
            _ => unparsable(conflict, strategy),
        },
        Strategy::JsonPreferStructure => match (parse_side(local), parse_side(remote)) {
            (Ok(l), Ok(r)) => {
                let lc = l.as_ref().map_or(0, complexity);
                let rc = r.as_ref().map_or(0, complexity);
                let (value, side) = if lc >= rc { (local, "local") } else { (remote, "remote") };
                Resolution::new(conflict, strategy, value.clone(), 0.7, format!("Kept the {side} version, which has more structure"))
            }
            _ => unparsable(conflict, strategy),
        },
        Strategy::PreserveBoth => {
            let mut resolution = Resolution::new(
                conflict,
                strategy,
                format!("{local}\n\n# Alternative structure:\n{remote}"),
                0.6,
                "Kept both structures for manual review",
            );
            resolution.requires_review = true;
            resolution
        }
        Strategy::Prioritize => {
            let (value, side) = if local.len() >= remote.len() { (local, "local") } else { (remote, "remote") };
            Resolution::new(conflict, strategy, value.clone(), 0.7, format!("Kept the more detailed {side} version"))
        }
    }
}

fn unparsable(conflict: &Conflict, strategy: Strategy) -> Resolution {
    let mut resolution = Resolution::new(conflict, strategy, conflict.local_value.clone(), 0.0, "Values are not valid JSON");
    resolution.requires_review = true;
    resolution
}

fn parse_side(value: &str) -> Result<Option<Value>, serde_json::Error> {
    if value.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(value).map(Some)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Objects merge recursively, arrays become the ordered union, and scalars take the
/// remote value.
#[must_use]
pub fn deep_merge(local: Value, remote: Value) -> Value {
    match (local, remote) {
        (Value::Object(mut l), Value::Object(r)) => {
            for (key, value) in r {
                let merged = match l.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                l.insert(key, merged);
            }
            Value::Object(l)
        }
        (Value::Array(mut l), Value::Array(r)) => {
            for item in r {
                if !l.contains(&item) {
                    l.push(item);
                }
            }
            Value::Array(l)
        }
        (_, remote) => remote,
    }
}

fn complexity(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(|v| 1 + complexity(v)).sum(),
        Value::Array(items) => items.iter().map(complexity).sum(),
        _ => 1,
    }
}

/// Walk both line lists, copying shared lines once and unique runs from whichever side
/// re-synchronises sooner. Returns the merged text and whether it needed no markers.
fn merge_lines(local: &str, remote: &str) -> (String, bool) {
    let l: Vec<&str> = local.lines().collect();
    let r: Vec<&str> = remote.lines().collect();
    let mut merged: Vec<String> = Vec::new();
    let mut clean = true;
    let (mut i, mut j) = (0, 0);

    while i < l.len() && j < r.len() {
        if l[i] == r[j] {
            merged.push(l[i].to_string());
            i += 1;
            j += 1;
            continue;
        }

        let local_ahead = l[i..].iter().position(|line| *line == r[j]);
        let remote_ahead = r[j..].iter().position(|line| *line == l[i]);
        match (local_ahead, remote_ahead) {
            (Some(la), ra) if ra.is_none_or(|ra| la <= ra) => {
                merged.extend(l[i..i + la].iter().map(|s| (*s).to_string()));
                i += la;
            }
            (_, Some(ra)) => {
                merged.extend(r[j..j + ra].iter().map(|s| (*s).to_string()));
                j += ra;
            }
            _ => {
                merged.push(format!("# LOCAL: {}", l[i]));
                merged.push(format!("# REMOTE: {}", r[j]));
                clean = false;
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend(l[i..].iter().map(|s| (*s).to_string()));
    merged.extend(r[j..].iter().map(|s| (*s).to_string()));
    (merged.join("\n"), clean)
}

// Application

/// The local file in a form resolutions can be applied to piecewise.
enum Document {
    Json(Value),
    Markdown { sections: Vec<(String, Vec<String>)>, trailing_newline: bool },
    Text(String),
}

impl Document {
    fn parse(path: &Path, content: &str) -> Self {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match extension {
            "json" => serde_json::from_str(content).map_or_else(|_| Self::Text(content.to_string()), Self::Json),
            "md" => Self::Markdown {
                sections: parse_sections(content),
                trailing_newline: content.ends_with('\n'),
            },
            _ => Self::Text(content.to_string()),
        }
    }

    fn apply(&mut self, resolution: &Resolution) -> Result<()> {
        let conflict = &resolution.conflict;
        match self {
            Self::Json(root) if conflict.conflict_type == ConflictType::JsonMerge => {
                let value = parse_side(&resolution.resolved_value)?;
                set_json_path(root, &conflict.key_path, value)
            }
            Self::Markdown { sections, .. } => {
                let name = conflict.section.as_deref().unwrap_or(PREAMBLE);
                let body: Vec<String> = resolution.resolved_value.lines().map(str::to_string).collect();
                match sections.iter_mut().find(|(h, _)| h == name) {
                    Some((_, existing)) => *existing = body,
                    None => sections.push((name.to_string(), body)),
                }
                Ok(())
            }
            Self::Text(text) => {
                text.clone_from(&resolution.resolved_value);
                Ok(())
            }
            Self::Json(_) => Err(anyhow::anyhow!("Cannot apply a {} conflict to a JSON document", conflict.conflict_type)),
        }
    }

    fn render(&self) -> Result<String> {
        match self {
            Self::Json(value) => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                Ok(out)
            }
            Self::Markdown { sections, trailing_newline } => {
                let mut lines: Vec<&str> = Vec::new();
                for (heading, body) in sections {
                    if heading != PREAMBLE {
                        lines.push(heading);
                    }
                    lines.extend(body.iter().map(String::as_str));
                }
                let mut out = lines.join("\n");
                if *trailing_newline {
                    out.push('\n');
                }
                Ok(out)
            }
            Self::Text(text) => Ok(text.clone()),
        }
    }
}

/// Replace (or with `None`, remove) the value at `path`, creating objects as needed.
fn set_json_path(root: &mut Value, path: &[String], value: Option<Value>) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value.unwrap_or(Value::Null);
        return Ok(());
    };

    let mut node = root;
    for key in parents {
        let object = node
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("'{key}' is not inside an object"))?;
        node = object.entry(key.clone()).or_insert_with(|| Value::Object(Map::new()));
    }
    let object = node
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Parent of '{last}' is not an object"))?;
    match value {
        Some(value) => {
            object.insert(last.clone(), value);
        }
        None => {
            object.remove(last);
        }
    }
    Ok(())
}
