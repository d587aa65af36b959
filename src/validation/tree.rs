//! Whole-tree checks for a `templates/` directory.
//!
//! Every template shipped in the tree must satisfy the same structural contract:
//!
//! - each `CLAUDE.md` contains the mandated `##` sections
//! - each `settings.json` has `permissions.allow` and `permissions.deny` as string arrays
//! - each `.mcp.json` server has a string `command` and an array `args`
//! - every JSON file re-serializes without loss (no duplicate keys, no numbers that
//!   change once parsed)
//!
//! Unlike the project validators, any deviation here is an error: the tree is release
//! content and CI gates on it.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use super::claude_md::has_section;
use super::settings::check_string_array;
use super::{Finding, FindingCounts, Severity};
use crate::utils::fs::{compile_patterns, find_files};

/// Outcome of a tree check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeReport {
    pub root: PathBuf,
    pub files_checked: usize,
    pub findings: Vec<Finding>,
}

impl TreeReport {
    #[must_use]
    pub fn counts(&self) -> FindingCounts {
        FindingCounts::from_findings(&self.findings)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(Finding::is_error)
    }
}

/// Checks every template file below a root directory.
pub struct TreeChecker {
    root: PathBuf,
    required_sections: Vec<String>,
}

impl TreeChecker {
    pub fn new(root: impl Into<PathBuf>, required_sections: Vec<String>) -> Self {
        Self {
            root: root.into(),
            required_sections,
        }
    }

    pub fn check(&self) -> anyhow::Result<TreeReport> {
        if !self.root.is_dir() {
            return Err(crate::core::CcsetupError::ConfigDirNotFound {
                path: self.root.display().to_string(),
            }
            .into());
        }

        let include = compile_patterns(&[
            "**/CLAUDE.md".to_string(),
            "**/settings.json".to_string(),
            "**/.mcp.json".to_string(),
        ])?;
        let files = find_files(&self.root, &include, &[]);

        let mut report = TreeReport {
            root: self.root.clone(),
            ..TreeReport::default()
        };

        for file in &files {
            let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            tracing::debug!("Checking template file {}", file.display());
            let findings = match name {
                "CLAUDE.md" => self.check_claude_md(file),
                "settings.json" => check_json(file, check_settings_value),
                ".mcp.json" => check_json(file, check_mcp_value),
                _ => continue,
            };
            report.files_checked += 1;
            report.findings.extend(findings);
        }

        Ok(report)
    }

    fn check_claude_md(&self, file: &Path) -> Vec<Finding> {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => return vec![Finding::error(format!("Failed to read file: {e}")).with_file(file)],
        };

        self.required_sections
            .iter()
            .filter(|section| !has_section(&content, section))
            .map(|section| {
                Finding::error(format!("Missing mandated section '## {section}'"))
                    .with_file(file)
                    .fixable()
            })
            .collect()
    }
}

/// Parse `file`, report anything a re-serialization would lose, then run `shape` over the value.
fn check_json(file: &Path, shape: fn(&Value) -> Vec<Finding>) -> Vec<Finding> {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => return vec![Finding::error(format!("Failed to read file: {e}")).with_file(file)],
    };

    let value: Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(e) => return vec![Finding::error(format!("Invalid JSON: {e}")).with_file(file).fixable()],
    };

    let mut findings: Vec<Finding> = round_trip_losses(&text)
        .into_iter()
        .map(|loss| Finding::error(format!("JSON does not survive re-serialization unchanged: {loss}")).with_file(file))
        .collect();

    findings.extend(shape(&value).into_iter().map(|f| f.with_file(file)));
    findings
}

/// What a parse and re-serialization of `text` would lose.
///
/// Covers duplicate object keys (all but the last are dropped) and number literals whose
/// value changes once stored as `u64`, `i64` or `f64`.
#[must_use]
pub fn round_trip_losses(text: &str) -> Vec<String> {
    let mut losses = Vec::new();
    if let Err(e) = serde_json::from_str::<UniqueKeys>(text) {
        losses.push(e.to_string());
    }
    losses.extend(
        number_literals(text)
            .into_iter()
            .filter(|literal| !number_survives(literal))
            .map(|literal| format!("number {literal} loses precision")),
    );
    losses
}

/// Accepts any JSON document whose objects have no repeated keys.
struct UniqueKeys;

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeysVisitor)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = UniqueKeys;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_unit<E: de::Error>(self) -> Result<UniqueKeys, E> {
        Ok(UniqueKeys)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<UniqueKeys, A::Error> {
        while seq.next_element::<UniqueKeys>()?.is_some() {}
        Ok(UniqueKeys)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<UniqueKeys, A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate key '{key}'")));
            }
            map.next_value::<UniqueKeys>()?;
        }
        Ok(UniqueKeys)
    }
}

/// Number literals outside of strings, in document order.
fn number_literals(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut literals = Vec::new();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == b'-' || b.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && matches!(bytes[i], b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                i += 1;
            }
            literals.push(&text[start..i]);
            continue;
        }
        i += 1;
    }
    literals
}

/// Whether `literal` keeps its exact decimal value through serde_json's number model.
fn number_survives(literal: &str) -> bool {
    if literal.parse::<i64>().is_ok() || literal.parse::<u64>().is_ok() {
        return true;
    }
    let Ok(parsed) = literal.parse::<f64>() else {
        return false;
    };
    parsed.is_finite() && canonical_decimal(literal) == canonical_decimal(&parsed.to_string())
}

/// `(negative, significant digits, exponent)` with the digits stripped of leading and
/// trailing zeros, so equal values compare equal whatever their spelling.
fn canonical_decimal(literal: &str) -> Option<(bool, String, i64)> {
    let (negative, rest) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(at) => (&rest[..at], rest[at + 1..].parse::<i64>().ok()?),
        None => (rest, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let digits = format!("{int_part}{frac_part}");
    let mut exponent = exponent - i64::try_from(frac_part.len()).ok()?;
    let trimmed = digits.trim_start_matches('0');
    let significant = trimmed.trim_end_matches('0');
    if significant.is_empty() {
        return Some((false, String::new(), 0));
    }
    exponent += i64::try_from(trimmed.len() - significant.len()).ok()?;
    Some((negative, significant.to_string(), exponent))
}

fn check_settings_value(value: &Value) -> Vec<Finding> {
    let permissions = value.get("permissions");
    let Some(permissions) = permissions.and_then(Value::as_object) else {
        return vec![Finding::error("'permissions' must be an object with 'allow' and 'deny' arrays")];
    };

    ["allow", "deny"]
        .iter()
        .flat_map(|key| check_string_array(permissions.get(*key), &format!("permissions.{key}")))
        .map(escalate)
        .collect()
}

fn check_mcp_value(value: &Value) -> Vec<Finding> {
    let Some(servers) = value.get("mcpServers").and_then(Value::as_object) else {
        return vec![Finding::error("'mcpServers' must be an object")];
    };

    let mut findings = Vec::new();
    for (name, server) in servers {
        match server.get("command") {
            Some(Value::String(_)) => {}
            Some(_) => findings.push(Finding::error(format!("Server '{name}': 'command' must be a string"))),
            None => findings.push(Finding::error(format!("Server '{name}' is missing 'command'")).fixable()),
        }
        match server.get("args") {
            Some(Value::Array(_)) => {}
            Some(_) => findings.push(Finding::error(format!("Server '{name}': 'args' must be an array"))),
            None => findings.push(Finding::error(format!("Server '{name}' is missing 'args'")).fixable()),
        }
        if let Some(env) = server.get("env")
            && !env.is_object()
        {
            findings.push(Finding::error(format!("Server '{name}': 'env' must be an object")));
        }
    }
    findings
}

fn escalate(mut finding: Finding) -> Finding {
    if finding.level < Severity::Error {
        finding.level = Severity::Error;
    }
    finding
}
