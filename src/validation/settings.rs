//! settings.json checks: the permission lists and deprecated keys.

use serde_json::Value;
use std::path::PathBuf;

use super::{Finding, Validator};
use crate::config::ToolConfig;

/// Validates one settings.json file.
pub struct SettingsValidator {
    path: PathBuf,
    deprecated_keys: Vec<String>,
}

impl SettingsValidator {
    pub fn new(path: impl Into<PathBuf>, config: &ToolConfig) -> Self {
        Self {
            path: path.into(),
            deprecated_keys: config.deprecated_settings_keys.clone(),
        }
    }

    fn check_permissions(&self, root: &serde_json::Map<String, Value>, findings: &mut Vec<Finding>) {
        let Some(permissions) = root.get("permissions") else {
            findings.push(
                Finding::warning("settings.json has no 'permissions' section")
                    .with_file(&self.path)
                    .fixable()
                    .with_suggestion("Add \"permissions\": {\"allow\": [], \"deny\": []}"),
            );
            return;
        };

        let Some(permissions) = permissions.as_object() else {
            findings.push(
                Finding::error("'permissions' must be an object")
                    .with_file(&self.path)
                    .with_suggestion("Use \"permissions\": {\"allow\": [], \"deny\": []}"),
            );
            return;
        };

        for key in ["allow", "deny"] {
            findings.extend(check_string_array(permissions.get(key), &format!("permissions.{key}"))
                .into_iter()
                .map(|f| f.with_file(&self.path)));
        }
    }

    fn check_deprecated(&self, root: &Value, findings: &mut Vec<Finding>) {
        for key in &self.deprecated_keys {
            if lookup_dotted(root, key).is_some() {
                findings.push(
                    Finding::warning(format!("Deprecated setting '{key}' is present"))
                        .with_file(&self.path)
                        .fixable()
                        .with_suggestion(format!("Remove '{key}' from settings.json")),
                );
            }
        }
    }
}

/// Check that `value` is present and is an array of strings.
///
/// A missing value is a fixable warning; anything else that is not an array of strings
/// is an error. Findings carry no file path.
#[must_use]
pub fn check_string_array(value: Option<&Value>, label: &str) -> Vec<Finding> {
    match value {
        None => vec![
            Finding::warning(format!("'{label}' is missing"))
                .fixable()
                .with_suggestion(format!("Add '{label}' as an array of strings")),
        ],
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_string())
            .map(|(index, _)| {
                Finding::error(format!("'{label}[{index}]' must be a string"))
                    .with_suggestion("Permission rules are strings such as \"Bash(git status)\"")
            })
            .collect(),
        Some(_) => vec![
            Finding::error(format!("'{label}' must be an array"))
                .with_suggestion(format!("Change '{label}' to an array of strings")),
        ],
    }
}

/// Look up a dotted path (`claude.legacy.mode`) in nested objects.
///
/// A literal key containing dots at the top level also matches.
#[must_use]
pub fn lookup_dotted<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(value) = root.get(path) {
        return Some(value);
    }
    path.split('.').try_fold(root, |node, part| node.get(part))
}

impl Validator for SettingsValidator {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn validate(&mut self) -> Vec<Finding> {
        let mut findings = Vec::new();

        if !self.path.exists() {
            findings.push(
                Finding::warning(format!("settings.json not found: {}", self.path.display()))
                    .with_file(&self.path)
                    .fixable()
                    .with_suggestion("Create settings.json with a permissions section"),
            );
            return findings;
        }

        let root: Value = match std::fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
        {
            Ok(root) => root,
            Err(e) => {
                findings.push(
                    Finding::error(format!("Invalid JSON in settings.json: {e}"))
                        .with_file(&self.path)
                        .fixable()
                        .with_suggestion("Fix JSON syntax errors"),
                );
                return findings;
            }
        };

        let Some(object) = root.as_object() else {
            findings.push(
                Finding::error("settings.json must contain a JSON object").with_file(&self.path),
            );
            return findings;
        };

        self.check_permissions(object, &mut findings);
        self.check_deprecated(&root, &mut findings);
        findings
    }
}
