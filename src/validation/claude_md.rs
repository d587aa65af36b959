//! CLAUDE.md structure checks.
//!
//! Beyond plain Markdown hygiene this validator follows `@include path[#section]`
//! directives: the referenced YAML file must exist next to CLAUDE.md, parse, and (when a
//! section is named) contain that key at the top level.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{Finding, Validator};
use crate::config::ToolConfig;

const INCLUDE_PATTERN: &str = r"@include\s+([^\s#]+)#?([^\s]*)";
const WELL_FORMED_INCLUDE: &str = r"^@include\s+\S+";

/// Validates a single CLAUDE.md file.
pub struct ClaudeMdValidator {
    path: PathBuf,
    required_sections: Vec<String>,
    max_line_length: usize,
    yaml_references: BTreeSet<String>,
    missing_references: BTreeSet<String>,
}

impl ClaudeMdValidator {
    pub fn new(path: impl Into<PathBuf>, config: &ToolConfig) -> Self {
        Self {
            path: path.into(),
            required_sections: config.required_sections.clone(),
            max_line_length: config.max_line_length,
            yaml_references: BTreeSet::new(),
            missing_references: BTreeSet::new(),
        }
    }

    /// Every `@include` target seen during the last run.
    #[must_use]
    pub const fn yaml_references(&self) -> &BTreeSet<String> {
        &self.yaml_references
    }

    /// `@include` targets that did not exist during the last run.
    #[must_use]
    pub const fn missing_references(&self) -> &BTreeSet<String> {
        &self.missing_references
    }

    fn check_structure(&self, content: &str, findings: &mut Vec<Finding>) {
        let has_header = content.lines().take(10).any(|line| line.starts_with('#'));
        if !has_header {
            findings.push(
                Finding::warning("No markdown headers found in first 10 lines")
                    .with_file(&self.path)
                    .with_suggestion("Add descriptive headers to organize your configuration"),
            );
        }

        if content.trim().is_empty() {
            findings.push(
                Finding::error("CLAUDE.md file is empty")
                    .with_file(&self.path)
                    .fixable()
                    .with_suggestion("Add basic configuration structure"),
            );
        }
    }

    fn check_includes(&mut self, content: &str, findings: &mut Vec<Finding>) {
        let Ok(include_regex) = Regex::new(INCLUDE_PATTERN) else {
            return;
        };
        let base = self.path.parent().map(Path::to_path_buf).unwrap_or_default();

        for (index, line) in content.lines().enumerate() {
            for caps in include_regex.captures_iter(line) {
                let file = caps.get(1).map_or("", |m| m.as_str()).to_string();
                let section = caps.get(2).map_or("", |m| m.as_str()).to_string();
                self.yaml_references.insert(file.clone());
                self.check_reference(&base, &file, &section, index + 1, findings);
            }
        }
    }

    fn check_reference(
        &mut self,
        base: &Path,
        file: &str,
        section: &str,
        line: usize,
        findings: &mut Vec<Finding>,
    ) {
        let full_path = base.join(file);

        if !full_path.exists() {
            self.missing_references.insert(file.to_string());
            findings.push(
                Finding::error(format!("Referenced YAML file not found: {file}"))
                    .with_file(&self.path)
                    .at_line(line)
                    .with_suggestion(format!("Create the missing file at {}", full_path.display())),
            );
            return;
        }

        let content = match std::fs::read_to_string(&full_path) {
            Ok(content) => content,
            Err(e) => {
                findings.push(
                    Finding::error(format!("Failed to read YAML file {file}: {e}"))
                        .with_file(&full_path)
                        .at_line(line),
                );
                return;
            }
        };

        let yaml: serde_yaml::Value = match serde_yaml::from_str(&content) {
            Ok(yaml) => yaml,
            Err(e) => {
                findings.push(
                    Finding::error(format!("Invalid YAML syntax in {file}: {e}"))
                        .with_file(&full_path)
                        .at_line(line),
                );
                return;
            }
        };

        if section.is_empty() || yaml.is_null() {
            return;
        }

        let found = yaml.as_mapping().is_some_and(|map| map.contains_key(section));
        if !found {
            findings.push(
                Finding::error(format!("Section '{section}' not found in {file}"))
                    .with_file(&full_path)
                    .at_line(line)
                    .with_suggestion(format!(
                        "Add section '{section}' to {file} or fix the reference"
                    )),
            );
        }
    }

    fn check_sections(&self, content: &str, findings: &mut Vec<Finding>) {
        for section in &self.required_sections {
            if !has_section(content, section) {
                findings.push(
                    Finding::warning(format!("Required section '{section}' not found"))
                        .with_file(&self.path)
                        .fixable()
                        .with_suggestion(format!("Add a '## {section}' section")),
                );
            }
        }
    }

    fn check_lines(&self, content: &str, findings: &mut Vec<Finding>) {
        let well_formed = Regex::new(WELL_FORMED_INCLUDE).ok();

        for (index, line) in content.lines().enumerate() {
            let length = line.chars().count();
            if length > self.max_line_length {
                findings.push(
                    Finding::warning(format!("Very long line ({length} characters)"))
                        .with_file(&self.path)
                        .at_line(index + 1)
                        .fixable()
                        .with_suggestion("Consider breaking long lines for better readability"),
                );
            }

            if line.contains("@include")
                && let Some(re) = &well_formed
                && !re.is_match(line.trim_start())
            {
                findings.push(
                    Finding::error("Malformed @include statement")
                        .with_file(&self.path)
                        .at_line(index + 1)
                        .fixable()
                        .with_suggestion("Use format: @include path/to/file.yml#section"),
                );
            }
        }
    }
}

/// Whether `content` has a line starting with `## <section>` (case-insensitive).
#[must_use]
pub fn has_section(content: &str, section: &str) -> bool {
    let pattern = format!(r"(?im)^##[ \t]*{}", regex::escape(section));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(content))
}

impl Validator for ClaudeMdValidator {
    fn name(&self) -> &'static str {
        "claude_config"
    }

    fn validate(&mut self) -> Vec<Finding> {
        self.yaml_references.clear();
        self.missing_references.clear();
        let mut findings = Vec::new();

        if !self.path.exists() {
            findings.push(
                Finding::error(format!("CLAUDE.md file not found: {}", self.path.display()))
                    .with_file(&self.path)
                    .fixable(),
            );
            return findings;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                findings.push(
                    Finding::error(format!("Failed to read CLAUDE.md file: {e}"))
                        .with_file(&self.path),
                );
                return findings;
            }
        };

        tracing::debug!("Validating {}", self.path.display());
        self.check_structure(&content, &mut findings);
        self.check_includes(&content, &mut findings);
        self.check_sections(&content, &mut findings);
        self.check_lines(&content, &mut findings);

        findings
    }
}
