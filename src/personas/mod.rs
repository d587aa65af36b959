//! Specialized personas for Claude Code sessions.
//!
//! Nine built-in personas each carry focus areas, responsibilities, the keywords that
//! suggest them and the slash commands they specialize in. A persona's prompt template
//! is `<id>.md`, looked up in the project's `.claude/personas/` first and then in
//! `<templates>/personas/`. The active persona is persisted in
//! `.claude/active_persona` so it survives between invocations.

pub mod catalog;

pub use catalog::PersonaKind;

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::fs::{read_text_file, write_text_file};

/// Project-local persona templates, relative to the project root.
pub const PROJECT_PERSONAS_DIR: &str = ".claude/personas";

/// Holds the id of the active persona, relative to the project root.
pub const ACTIVE_PERSONA_FILE: &str = ".claude/active_persona";

/// A catalogue entry resolved against one project.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    #[serde(rename = "id")]
    pub kind: PersonaKind,
    pub name: &'static str,
    pub description: &'static str,
    pub focus_areas: &'static [&'static str],
    pub responsibilities: &'static [&'static str],
    pub activation_triggers: &'static [&'static str],
    pub command_specializations: &'static [&'static str],
    pub template_path: Option<PathBuf>,
    pub is_active: bool,
}

pub struct PersonaManager {
    project_dir: PathBuf,
    templates_dir: PathBuf,
    active: Option<PersonaKind>,
}

impl PersonaManager {
    /// Load the active persona of `project_dir`. A relative `templates_dir` is taken
    /// relative to the project.
    pub fn new(project_dir: &Path, templates_dir: &Path) -> Result<Self> {
        let mut manager = Self {
            project_dir: project_dir.to_path_buf(),
            templates_dir: project_dir.join(templates_dir),
            active: None,
        };
        manager.active = manager.read_active()?;
        tracing::debug!("Active persona: {:?}", manager.active);
        Ok(manager)
    }

    fn active_file(&self) -> PathBuf {
        self.project_dir.join(ACTIVE_PERSONA_FILE)
    }

    fn template_dirs(&self) -> [PathBuf; 2] {
        [self.project_dir.join(PROJECT_PERSONAS_DIR), self.templates_dir.join("personas")]
    }

    fn read_active(&self) -> Result<Option<PersonaKind>> {
        let path = self.active_file();
        if !path.exists() {
            return Ok(None);
        }
        let content = read_text_file(&path)?;
        let id = content.trim();
        if id.is_empty() {
            return Ok(None);
        }
        match id.parse() {
            Ok(kind) => Ok(Some(kind)),
            Err(_) => {
                tracing::warn!("Ignoring unknown active persona '{id}' in {}", path.display());
                Ok(None)
            }
        }
    }

    #[must_use]
    pub fn persona(&self, kind: PersonaKind) -> Persona {
        Persona {
            kind,
            name: kind.display_name(),
            description: kind.description(),
            focus_areas: kind.focus_areas(),
            responsibilities: kind.responsibilities(),
            activation_triggers: kind.activation_triggers(),
            command_specializations: kind.command_specializations(),
            template_path: self.template_path(kind),
            is_active: self.active == Some(kind),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<Persona> {
        PersonaKind::ALL.into_iter().map(|kind| self.persona(kind)).collect()
    }

    /// Look a persona up by id or display name.
    pub fn get(&self, name: &str) -> Result<Persona> {
        let kind: PersonaKind = name.parse()?;
        Ok(self.persona(kind))
    }

    #[must_use]
    pub fn active(&self) -> Option<Persona> {
        self.active.map(|kind| self.persona(kind))
    }

    /// Make `name` the active persona. Returns the persona that was active before, if
    /// it was a different one.
    pub fn activate(&mut self, name: &str) -> Result<Option<PersonaKind>> {
        let kind: PersonaKind = name.parse()?;
        write_text_file(&self.active_file(), &format!("{}\n", kind.id()))?;
        let previous = self.active.replace(kind).filter(|p| *p != kind);
        tracing::info!("Activated persona {kind}");
        Ok(previous)
    }

    /// Clear the active persona. Returns the one that was active.
    pub fn deactivate(&mut self) -> Result<Option<PersonaKind>> {
        let path = self.active_file();
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        let previous = self.active.take();
        if let Some(kind) = previous {
            tracing::info!("Deactivated persona {kind}");
        }
        Ok(previous)
    }

    /// Personas specializing in `command`, with or without its leading `/`.
    #[must_use]
    pub fn suggest_for_command(&self, command: &str) -> Vec<PersonaKind> {
        let command = command.trim().trim_start_matches('/').to_lowercase();
        PersonaKind::ALL
            .into_iter()
            .filter(|kind| kind.command_specializations().iter().any(|c| *c == command))
            .collect()
    }

    /// Personas with a trigger keyword in `context`, in catalogue order.
    ///
    /// A trigger matches a word that starts with it, so `test` matches "testing" but
    /// `ux` does not match "linux". Hyphenated words also match on each part.
    #[must_use]
    pub fn suggest_for_context(&self, context: &str) -> Vec<PersonaKind> {
        let context = context.to_lowercase();
        let words: Vec<&str> = context
            .split(|c: char| !(c.is_alphanumeric() || c == '/' || c == '-'))
            .filter(|w| !w.is_empty())
            .flat_map(|w| std::iter::once(w).chain(w.split('-').filter(move |p| !p.is_empty() && *p != w)))
            .collect();

        PersonaKind::ALL
            .into_iter()
            .filter(|kind| {
                kind.activation_triggers()
                    .iter()
                    .any(|trigger| words.iter().any(|word| word.starts_with(trigger)))
            })
            .collect()
    }

    /// The first `<id>.md` found in the project or templates persona directories.
    #[must_use]
    pub fn template_path(&self, kind: PersonaKind) -> Option<PathBuf> {
        let file_name = format!("{}.md", kind.id());
        self.template_dirs().into_iter().map(|dir| dir.join(&file_name)).find(|path| path.is_file())
    }

    /// The persona's template text, if it has one.
    pub fn template(&self, name: &str) -> Result<Option<String>> {
        let kind: PersonaKind = name.parse()?;
        self.template_path(kind).map(|path| read_text_file(&path)).transpose()
    }

    /// `.md` files in the persona directories that name no known persona.
    pub fn unrecognized_templates(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for dir in self.template_dirs() {
            if !dir.is_dir() {
                continue;
            }
            let entries = fs::read_dir(&dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                let is_markdown = path.extension().is_some_and(|ext| ext == "md");
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                if is_markdown && path.is_file() && stem.parse::<PersonaKind>().is_err() {
                    found.push(path);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Every persona keyed by id.
    #[must_use]
    pub fn export(&self) -> BTreeMap<&'static str, Persona> {
        self.list().into_iter().map(|p| (p.kind.id(), p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CcsetupError;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> PersonaManager {
        PersonaManager::new(temp.path(), Path::new("templates")).unwrap()
    }

    #[test]
    fn test_list_and_get() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        let all = manager.list();
        assert_eq!(all.len(), 9);
        assert!(all.iter().all(|p| !p.is_active && p.template_path.is_none()));

        let persona = manager.get("Security Engineer").unwrap();
        assert_eq!(persona.kind, PersonaKind::SecurityEngineer);
        assert!(persona.command_specializations.contains(&"secrets-scan"));

        let err = manager.get("wizard").unwrap_err();
        assert!(matches!(err.downcast_ref::<CcsetupError>(), Some(CcsetupError::UnknownPersona { .. })));
    }

    #[test]
    fn test_activation_is_persisted() {
        let temp = TempDir::new().unwrap();
        let mut first = manager(&temp);
        assert!(first.active().is_none());

        assert_eq!(first.activate("architect").unwrap(), None);
        assert_eq!(first.activate("tester").unwrap(), Some(PersonaKind::Architect));
        assert_eq!(first.activate("tester").unwrap(), None);

        let second = manager(&temp);
        let active = second.active().unwrap();
        assert_eq!(active.kind, PersonaKind::Tester);
        assert!(active.is_active);
        assert_eq!(second.list().iter().filter(|p| p.is_active).count(), 1);

        let mut third = manager(&temp);
        assert_eq!(third.deactivate().unwrap(), Some(PersonaKind::Tester));
        assert_eq!(third.deactivate().unwrap(), None);
        assert!(!temp.path().join(ACTIVE_PERSONA_FILE).exists());
        assert!(manager(&temp).active().is_none());
    }

    #[test]
    fn test_unknown_active_persona_is_ignored() {
        let temp = TempDir::new().unwrap();
        write_text_file(&temp.path().join(ACTIVE_PERSONA_FILE), "wizard\n").unwrap();
        assert!(manager(&temp).active().is_none());
    }

    #[test]
    fn test_suggest_for_command() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        assert_eq!(
            manager.suggest_for_command("/integration-test"),
            vec![PersonaKind::Developer, PersonaKind::IntegrationSpecialist, PersonaKind::Tester]
        );
        assert_eq!(manager.suggest_for_command("secrets-scan"), vec![PersonaKind::SecurityEngineer]);
        assert!(manager.suggest_for_command("integration").is_empty());
    }

    #[test]
    fn test_suggest_for_context() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);

        assert_eq!(
            manager.suggest_for_context("Fix the AUTH flow before deployment"),
            vec![PersonaKind::DevopsEngineer, PersonaKind::SecurityEngineer]
        );
        assert_eq!(
            manager.suggest_for_context("add load-testing"),
            vec![PersonaKind::Developer, PersonaKind::PerformanceEngineer, PersonaKind::Tester]
        );
        assert_eq!(manager.suggest_for_context("set up ci/cd"), vec![PersonaKind::DevopsEngineer]);
        assert!(manager.suggest_for_context("install linux packages").is_empty());
    }

    #[test]
    fn test_templates_prefer_project_copy() {
        let temp = TempDir::new().unwrap();
        write_text_file(&temp.path().join("templates/personas/architect.md"), "# Shared architect\n").unwrap();
        write_text_file(&temp.path().join("templates/personas/tester.md"), "# Shared tester\n").unwrap();
        write_text_file(&temp.path().join(".claude/personas/tester.md"), "# Local tester\n").unwrap();
        write_text_file(&temp.path().join(".claude/personas/reviewer.md"), "# Reviewer\n").unwrap();
        write_text_file(&temp.path().join(".claude/personas/notes.txt"), "not a template").unwrap();
        let manager = manager(&temp);

        assert_eq!(manager.template("architect").unwrap().as_deref(), Some("# Shared architect\n"));
        assert_eq!(manager.template("Tester").unwrap().as_deref(), Some("# Local tester\n"));
        assert_eq!(manager.template("developer").unwrap(), None);
        assert_eq!(
            manager.persona(PersonaKind::Tester).template_path,
            Some(temp.path().join(".claude/personas/tester.md"))
        );

        assert_eq!(manager.unrecognized_templates().unwrap(), vec![temp.path().join(".claude/personas/reviewer.md")]);
    }

    #[test]
    fn test_export_is_keyed_by_id() {
        let temp = TempDir::new().unwrap();
        let mut manager = manager(&temp);
        manager.activate("developer").unwrap();

        let exported = serde_json::to_value(manager.export()).unwrap();
        assert_eq!(exported.as_object().unwrap().len(), 9);
        assert_eq!(exported["developer"]["id"], "developer");
        assert_eq!(exported["developer"]["is_active"], true);
        assert_eq!(exported["devops-engineer"]["name"], "DevOps Engineer");
        assert!(exported["tester"]["template_path"].is_null());
    }
}
