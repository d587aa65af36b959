//! Fluent builder for configuration trees in a temporary directory.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::migration::version::{Version, VersionManager};

/// A builder for a project directory holding Claude configuration files
pub struct ConfigTreeBuilder {
    temp_dir: TempDir,
    project_dir: PathBuf,
    files: Vec<(String, String)>,
    version: Option<Version>,
    template_type: String,
}

impl ConfigTreeBuilder {
    /// Create a new builder rooted in a fresh temporary directory
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().to_path_buf();
        Ok(Self {
            temp_dir,
            project_dir,
            files: Vec::new(),
            version: None,
            template_type: "core".to_string(),
        })
    }

    /// Put the project in a subdirectory of the temp directory
    pub fn with_project_dir(mut self, name: &str) -> Self {
        self.project_dir = self.temp_dir.path().join(name);
        self
    }

    pub fn with_claude_md(self, content: impl Into<String>) -> Self {
        self.with_file("CLAUDE.md", content)
    }

    /// Write `settings.json` at the project root (the template layout)
    pub fn with_settings(self, content: impl Into<String>) -> Self {
        self.with_file("settings.json", content)
    }

    /// Write `.claude/settings.json` (the project layout)
    pub fn with_project_settings(self, content: impl Into<String>) -> Self {
        self.with_file(".claude/settings.json", content)
    }

    pub fn with_mcp_json(self, content: impl Into<String>) -> Self {
        self.with_file(".mcp.json", content)
    }

    /// Add a file at a path relative to the project directory
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Stamp `.version` and `.metadata.json` after the files are written
    pub fn with_version(mut self, version: &str) -> Result<Self> {
        self.version = Some(Version::parse(version)?);
        Ok(self)
    }

    pub fn with_template_type(mut self, template_type: impl Into<String>) -> Self {
        self.template_type = template_type.into();
        self
    }

    pub fn build(self) -> Result<ConfigTree> {
        std::fs::create_dir_all(&self.project_dir)?;

        for (path, content) in &self.files {
            let full_path = self.project_dir.join(path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full_path, content)?;
        }

        if let Some(version) = &self.version {
            let manager = VersionManager::new(&self.project_dir);
            manager.save_version(version)?;
            let metadata = manager.create_metadata(version.clone(), &self.template_type, None, None)?;
            manager.save_metadata(&metadata)?;
        }

        Ok(ConfigTree {
            _temp_dir: self.temp_dir,
            project_dir: self.project_dir,
        })
    }
}

/// A built configuration tree; the directory is removed on drop
pub struct ConfigTree {
    _temp_dir: TempDir,
    pub project_dir: PathBuf,
}

impl ConfigTree {
    pub fn path(&self) -> &Path {
        &self.project_dir
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.project_dir.join(relative)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.file(relative))?)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.file(relative).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;

    #[test]
    fn test_builder_writes_files_and_version() {
        let tree = ConfigTreeBuilder::new()
            .unwrap()
            .with_project_dir("project")
            .with_claude_md(fixtures::COMPLETE_CLAUDE_MD)
            .with_project_settings(fixtures::SETTINGS_JSON)
            .with_version("1.1.0")
            .unwrap()
            .build()
            .unwrap();

        assert!(tree.path().ends_with("project"));
        assert!(tree.exists("CLAUDE.md"));
        assert!(tree.exists(".claude/settings.json"));
        assert_eq!(tree.read(".version").unwrap().trim(), "1.1.0");

        let manager = VersionManager::new(tree.path());
        assert_eq!(manager.load_metadata().unwrap().template_type, "core");
    }
}
