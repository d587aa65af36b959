//! The `config.toml` file read at startup.
//!
//! Every key is optional; a missing file or a missing key falls back to the defaults
//! shown below.
//!
//! ```toml
//! required_sections = [
//!     "Project Overview",
//!     "Development Workflow",
//!     "Critical Rules",
//!     "Claude-Specific Instructions",
//! ]
//! max_line_length = 200
//! probe_mcp_servers = true
//! probe_timeout_secs = 2
//! backup_keep = 10
//! templates_dir = "templates"
//! deprecated_settings_keys = ["claude.legacy.mode", "claude.beta.features", "claude.experimental.ui"]
//! ```
//!
//! The file location can be overridden with the `CCSETUP_CONFIG` environment variable or
//! the global `--config` flag (the flag wins).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CCSETUP_CONFIG";

fn default_required_sections() -> Vec<String> {
    ["Project Overview", "Development Workflow", "Critical Rules", "Claude-Specific Instructions"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

const fn default_max_line_length() -> usize {
    200
}

const fn default_probe_mcp_servers() -> bool {
    true
}

const fn default_probe_timeout_secs() -> u64 {
    2
}

const fn default_backup_keep() -> usize {
    10
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_deprecated_settings_keys() -> Vec<String> {
    ["claude.legacy.mode", "claude.beta.features", "claude.experimental.ui"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// User-level settings for the validators, the fixer and the backup manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// `##` sections every CLAUDE.md must contain.
    #[serde(default = "default_required_sections")]
    pub required_sections: Vec<String>,

    /// Lines longer than this in CLAUDE.md produce a warning.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Whether to start each configured MCP server briefly during validation.
    #[serde(default = "default_probe_mcp_servers")]
    pub probe_mcp_servers: bool,

    /// How long a probed MCP server may run before it counts as "running".
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Backups retained by `backup cleanup` when `--keep` is not given.
    #[serde(default = "default_backup_keep")]
    pub backup_keep: usize,

    /// Root scanned by `templates check` when no path is given.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Dotted settings.json keys that are reported and removed by the fixer.
    #[serde(default = "default_deprecated_settings_keys")]
    pub deprecated_settings_keys: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            required_sections: default_required_sections(),
            max_line_length: default_max_line_length(),
            probe_mcp_servers: default_probe_mcp_servers(),
            probe_timeout_secs: default_probe_timeout_secs(),
            backup_keep: default_backup_keep(),
            templates_dir: default_templates_dir(),
            deprecated_settings_keys: default_deprecated_settings_keys(),
        }
    }
}

impl ToolConfig {
    /// Load from the default location, falling back to defaults when the file is absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, otherwise from [`default_path`](Self::default_path).
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and parse a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Write the config as pretty TOML, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// `$CCSETUP_CONFIG` if set, else `~/.ccsetup/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return crate::utils::resolve_path(&path);
        }

        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?;
        Ok(home.join(".ccsetup").join("config.toml"))
    }

    /// The probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let config =
            ToolConfig::load_with_optional(Some(temp.path().join("missing.toml"))).await.unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.required_sections.len(), 4);
        assert_eq!(config.max_line_length, 200);
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "probe_mcp_servers = false\nbackup_keep = 3\n").unwrap();

        let config = ToolConfig::load_from(&path).await.unwrap();
        assert!(!config.probe_mcp_servers);
        assert_eq!(config.backup_keep, 3);
        assert_eq!(config.probe_timeout_secs, 2);
        assert_eq!(config.templates_dir, "templates");
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let config = ToolConfig {
            max_line_length: 120,
            ..ToolConfig::default()
        };
        config.save_to(&path).await.unwrap();

        assert_eq!(ToolConfig::load_from(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "max_line_length = [").unwrap();
        assert!(ToolConfig::load_from(&path).await.is_err());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::set_var(CONFIG_PATH_ENV, "/tmp/ccsetup-test/config.toml") };
        assert_eq!(
            ToolConfig::default_path().unwrap(),
            PathBuf::from("/tmp/ccsetup-test/config.toml")
        );
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
    }
}
