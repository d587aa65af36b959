//! Configuration version detection and metadata.
//!
//! A project records its template version in `.version` (one line) and a snapshot of
//! its state in `.metadata.json`. Older projects without those files still carry a
//! version in CLAUDE.md or settings.json, which [`VersionManager::detect_current_version`]
//! falls back to.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::RegexBuilder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

use crate::core::CcsetupError;
use crate::utils::fs::{read_json_file, relative_slash_path, write_json_file, write_text_file};

pub const VERSION_FILE: &str = ".version";
pub const METADATA_FILE: &str = ".metadata.json";

/// Phrases near a version match that mark it as documentation rather than a declaration.
const DOC_INDICATORS: &[&str] = &[
    "semantic versioning",
    "version tagging",
    "example",
    "e.g.",
    "for example",
    "(v1.2.3)",
    "format:",
    "like:",
    "such as",
];

const CONTEXT_CHARS: usize = 50;

/// A configuration version. Build metadata is kept for display but ignored when
/// comparing.
#[derive(Debug, Clone)]
pub struct Version(semver::Version);

impl Version {
    pub fn parse(input: &str) -> Result<Self, CcsetupError> {
        semver::Version::parse(input.trim())
            .map(Self)
            .map_err(|_| CcsetupError::InvalidVersion {
                version: input.trim().to_string(),
            })
    }

    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    #[must_use]
    pub const fn major(&self) -> u64 {
        self.0.major
    }

    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0.minor
    }

    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.0.patch
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// Same major version.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.0.major == other.0.major
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Version {
    type Err = CcsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Contents of `.metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub version: Version,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    pub checksum: String,
    pub template_type: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reads and writes version information for one configuration directory.
pub struct VersionManager {
    config_dir: PathBuf,
}

impl VersionManager {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn version_file(&self) -> PathBuf {
        self.config_dir.join(VERSION_FILE)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.config_dir.join(METADATA_FILE)
    }

    /// Current version from `.version`, then CLAUDE.md, then settings.json.
    #[must_use]
    pub fn detect_current_version(&self) -> Option<Version> {
        if let Ok(text) = std::fs::read_to_string(self.version_file()) {
            match Version::parse(&text) {
                Ok(version) => return Some(version),
                Err(e) => tracing::warn!("Ignoring unreadable {VERSION_FILE}: {e}"),
            }
        }

        if let Ok(content) = std::fs::read_to_string(self.config_dir.join("CLAUDE.md"))
            && let Some(version) = version_from_claude_md(&content)
        {
            return Some(version);
        }

        let settings = crate::validation::find_settings_file(&self.config_dir)?;
        let value: serde_json::Value = std::fs::read_to_string(settings)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())?;
        value.get("version").and_then(|v| v.as_str()).and_then(|v| Version::parse(v).ok())
    }

    pub fn save_version(&self, version: &Version) -> Result<()> {
        write_text_file(&self.version_file(), &format!("{version}\n"))
    }

    /// SHA-256 over CLAUDE.md, settings.json and `commands/**/*.md`, in sorted path
    /// order. Each file contributes its relative path followed by its bytes.
    pub fn calculate_checksum(&self) -> Result<String> {
        let mut files = vec!["CLAUDE.md".to_string(), "settings.json".to_string()];

        let commands = self.config_dir.join("commands");
        if commands.is_dir() {
            for entry in WalkDir::new(&commands).into_iter().filter_map(Result::ok) {
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|e| e == "md")
                    && let Some(rel) = relative_slash_path(&self.config_dir, path)
                {
                    files.push(rel);
                }
            }
        }
        files.sort();

        let mut hasher = Sha256::new();
        for rel in &files {
            let full = self.config_dir.join(rel);
            if !full.is_file() {
                continue;
            }
            let content = std::fs::read(&full)
                .with_context(|| format!("Failed to read {}", full.display()))?;
            hasher.update(rel.as_bytes());
            hasher.update(&content);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// `None` when the file is missing or cannot be parsed.
    #[must_use]
    pub fn load_metadata(&self) -> Option<ConfigMetadata> {
        let path = self.metadata_file();
        if !path.is_file() {
            return None;
        }
        match read_json_file(&path) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {e:#}", path.display());
                None
            }
        }
    }

    pub fn save_metadata(&self, metadata: &ConfigMetadata) -> Result<()> {
        write_json_file(&self.metadata_file(), metadata, true)
    }

    pub fn create_metadata(
        &self,
        version: Version,
        template_type: &str,
        author: Option<String>,
        description: Option<String>,
    ) -> Result<ConfigMetadata> {
        let now = Local::now();
        Ok(ConfigMetadata {
            version,
            created_at: now,
            updated_at: now,
            checksum: self.calculate_checksum()?,
            template_type: template_type.to_string(),
            dependencies: Vec::new(),
            author,
            description,
        })
    }

    /// Refresh the timestamp and checksum of existing metadata.
    pub fn update_metadata(&self, mut metadata: ConfigMetadata) -> Result<ConfigMetadata> {
        metadata.updated_at = Local::now();
        metadata.checksum = self.calculate_checksum()?;
        Ok(metadata)
    }

    #[must_use]
    pub fn compare_versions(a: &Version, b: &Version) -> Ordering {
        a.cmp(b)
    }

    /// Steps needed to go from `source` to `target`. Every supported migration is a
    /// single direct step.
    #[must_use]
    pub fn migration_path(source: &Version, target: &Version) -> Vec<(Version, Version)> {
        if source == target {
            Vec::new()
        } else {
            vec![(source.clone(), target.clone())]
        }
    }

    /// True when no version or metadata exists, or the checksum has drifted.
    #[must_use]
    pub fn is_migration_needed(&self) -> bool {
        if self.detect_current_version().is_none() {
            return true;
        }
        let Some(metadata) = self.load_metadata() else {
            return true;
        };
        self.calculate_checksum().map_or(true, |checksum| checksum != metadata.checksum)
    }
}

/// Find a declared version in CLAUDE.md, skipping documentation examples.
fn version_from_claude_md(content: &str) -> Option<Version> {
    const PATTERNS: &[&str] = &[
        r"version[:\s]+v?(\d+\.\d+\.\d+(?:-[a-zA-Z0-9\-\.]+)?(?:\+[a-zA-Z0-9\-\.]+)?)",
        r"SuperClaude v(\d+\.\d+\.\d+)",
    ];

    for pattern in PATTERNS {
        let Ok(re) = RegexBuilder::new(pattern).case_insensitive(true).build() else {
            continue;
        };
        for caps in re.captures_iter(content) {
            let (Some(whole), Some(version)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            let context = surrounding(content, whole.start(), whole.end()).to_lowercase();
            if DOC_INDICATORS.iter().any(|i| context.contains(i)) {
                continue;
            }
            if let Ok(version) = Version::parse(version.as_str()) {
                return Some(version);
            }
        }
    }
    None
}

/// The match plus up to [`CONTEXT_CHARS`] characters on each side.
fn surrounding(content: &str, start: usize, end: usize) -> &str {
    let before = content[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let after = content[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map_or(content.len(), |(i, _)| end + i);
    &content[before..after]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("2.0.0") > v("1.9.9"));
        assert_eq!(v("1.0.0+build.1"), v("1.0.0+build.2"));
        assert_eq!(v("1.2.3+meta").to_string(), "1.2.3+meta");
    }

    #[test]
    fn test_invalid() {
        assert!(Version::parse("1.2").is_err());
        assert!(Version::parse("v1.2.3").is_err());
        assert!(matches!(
            Version::parse("abc"),
            Err(CcsetupError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_compatibility() {
        assert!(v("2.0.0").is_compatible_with(&v("2.9.1")));
        assert!(!v("1.0.0").is_compatible_with(&v("2.0.0")));
    }

    #[test]
    fn test_save_version_replaces_file() {
        let temp = TempDir::new().unwrap();
        let manager = VersionManager::new(temp.path());
        manager.save_version(&v("1.1.0")).unwrap();
        manager.save_version(&v("1.2.0")).unwrap();
        assert_eq!(fs::read_to_string(temp.path().join(".version")).unwrap(), "1.2.0\n");
        assert_eq!(manager.detect_current_version(), Some(v("1.2.0")));
    }

    #[test]
    fn test_detect_from_version_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".version"), "2.0.1\n").unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "Version: 1.0.0\n").unwrap();
        let manager = VersionManager::new(temp.path());
        assert_eq!(manager.detect_current_version(), Some(v("2.0.1")));
    }

    #[test]
    fn test_detect_from_claude_md_skips_docs() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("CLAUDE.md"),
            "Use semantic versioning, e.g. version 9.9.9 for releases.\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\n\nConfiguration version: 1.1.0\n",
        )
        .unwrap();
        let manager = VersionManager::new(temp.path());
        assert_eq!(manager.detect_current_version(), Some(v("1.1.0")));
    }

    #[test]
    fn test_detect_from_settings() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("settings.json"), r#"{"version": "1.2.0"}"#).unwrap();
        let manager = VersionManager::new(temp.path());
        assert_eq!(manager.detect_current_version(), Some(v("1.2.0")));
        assert!(VersionManager::new(TempDir::new().unwrap().path()).detect_current_version().is_none());
    }

    #[test]
    fn test_checksum_tracks_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "# A\n").unwrap();
        fs::create_dir_all(temp.path().join("commands/dev")).unwrap();
        fs::write(temp.path().join("commands/dev/test.md"), "run tests\n").unwrap();
        fs::write(temp.path().join("commands/notes.txt"), "ignored\n").unwrap();

        let manager = VersionManager::new(temp.path());
        let first = manager.calculate_checksum().unwrap();
        assert_eq!(first.len(), 64);

        fs::write(temp.path().join("commands/notes.txt"), "still ignored\n").unwrap();
        assert_eq!(manager.calculate_checksum().unwrap(), first);

        fs::write(temp.path().join("commands/dev/test.md"), "run all tests\n").unwrap();
        assert_ne!(manager.calculate_checksum().unwrap(), first);
    }

    #[test]
    fn test_metadata_round_trip_and_drift() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("CLAUDE.md"), "# A\n").unwrap();
        let manager = VersionManager::new(temp.path());
        manager.save_version(&v("2.0.1")).unwrap();

        let metadata = manager
            .create_metadata(v("2.0.1"), "fastapi", None, Some("demo".to_string()))
            .unwrap();
        manager.save_metadata(&metadata).unwrap();
        assert_eq!(manager.load_metadata(), Some(metadata.clone()));
        assert!(!manager.is_migration_needed());

        fs::write(temp.path().join("CLAUDE.md"), "# B\n").unwrap();
        assert!(manager.is_migration_needed());

        let updated = manager.update_metadata(metadata).unwrap();
        manager.save_metadata(&updated).unwrap();
        assert!(!manager.is_migration_needed());
    }

    #[test]
    fn test_migration_path() {
        assert!(VersionManager::migration_path(&v("1.0.0"), &v("1.0.0")).is_empty());
        assert_eq!(VersionManager::migration_path(&v("1.0.0"), &v("2.0.0")).len(), 1);
        assert_eq!(
            VersionManager::compare_versions(&v("1.0.0"), &v("1.1.0")),
            Ordering::Less
        );
    }
}
