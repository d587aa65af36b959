//! File system helpers shared by the validators, the fixer and the migration tools.
//!
//! Writes go through [`atomic_write`] so an interrupted fix or restore never leaves a
//! half-written `settings.json` behind. Paths handed to glob matching are always
//! relative and `/`-separated, regardless of platform, so the same include and exclude
//! patterns work on Windows and Unix.

use anyhow::{Context, Result};
use glob::Pattern;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Create `path` and all missing parents.
///
/// Fails if `path` exists but is not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Write `content` to a sibling temp file, fsync it, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Read a UTF-8 text file.
pub fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Write a text file atomically.
pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = read_text_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from file: {}", path.display()))
}

/// Serialize `data` as JSON and write it atomically. Pretty output ends with a newline.
pub fn write_json_file<T>(path: &Path, data: &T, pretty: bool) -> Result<()>
where
    T: serde::Serialize,
{
    let json = if pretty {
        let mut s = serde_json::to_string_pretty(data)?;
        s.push('\n');
        s
    } else {
        serde_json::to_string(data)?
    };

    write_text_file(path, &json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

/// SHA-256 of a file's content, hex encoded.
pub fn calculate_checksum(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read file for checksum: {}", path.display()))?;
    Ok(checksum_bytes(&content))
}

/// SHA-256 of a byte slice, hex encoded.
#[must_use]
pub fn checksum_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// `path` relative to `base`, rendered with `/` separators.
///
/// Returns `None` when `path` is not under `base`.
#[must_use]
pub fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Whether joining `path` onto `base` stays inside `base`.
///
/// Absolute paths and any `..` component are rejected outright.
#[must_use]
pub fn is_safe_path(path: &Path) -> bool {
    !path.is_absolute()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Compile glob strings, failing on the first invalid pattern.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid glob pattern: {p}")))
        .collect()
}

/// Walk `root` and return files whose relative path matches an include pattern and no
/// exclude pattern. Results are sorted by relative path.
pub fn find_files(root: &Path, include: &[Pattern], exclude: &[Pattern]) -> Vec<PathBuf> {
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut matched: Vec<(String, PathBuf)> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = relative_slash_path(root, entry.path())?;
            let included = include.iter().any(|p| p.matches_with(&rel, options));
            let excluded = exclude.iter().any(|p| p.matches_with(&rel, options));
            (included && !excluded).then(|| (rel, entry.into_path()))
        })
        .collect();

    matched.sort_by(|a, b| a.0.cmp(&b.0));
    matched.into_iter().map(|(_, path)| path).collect()
}
