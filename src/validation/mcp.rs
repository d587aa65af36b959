//! MCP server configuration checks.
//!
//! Servers are read from `.mcp.json` when present, otherwise from the `mcpServers`
//! section of `settings.json`. Structural checks run synchronously through
//! [`Validator::validate`]. Starting each server to see whether it comes up is a
//! separate, async step ([`McpValidator::probe_servers`]) because it spawns processes
//! and waits on them.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::{Finding, Validator};

/// Maximum number of stderr characters quoted in a probe failure.
const STDERR_EXCERPT_CHARS: usize = 200;

/// Validates MCP server definitions found in a configuration directory.
pub struct McpValidator {
    config_dir: PathBuf,
    source_file: Option<PathBuf>,
    servers: Map<String, Value>,
}

impl McpValidator {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            source_file: None,
            servers: Map::new(),
        }
    }

    /// `.mcp.json` if it exists, otherwise `settings.json` (in `.claude/` or at the top level).
    #[must_use]
    pub fn config_file(&self) -> Option<PathBuf> {
        let mcp = self.config_dir.join(".mcp.json");
        if mcp.is_file() {
            return Some(mcp);
        }
        super::find_settings_file(&self.config_dir)
    }

    /// Names of servers seen during the last [`validate`](Validator::validate).
    #[must_use]
    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// The file the servers were read from during the last run.
    #[must_use]
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Raw configuration of one server from the last run.
    #[must_use]
    pub fn server_config(&self, name: &str) -> Option<&Value> {
        self.servers.get(name)
    }

    fn check_server(&self, name: &str, config: &Value, file: &Path, findings: &mut Vec<Finding>) {
        let Some(config) = config.as_object() else {
            findings.push(
                Finding::error(format!("MCP server '{name}' configuration must be an object"))
                    .with_file(file),
            );
            return;
        };

        match config.get("command") {
            None => findings.push(
                Finding::error(format!("MCP server '{name}' missing required field: command"))
                    .with_file(file)
                    .fixable()
                    .with_suggestion("Add 'command' to server configuration"),
            ),
            Some(Value::String(command)) => check_command(name, command, findings),
            Some(_) => findings.push(
                Finding::error(format!("MCP server '{name}' command must be a string"))
                    .with_file(file)
                    .with_suggestion("Change command to a string value"),
            ),
        }

        match config.get("args") {
            None | Some(Value::Null) => {}
            Some(Value::Array(args)) => {
                if let Some(index) = args.iter().position(|a| !a.is_string()) {
                    findings.push(
                        Finding::error(format!("MCP server '{name}' args[{index}] must be a string"))
                            .with_file(file),
                    );
                }
            }
            Some(_) => findings.push(
                Finding::error(format!("MCP server '{name}' args must be a list"))
                    .with_file(file)
                    .with_suggestion("Change args to a list of strings"),
            ),
        }

        if let Some(env) = config.get("env")
            && !env.is_object()
            && !env.is_null()
        {
            findings.push(
                Finding::error(format!("MCP server '{name}' env must be an object"))
                    .with_file(file)
                    .with_suggestion("Change env to an object with key-value pairs"),
            );
        }

        if config.contains_key("url") {
            findings.push(
                Finding::warning(format!("MCP server '{name}' uses deprecated 'url' field"))
                    .with_file(file)
                    .with_suggestion("Use 'command' and 'args' instead of 'url'"),
            );
        }
    }

    /// Start every configured server and report whether it comes up.
    ///
    /// A server that is still running when `timeout` expires is considered healthy and
    /// is killed. Call after [`validate`](Validator::validate).
    pub async fn probe_servers(&self, timeout: Duration) -> Vec<Finding> {
        let mut findings = Vec::new();
        for (name, config) in &self.servers {
            let Some(command) = config.get("command").and_then(Value::as_str) else {
                continue;
            };
            let args: Vec<String> = config
                .get("args")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default();
            let env: HashMap<String, String> = config
                .get("env")
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .map(|(k, v)| {
                            let value = v.as_str().map_or_else(|| v.to_string(), String::from);
                            (k.clone(), value)
                        })
                        .collect()
                })
                .unwrap_or_default();

            findings.push(probe_server(name, command, &args, &env, &self.config_dir, timeout).await);
        }
        findings
    }
}

fn check_command(name: &str, command: &str, findings: &mut Vec<Finding>) {
    if command.contains('/') || command.contains('\\') {
        let path = Path::new(command);
        if !path.exists() {
            findings.push(
                Finding::error(format!("MCP server '{name}' command not found: {command}"))
                    .with_suggestion("Install the required package or fix the path"),
            );
        } else if !path.is_file() {
            findings.push(
                Finding::error(format!("MCP server '{name}' command is not a file: {command}"))
                    .with_suggestion("Ensure the command points to an executable file"),
            );
        }
    } else if which::which(command).is_err() {
        findings.push(
            Finding::warning(format!("MCP server '{name}' command not found in PATH: {command}"))
                .with_suggestion(format!("Install {command} or provide full path to executable")),
        );
    }
}

async fn probe_server(
    name: &str,
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
    cwd: &Path,
    timeout: Duration,
) -> Finding {
    tracing::debug!("Probing MCP server '{name}': {command} {}", args.join(" "));

    let spawned = Command::new(command)
        .args(args)
        .envs(env)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Finding::error(format!("MCP server '{name}' command not found: {command}"))
                .with_suggestion(format!("Install required package for {command}"));
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Finding::error(format!("MCP server '{name}' permission denied: {command}"))
                .with_suggestion("Check file permissions for the command");
        }
        Err(e) => {
            return Finding::warning(format!("MCP server '{name}' connectivity test failed: {e}"))
                .with_suggestion("Check server configuration and system requirements");
        }
    };

    let metadata = serde_json::json!({ "server_name": name });
    match tokio::time::timeout(timeout, child.wait()).await {
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to stop probed MCP server '{name}': {e}");
            }
            Finding::info(format!("MCP server '{name}' is running (timeout reached)"))
                .with_metadata(metadata)
        }
        Ok(Ok(status)) if status.success() => {
            Finding::info(format!("MCP server '{name}' started successfully")).with_metadata(metadata)
        }
        Ok(Ok(status)) => {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let mut buf = Vec::new();
                if pipe.read_to_end(&mut buf).await.is_ok() {
                    stderr = String::from_utf8_lossy(&buf).chars().take(STDERR_EXCERPT_CHARS).collect();
                }
            }
            let detail = if stderr.trim().is_empty() {
                format!("exit status {status}")
            } else {
                stderr.trim().to_string()
            };
            Finding::warning(format!("MCP server '{name}' exited with error: {detail}"))
                .with_suggestion("Check server configuration and dependencies")
        }
        Ok(Err(e)) => Finding::warning(format!("MCP server '{name}' connectivity test failed: {e}"))
            .with_suggestion("Check server configuration and system requirements"),
    }
}

impl Validator for McpValidator {
    fn name(&self) -> &'static str {
        "mcp_servers"
    }

    fn validate(&mut self) -> Vec<Finding> {
        self.servers.clear();
        self.source_file = None;
        let mut findings = Vec::new();

        let Some(file) = self.config_file() else {
            findings.push(
                Finding::warning(format!(
                    "No MCP configuration found. Checked: {}, {}",
                    self.config_dir.join(".mcp.json").display(),
                    self.config_dir.join(".claude").join("settings.json").display()
                ))
                .with_suggestion("Create .mcp.json or settings.json with MCP server configurations"),
            );
            return findings;
        };

        let root: Value = match std::fs::read_to_string(&file) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(root) => root,
                Err(e) => {
                    findings.push(
                        Finding::error(format!("Invalid JSON in configuration file: {e}"))
                            .with_file(&file)
                            .fixable()
                            .with_suggestion("Fix JSON syntax errors"),
                    );
                    return findings;
                }
            },
            Err(e) => {
                findings.push(
                    Finding::error(format!("Failed to read configuration file: {e}")).with_file(&file),
                );
                return findings;
            }
        };

        let servers = match root.get("mcpServers") {
            Some(Value::Object(servers)) if !servers.is_empty() => servers.clone(),
            Some(Value::Object(_)) | Some(Value::Null) | None => {
                findings.push(
                    Finding::info("No MCP servers configured").with_suggestion(
                        "Add MCP servers to mcpServers section for enhanced functionality",
                    ),
                );
                return findings;
            }
            Some(_) => {
                findings.push(
                    Finding::error("'mcpServers' must be an object").with_file(&file),
                );
                return findings;
            }
        };

        for (name, config) in &servers {
            self.check_server(name, config, &file, &mut findings);
        }

        self.servers = servers;
        self.source_file = Some(file);
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;
    use std::fs;
    use tempfile::TempDir;

    fn write_mcp(dir: &TempDir, content: &str) {
        fs::write(dir.path().join(".mcp.json"), content).unwrap();
    }

    #[test]
    fn test_no_configuration() {
        let temp = TempDir::new().unwrap();
        let findings = McpValidator::new(temp.path()).validate();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Severity::Warning);
    }

    #[test]
    fn test_empty_servers_is_info() {
        let temp = TempDir::new().unwrap();
        write_mcp(&temp, r#"{"mcpServers": {}}"#);
        let findings = McpValidator::new(temp.path()).validate();
        assert_eq!(findings[0].message, "No MCP servers configured");
    }

    #[test]
    fn test_prefers_mcp_json_over_settings() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".claude")).unwrap();
        fs::write(temp.path().join(".claude/settings.json"), r#"{"mcpServers": {"a": {}}}"#)
            .unwrap();
        write_mcp(&temp, r#"{"mcpServers": {"b": {"command": "sh", "args": []}}}"#);

        let mut validator = McpValidator::new(temp.path());
        validator.validate();
        assert_eq!(validator.server_names(), vec!["b".to_string()]);
        assert_eq!(validator.source_file(), Some(temp.path().join(".mcp.json").as_path()));
        assert!(validator.server_config("b").is_some());
    }

    #[test]
    fn test_structural_errors() {
        let temp = TempDir::new().unwrap();
        write_mcp(
            &temp,
            r#"{"mcpServers": {
                "nocmd": {"args": []},
                "badcmd": {"command": 42},
                "badargs": {"command": "sh", "args": "x"},
                "badenv": {"command": "sh", "env": []},
                "legacy": {"command": "sh", "url": "http://localhost"},
                "missing": {"command": "/definitely/not/here/server"}
            }}"#,
        );
        let findings = McpValidator::new(temp.path()).validate();
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();

        assert!(messages.contains(&"MCP server 'nocmd' missing required field: command"));
        assert!(messages.contains(&"MCP server 'badcmd' command must be a string"));
        assert!(messages.contains(&"MCP server 'badargs' args must be a list"));
        assert!(messages.contains(&"MCP server 'badenv' env must be an object"));
        assert!(messages.contains(&"MCP server 'legacy' uses deprecated 'url' field"));
        assert!(messages.contains(&"MCP server 'missing' command not found: /definitely/not/here/server"));
    }

    #[test]
    fn test_command_not_on_path_is_warning() {
        let temp = TempDir::new().unwrap();
        write_mcp(&temp, r#"{"mcpServers": {"x": {"command": "ccsetup-no-such-binary-xyz", "args": []}}}"#);
        let findings = McpValidator::new(temp.path()).validate();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, Severity::Warning);
    }

    #[test]
    fn test_invalid_json() {
        let temp = TempDir::new().unwrap();
        write_mcp(&temp, "{ nope");
        let findings = McpValidator::new(temp.path()).validate();
        assert!(findings[0].message.starts_with("Invalid JSON in configuration file"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_server_start_outcomes() {
        let temp = TempDir::new().unwrap();
        write_mcp(
            &temp,
            r#"{"mcpServers": {
                "ok": {"command": "sh", "args": ["-c", "exit 0"]},
                "fails": {"command": "sh", "args": ["-c", "echo broken >&2; exit 3"]},
                "slow": {"command": "sh", "args": ["-c", "sleep 5"]},
                "absent": {"command": "ccsetup-no-such-binary-xyz"}
            }}"#,
        );
        let mut validator = McpValidator::new(temp.path());
        validator.validate();
        let findings = validator.probe_servers(Duration::from_millis(500)).await;
        let by_prefix = |p: &str| findings.iter().find(|f| f.message.starts_with(p)).unwrap();

        assert_eq!(by_prefix("MCP server 'ok'").level, Severity::Info);
        let fails = by_prefix("MCP server 'fails'");
        assert_eq!(fails.level, Severity::Warning);
        assert!(fails.message.contains("broken"));
        assert!(by_prefix("MCP server 'slow'").message.contains("timeout reached"));
        assert_eq!(by_prefix("MCP server 'absent'").level, Severity::Error);
    }
}
