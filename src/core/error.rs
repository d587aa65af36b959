//! Error handling for ccsetup
//!
//! This module provides the error types and user-facing error reporting used by every
//! ccsetup command. Two layers cooperate:
//! 1. **Strongly-typed errors** ([`CcsetupError`]) for operational failures that code can
//!    match on, such as a missing backup or an unparsable settings file
//! 2. **User-friendly messages** ([`ErrorContext`]) that add details and an actionable
//!    suggestion before the error reaches the terminal
//!
//! Validation findings are *not* errors. A validator that discovers a broken `.mcp.json`
//! records a [`Finding`](crate::validation::Finding) and keeps going; only failures that
//! prevent a command from doing its job surface as [`CcsetupError`].
//!
//! # Error Conversion
//!
//! Common library errors convert automatically:
//! - [`std::io::Error`] → [`CcsetupError::IoError`]
//! - [`serde_json::Error`] → [`CcsetupError::JsonError`]
//! - [`toml::de::Error`] → [`CcsetupError::TomlError`]
//! - [`semver::Error`] → [`CcsetupError::SemverError`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use ccsetup_cli::core::{CcsetupError, user_friendly_error};
//!
//! let err = anyhow::Error::from(CcsetupError::BackupNotFound {
//!     name: "backup_20240101_120000".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Operational failures raised by ccsetup commands.
#[derive(Error, Debug)]
pub enum CcsetupError {
    /// The configuration directory passed on the command line does not exist
    #[error("Configuration directory not found: {path}")]
    ConfigDirNotFound {
        /// Directory that was expected to exist
        path: String,
    },

    /// A file system operation failed
    #[error("File system error during {operation}: {path}")]
    FileSystemError {
        /// The operation being performed (e.g. "read", "write", "extract")
        operation: String,
        /// The path involved
        path: String,
    },

    /// Insufficient permissions for a file operation
    #[error("Permission denied: {operation} on {path}")]
    PermissionDenied {
        /// The operation that was denied
        operation: String,
        /// The path involved
        path: String,
    },

    /// A JSON configuration file could not be parsed
    #[error("Invalid JSON in {file}: {reason}")]
    InvalidJson {
        /// File that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// A YAML file referenced from CLAUDE.md could not be parsed
    #[error("Invalid YAML in {file}: {reason}")]
    InvalidYaml {
        /// File that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// No backup with the given name exists
    #[error("Backup not found: {name}")]
    BackupNotFound {
        /// Requested backup name
        name: String,
    },

    /// A file claimed to be a backup archive but is not readable as one
    #[error("Invalid backup archive {path}: {reason}")]
    InvalidBackup {
        /// Archive path
        path: String,
        /// Why the archive was rejected
        reason: String,
    },

    /// Restore was requested without confirmation
    #[error("Restore of '{name}' requires confirmation")]
    RestoreNotConfirmed {
        /// Backup that would have been restored
        name: String,
    },

    /// A version string is not `MAJOR.MINOR.PATCH[-pre][+build]`
    #[error("Invalid version: {version}")]
    InvalidVersion {
        /// The rejected input
        version: String,
    },

    /// A framework name that has no scaffolding
    #[error("Unknown framework: {name}")]
    UnknownFramework {
        /// The rejected name
        name: String,
    },

    /// A persona id or name that is not in the catalogue
    #[error("Unknown persona: {name}")]
    UnknownPersona {
        /// The rejected name
        name: String,
    },

    /// Validation produced blocking findings
    #[error("Validation failed with {errors} error(s)")]
    ValidationFailed {
        /// Number of error-level findings
        errors: usize,
    },

    /// An upgrade could not be completed
    #[error("Upgrade failed: {reason}")]
    UpgradeFailed {
        /// Underlying reason
        reason: String,
    },

    /// Tool configuration is invalid
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Semver parsing error
    #[error("Semver parsing error: {0}")]
    SemverError(#[from] semver::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for CcsetupError {
    fn clone(&self) -> Self {
        match self {
            Self::ConfigDirNotFound {
                path,
            } => Self::ConfigDirNotFound {
                path: path.clone(),
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::PermissionDenied {
                operation,
                path,
            } => Self::PermissionDenied {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::InvalidJson {
                file,
                reason,
            } => Self::InvalidJson {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::InvalidYaml {
                file,
                reason,
            } => Self::InvalidYaml {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::BackupNotFound {
                name,
            } => Self::BackupNotFound {
                name: name.clone(),
            },
            Self::InvalidBackup {
                path,
                reason,
            } => Self::InvalidBackup {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::RestoreNotConfirmed {
                name,
            } => Self::RestoreNotConfirmed {
                name: name.clone(),
            },
            Self::InvalidVersion {
                version,
            } => Self::InvalidVersion {
                version: version.clone(),
            },
            Self::UnknownFramework {
                name,
            } => Self::UnknownFramework {
                name: name.clone(),
            },
            Self::UnknownPersona {
                name,
            } => Self::UnknownPersona {
                name: name.clone(),
            },
            Self::ValidationFailed {
                errors,
            } => Self::ValidationFailed {
                errors: *errors,
            },
            Self::UpgradeFailed {
                reason,
            } => Self::UpgradeFailed {
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::SemverError(e) => Self::Other {
                message: format!("Semver parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// A [`CcsetupError`] decorated with details and a suggestion for the terminal.
///
/// Built by [`user_friendly_error`] at the top of `main`, or by hand when a command
/// knows more about the failure than the error variant does.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: CcsetupError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CcsetupError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: the error in red, details in yellow and the
    /// suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
///
/// Known [`CcsetupError`] variants and common I/O error kinds get tailored advice.
/// Everything else keeps its message and the full "Caused by:" chain so nothing is
/// lost on the way to the terminal.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    if let Some(ccsetup_error) = error.downcast_ref::<CcsetupError>() {
        return create_error_context(ccsetup_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(CcsetupError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions of the configuration directory")
                .with_details("ccsetup could not read or write one of the configuration files");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(CcsetupError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct")
                .with_details("A required file or directory could not be found");
            }
            _ => {}
        }
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(CcsetupError::InvalidJson {
            file: "unknown".to_string(),
            reason: json_error.to_string(),
        })
        .with_suggestion("Fix the JSON syntax; trailing commas and unquoted keys are the usual culprits")
        .with_details("Run 'ccsetup fix' to reformat JSON configuration files automatically");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(CcsetupError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in ~/.ccsetup/config.toml (or the file given with --config)");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();

    let chain: Vec<String> = error
        .chain()
        .skip(1) // Skip the root cause which is already in to_string()
        .map(std::string::ToString::to_string)
        .collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(CcsetupError::Other {
        message,
    })
}

/// Map each [`CcsetupError`] variant to a context with tailored advice.
fn create_error_context(error: CcsetupError) -> ErrorContext {
    match &error {
        CcsetupError::ConfigDirNotFound { path } => {
            let suggestion = format!(
                "Check the path '{path}' or run 'ccsetup setup --output-dir {path}' to create a configuration"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        CcsetupError::InvalidJson { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'ccsetup fix' to reformat the file, or fix the syntax by hand")
            .with_details("JSON does not allow trailing commas, comments or single-quoted strings"),
        CcsetupError::InvalidYaml { .. } => ErrorContext::new(error)
            .with_suggestion("Check indentation and quoting in the referenced YAML file"),
        CcsetupError::BackupNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'ccsetup backup list' to see available backups"),
        CcsetupError::InvalidBackup { .. } => ErrorContext::new(error)
            .with_suggestion("Only zip archives created by 'ccsetup backup create' can be restored or imported")
            .with_details("Every backup archive contains a backup_metadata.json entry"),
        CcsetupError::RestoreNotConfirmed { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run the command with --yes to confirm the restore")
            .with_details("Restoring overwrites current configuration files; a safety backup is taken first"),
        CcsetupError::InvalidVersion { .. } => ErrorContext::new(error)
            .with_suggestion("Use semantic versioning, for example 2.0.1 or 2.1.0-beta.1"),
        CcsetupError::UnknownFramework { .. } => ErrorContext::new(error).with_suggestion(
            "Available frameworks: core, fastapi, django, flask, data-science, cli-tool, web-scraping",
        ),
        CcsetupError::UnknownPersona { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'ccsetup personas list' to see available personas"),
        CcsetupError::ValidationFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'ccsetup fix --dry-run' to see which issues can be fixed automatically"),
        CcsetupError::UpgradeFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Use 'ccsetup rollback <backup>' to restore the pre-upgrade state")
            .with_details("A backup is taken before every upgrade unless --no-backup was given"),
        CcsetupError::PermissionDenied { .. } => ErrorContext::new(error)
            .with_suggestion("Check file ownership and permissions of the configuration directory"),
        _ => ErrorContext::new(error),
    }
}
