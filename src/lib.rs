//! ccsetup - Claude Code configuration toolkit
//!
//! Validates, repairs, versions and scaffolds the files that configure Claude Code in a
//! project: `CLAUDE.md`, `settings.json` and `.mcp.json`.
//!
//! # Architecture Overview
//!
//! A project's configuration lives in one directory. Every operation takes that
//! directory as its root:
//! - validators inspect it and report [`validation::Finding`]s with a severity
//! - the health checker runs all validators, scores the result and applies fixes
//! - the migration layer stamps a version, takes zip backups and upgrades between
//!   template versions
//! - the setup layer writes a fresh configuration for a chosen framework
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface, one module per subcommand
//! - [`config`] - Tool configuration (`~/.ccsetup/config.toml`)
//! - [`core`] - Error types and user-facing error rendering
//! - [`validation`] - Validators, template tree checks, auto-fix and health scoring
//! - [`migration`] - Versions, backups, diffs, conflict resolution and upgrades
//! - [`personas`] - Persona catalogue, suggestions and the active persona
//! - [`setup`] - Framework catalogue and project scaffolding
//! - [`utils`] - File system and platform helpers
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Check a project and fail CI on errors
//! ccsetup validate --strict
//!
//! # Score the configuration and repair what can be repaired
//! ccsetup health --fix
//!
//! # Check every template below ./templates
//! ccsetup templates check ./templates
//!
//! # Scaffold a FastAPI project for a team
//! ccsetup setup --framework fastapi --mode team
//!
//! # Upgrade to the latest template version with a backup
//! ccsetup upgrade --yes
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod migration;
pub mod personas;
pub mod setup;
pub mod utils;
pub mod validation;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
