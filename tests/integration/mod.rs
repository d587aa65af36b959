//! Integration test suite for ccsetup
//!
//! End-to-end tests that drive the `ccsetup` binary against temporary project
//! directories. They run quickly and are executed in CI on every commit.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **validate**: `validate` command, text and JSON output, strict mode
//! - **health**: `health` and `fix` commands
//! - **templates**: `templates check` over a template tree
//! - **backup**: backup create, list, restore, cleanup, export and import
//! - **setup**: project scaffolding
//! - **upgrade**: version detection, upgrades and rollback
//! - **diff_merge**: `diff` and `merge` commands
//! - **personas**: persona listing, suggestions and activation
//! - **tool_config**: tool configuration loading

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod backup;
mod diff_merge;
mod health;
mod personas;
mod setup;
mod templates;
mod tool_config;
mod upgrade;
mod validate;
