//! Tool configuration for ccsetup.
//!
//! Settings that tune the validators and the migration tools live in a single TOML file,
//! `~/.ccsetup/config.toml` by default. See [`ToolConfig`] for the keys and their defaults.

mod tool;

pub use tool::{CONFIG_PATH_ENV, ToolConfig};
