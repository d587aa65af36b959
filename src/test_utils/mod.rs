//! Test utilities for ccsetup
//!
//! Helpers for writing configuration trees into temporary directories and for
//! turning on logging inside tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use ccsetup_cli::test_utils::{ConfigTreeBuilder, fixtures};
//!
//! let tree = ConfigTreeBuilder::new()
//!     .unwrap()
//!     .with_claude_md(fixtures::COMPLETE_CLAUDE_MD)
//!     .with_settings(fixtures::SETTINGS_JSON)
//!     .build()
//!     .unwrap();
//! assert!(tree.path().join("CLAUDE.md").exists());
//! ```

pub mod builder;
pub mod fixtures;

pub use builder::{ConfigTree, ConfigTreeBuilder};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with neither set
/// logging stays off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
