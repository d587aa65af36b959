//! Cross-cutting helpers: atomic file I/O, checksums, glob-based discovery and path
//! expansion.

pub mod fs;
pub mod platform;

pub use fs::{atomic_write, calculate_checksum, ensure_dir, read_json_file, write_json_file};
pub use platform::{get_home_dir, resolve_path};
