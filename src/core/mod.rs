//! Core types shared by every ccsetup command.
//!
//! At the moment this is the error layer: [`CcsetupError`] for typed failures and
//! [`ErrorContext`] / [`user_friendly_error`] for turning them into terminal output.

pub mod error;

pub use error::{CcsetupError, ErrorContext, user_friendly_error};
