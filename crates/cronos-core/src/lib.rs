//! `cronos-core`: configuration, error type and identifiers shared by the
//! Cronos alarm engine and its command-line shell.

pub mod config;
pub mod error;
pub mod types;

pub use config::CronosConfig;
pub use error::{CronosError, Result};
pub use types::AlarmId;
