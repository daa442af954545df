//! Configuration Module
//!
//! Handles configuration loading, validation, and management.

pub mod manager;
pub mod types;

pub use manager::{normalize_log_level, parse_cors_origins, ConfigManager, ConfigSource};
pub use types::*;
