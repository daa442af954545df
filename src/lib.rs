//! Records API Library
//!
//! A small CRUD service over a Supabase-hosted `records` table, with
//! request metrics that use a Prometheus registry when one is available and
//! fall back to in-process JSON aggregates otherwise.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod shutdown;

pub use config::Config;
pub use metrics::Metrics;
pub use shutdown::ShutdownCoordinator;

/// Common error type for startup and server plumbing
pub type Result<T> = anyhow::Result<T>;
