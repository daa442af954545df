//! API Response Types

use crate::metrics::BackendMode;
use serde::Serialize;

/// Body of `GET /`
#[derive(Debug, Serialize)]
pub struct RootHealth {
    pub message: &'static str,
}

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: f64,
    pub message: &'static str,
}

/// Body of `GET /metrics/info`
#[derive(Debug, Serialize)]
pub struct MetricsInfo {
    pub message: String,
    pub native_backend_available: bool,
    pub mode: BackendMode,
}
