//! In-memory Metrics Store
//!
//! Used when the native backend is unavailable, and as the landing spot for
//! observations the native backend failed to record.

use super::backend::{MetricsBackend, MetricsError};
use super::types::{
    BackendMode, Exposition, FallbackSnapshot, HistogramAggregate, MetricKey, JSON_CONTENT_TYPE,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

/// Body served if the snapshot itself cannot be serialized
const EMPTY_JSON_EXPOSITION: &str = r#"{"counters":{},"histograms":{},"generated_at":0.0}"#;

#[derive(Debug, Default)]
struct Series {
    counters: HashMap<MetricKey, f64>,
    histograms: HashMap<MetricKey, HistogramAggregate>,
}

/// Counters and histogram aggregates behind a single lock
#[derive(Debug, Default)]
pub struct FallbackStore {
    series: Mutex<Series>,
}

impl FallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoned locks are recovered; every value stays a valid number.
    fn lock(&self) -> MutexGuard<'_, Series> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, key: &MetricKey, amount: f64) {
        let mut series = self.lock();
        *series.counters.entry(key.clone()).or_insert(0.0) += amount;
    }

    pub fn record(&self, key: &MetricKey, value: f64) {
        let mut series = self.lock();
        series
            .histograms
            .entry(key.clone())
            .and_modify(|agg| agg.observe(value))
            .or_insert_with(|| HistogramAggregate::first(value));
    }

    /// Copy the current state out from under the lock
    pub fn snapshot(&self) -> FallbackSnapshot {
        let series = self.lock();
        FallbackSnapshot {
            counters: series
                .counters
                .iter()
                .map(|(key, value)| (key.compose(), *value))
                .collect(),
            histograms: series
                .histograms
                .iter()
                .map(|(key, agg)| (key.compose(), *agg))
                .collect(),
            generated_at: unix_now(),
        }
    }

    pub fn series_count(&self) -> usize {
        let series = self.lock();
        series.counters.len() + series.histograms.len()
    }

    /// Render the JSON exposition. Cannot fail.
    pub fn render_json(&self) -> Exposition {
        let snapshot = self.snapshot();
        match serde_json::to_vec(&snapshot) {
            Ok(body) => Exposition::new(JSON_CONTENT_TYPE, body),
            Err(e) => {
                error!(error = %e, "Failed to serialize metrics snapshot");
                Exposition::new(JSON_CONTENT_TYPE, EMPTY_JSON_EXPOSITION)
            }
        }
    }
}

impl MetricsBackend for FallbackStore {
    fn mode(&self) -> BackendMode {
        BackendMode::Fallback
    }

    fn inc_counter(&self, key: &MetricKey, amount: f64) -> Result<(), MetricsError> {
        self.add(key, amount);
        Ok(())
    }

    fn observe(&self, key: &MetricKey, value: f64) -> Result<(), MetricsError> {
        self.record(key, value);
        Ok(())
    }

    fn render(&self) -> Result<Exposition, MetricsError> {
        Ok(self.render_json())
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
