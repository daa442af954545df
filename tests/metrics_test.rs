//! Metrics Aggregator Integration Tests

use records_api::config::MetricsConfig;
use records_api::metrics::{
    BackendMode, MetricKey, MetricName, MetricsBackend, MetricsError, Metrics, RecordOutcome,
};
use std::sync::Arc;
use std::thread;

fn key(name: MetricName, route: &str, method: &str, status: &str) -> MetricKey {
    MetricKey::new(name, route, method, status)
}

#[test]
fn test_fallback_counter_accumulates() {
    let metrics = Metrics::fallback_only();

    metrics.increment_requests("/items", "GET", "200", 1.0);
    metrics.increment_requests("/items", "GET", "200", 1.0);
    metrics.increment_requests("/items", "GET", "200", 1.0);

    let snapshot = metrics.snapshot();
    assert_eq!(
        snapshot.counter(&key(MetricName::RequestsTotal, "/items", "GET", "200")),
        Some(3.0)
    );
    assert_eq!(
        snapshot.counters.get("requests_total{/items,GET,200}").copied(),
        Some(3.0)
    );
}

#[test]
fn test_fallback_histogram_aggregates() {
    let metrics = Metrics::fallback_only();

    for sample in [0.5, 0.1, 0.9] {
        metrics.observe_latency("/items", "POST", "201", sample);
    }

    let aggregate = metrics
        .snapshot()
        .histogram(&key(MetricName::RequestLatencySeconds, "/items", "POST", "201"))
        .unwrap();
    assert_eq!(aggregate.count, 3.0);
    assert!((aggregate.sum - 1.5).abs() < 1e-9);
    assert_eq!(aggregate.min, 0.1);
    assert_eq!(aggregate.max, 0.9);
    assert!((aggregate.mean() - 0.5).abs() < 1e-9);
}

#[test]
fn test_label_tuples_are_independent_series() {
    let metrics = Metrics::fallback_only();

    metrics.increment_errors("/items", "GET", "404", 1.0);
    metrics.increment_errors("/items", "GET", "500", 1.0);
    metrics.increment_errors("/items", "POST", "500", 2.0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.counters.len(), 3);
    assert_eq!(
        snapshot.counters.get("errors_total{/items,POST,500}").copied(),
        Some(2.0)
    );
}

#[test]
fn test_method_labels_are_upper_cased() {
    let metrics = Metrics::fallback_only();

    metrics.increment_requests("/items", "get", "200", 1.0);
    metrics.increment_requests("/items", "GET", "200", 1.0);

    assert_eq!(
        metrics
            .snapshot()
            .counters
            .get("requests_total{/items,GET,200}")
            .copied(),
        Some(2.0)
    );
}

#[test]
fn test_invalid_counter_amounts_are_dropped() {
    let metrics = Metrics::fallback_only();

    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", -1.0),
        RecordOutcome::Dropped
    );
    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", f64::NAN),
        RecordOutcome::Dropped
    );
    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", 0.0),
        RecordOutcome::Fallback
    );

    assert_eq!(
        metrics
            .snapshot()
            .counters
            .get("requests_total{/items,GET,200}")
            .copied(),
        Some(0.0)
    );
}

#[test]
fn test_empty_fallback_exposition() {
    let metrics = Metrics::fallback_only();
    let exposition = metrics.render_exposition();

    assert!(exposition.is_json());
    assert_eq!(exposition.content_type, "application/json");

    let body: serde_json::Value = serde_json::from_slice(&exposition.body).unwrap();
    assert_eq!(body["counters"], serde_json::json!({}));
    assert_eq!(body["histograms"], serde_json::json!({}));
    assert!(body["generated_at"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    const THREADS: usize = 8;
    const INCREMENTS: usize = 1_000;

    let metrics = Arc::new(Metrics::fallback_only());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let metrics = Arc::clone(&metrics);
            thread::spawn(move || {
                for i in 0..INCREMENTS {
                    metrics.increment_requests("/items", "GET", "200", 1.0);
                    metrics.observe_latency("/items", "GET", "200", (i % 10) as f64 / 100.0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = metrics.snapshot();
    let expected = (THREADS * INCREMENTS) as f64;
    assert_eq!(
        snapshot.counters.get("requests_total{/items,GET,200}").copied(),
        Some(expected)
    );

    let aggregate = snapshot
        .histograms
        .get("request_latency_seconds{/items,GET,200}")
        .copied()
        .unwrap();
    assert_eq!(aggregate.count, expected);
    assert_eq!(aggregate.min, 0.0);
    assert_eq!(aggregate.max, 0.09);
}

#[test]
fn test_disabled_native_backend_uses_fallback() {
    let metrics = Metrics::with_config(&MetricsConfig {
        native_backend: false,
    });

    assert!(!metrics.is_native_backend_available());
    assert_eq!(metrics.mode(), BackendMode::Fallback);
    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", 1.0),
        RecordOutcome::Fallback
    );
}

/// Native backend whose every call fails
struct UnavailableBackend;

impl MetricsBackend for UnavailableBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Native
    }

    fn inc_counter(&self, _key: &MetricKey, _amount: f64) -> Result<(), MetricsError> {
        Err(MetricsError::Unavailable("registry gone".to_string()))
    }

    fn observe(&self, _key: &MetricKey, _value: f64) -> Result<(), MetricsError> {
        Err(MetricsError::Unavailable("registry gone".to_string()))
    }

    fn render(&self) -> Result<records_api::metrics::Exposition, MetricsError> {
        Err(MetricsError::Unavailable("registry gone".to_string()))
    }
}

#[test]
fn test_native_failures_fall_through_to_json() {
    let metrics = Metrics::with_backend(Box::new(UnavailableBackend));
    assert_eq!(metrics.mode(), BackendMode::Native);

    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", 1.0),
        RecordOutcome::Fallback
    );
    assert_eq!(
        metrics.observe_latency("/items", "GET", "200", 0.2),
        RecordOutcome::Fallback
    );

    let exposition = metrics.render_exposition();
    assert!(exposition.is_json());
    let body: serde_json::Value = serde_json::from_slice(&exposition.body).unwrap();
    assert_eq!(body["counters"]["requests_total{/items,GET,200}"], 1.0);
}

#[cfg(feature = "native-metrics")]
#[test]
fn test_native_mode_renders_prometheus_text() {
    let metrics = Metrics::new();
    assert!(metrics.is_native_backend_available());

    assert_eq!(
        metrics.increment_requests("/items", "GET", "200", 1.0),
        RecordOutcome::Native
    );
    metrics.observe_latency("/items", "GET", "200", 0.05);

    let exposition = metrics.render_exposition();
    assert!(!exposition.is_json());
    assert!(exposition.content_type.starts_with("text/plain"));

    let text = String::from_utf8(exposition.body.to_vec()).unwrap();
    assert!(text.contains("# TYPE requests_total counter"));
    assert!(text.contains(r#"requests_total{method="GET",route="/items",status="200"} 1"#));
    assert!(text.contains("# TYPE request_latency_seconds histogram"));

    // Native mode leaves the in-memory store untouched
    assert!(metrics.snapshot().counters.is_empty());
}
