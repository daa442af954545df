//! Metrics Types

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Content type of the in-memory JSON exposition
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Label names used by every series, in composition order
pub const LABEL_NAMES: [&str; 3] = ["route", "method", "status"];

/// The three series recorded per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricName {
    RequestsTotal,
    ErrorsTotal,
    RequestLatencySeconds,
}

impl MetricName {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::RequestsTotal => "requests_total",
            MetricName::ErrorsTotal => "errors_total",
            MetricName::RequestLatencySeconds => "request_latency_seconds",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricName::RequestsTotal => "Total number of HTTP requests",
            MetricName::ErrorsTotal => {
                "Total number of HTTP requests that resulted in error responses (4xx/5xx)"
            }
            MetricName::RequestLatencySeconds => "Latency of HTTP requests in seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one series: metric name plus (route, method, status) labels.
///
/// The method is upper-cased on construction so `get` and `GET` land in the
/// same series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: MetricName,
    route: String,
    method: String,
    status: String,
}

impl MetricKey {
    pub fn new(name: MetricName, route: &str, method: &str, status: &str) -> Self {
        Self {
            name,
            route: route.to_string(),
            method: method.to_uppercase(),
            status: status.to_string(),
        }
    }

    pub fn name(&self) -> MetricName {
        self.name
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Label values in `LABEL_NAMES` order
    pub fn label_values(&self) -> [&str; 3] {
        [&self.route, &self.method, &self.status]
    }

    /// Flattened `name{route,method,status}` form used by the JSON exposition.
    ///
    /// Labels are not escaped: a route containing `,`, `{` or `}` can collide
    /// with another series.
    pub fn compose(&self) -> String {
        format!(
            "{}{{{},{},{}}}",
            self.name, self.route, self.method, self.status
        )
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compose())
    }
}

/// Reduced-fidelity histogram: no buckets, only count/sum/extrema
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramAggregate {
    pub count: f64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl HistogramAggregate {
    /// Aggregate holding a single observation
    pub fn first(value: f64) -> Self {
        Self {
            count: 1.0,
            sum: value,
            min: value,
            max: value,
        }
    }

    pub fn observe(&mut self, value: f64) {
        self.count += 1.0;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0.0 {
            0.0
        } else {
            self.sum / self.count
        }
    }
}

/// Which backend the aggregator settled on at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    Native,
    Fallback,
}

impl BackendMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendMode::Native => "native",
            BackendMode::Fallback => "fallback",
        }
    }
}

/// Where a single recording call ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Recorded by the native backend
    Native,
    /// Recorded by the in-memory store, either by mode or after a native failure
    Fallback,
    /// Rejected before reaching any store
    Dropped,
}

/// A rendered metrics payload ready to be served as an HTTP body
#[derive(Debug, Clone)]
pub struct Exposition {
    pub content_type: String,
    pub body: Bytes,
}

impl Exposition {
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.content_type == JSON_CONTENT_TYPE
    }
}

/// Point-in-time copy of the in-memory store, serialized as the JSON exposition
#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackSnapshot {
    pub counters: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramAggregate>,
    pub generated_at: f64,
}

impl FallbackSnapshot {
    pub fn counter(&self, key: &MetricKey) -> Option<f64> {
        self.counters.get(&key.compose()).copied()
    }

    pub fn histogram(&self, key: &MetricKey) -> Option<HistogramAggregate> {
        self.histograms.get(&key.compose()).copied()
    }
}
