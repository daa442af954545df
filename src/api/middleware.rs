//! Request Metrics Middleware

use crate::metrics::Metrics;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Route label for requests that matched no route
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Record count, latency and (for 4xx/5xx) errors of every completed request.
///
/// The route label is the matched template (`/records/:id`), never the raw
/// path, so label cardinality stays bounded.
pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let method = request.method().as_str().to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status();
    let status_label = status.as_u16().to_string();

    metrics.increment_requests(&route, &method, &status_label, 1.0);
    metrics.observe_latency(&route, &method, &status_label, elapsed);
    if status.is_client_error() || status.is_server_error() {
        metrics.increment_errors(&route, &method, &status_label, 1.0);
    }

    response
}
