//! API Routes

use super::{handlers::*, middleware::track_metrics};
use axum::{
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tracing::warn;

/// Records API router
pub struct ApiRouter;

impl ApiRouter {
    /// Create the API router with metrics tracking and CORS applied
    pub fn create_router(state: AppState, cors_allow_origins: &[String]) -> Router {
        let metrics = state.metrics.clone();

        Router::new()
            // Health
            .route("/", get(root))
            .route("/health", get(health))

            // Metrics
            .route("/metrics", get(metrics_exposition))
            .route("/metrics/info", get(metrics_info))

            // Records
            .route("/records", get(list_records).post(create_record))
            .route(
                "/records/:id",
                get(get_record).patch(update_record).delete(delete_record),
            )
            .fallback(route_not_found)
            .with_state(state)
            .layer(middleware::from_fn_with_state(metrics, track_metrics))
            .layer(cors_layer(cors_allow_origins))
    }
}

/// `*` (or an empty list) allows any origin without credentials; an explicit
/// origin list allows credentials and mirrors requested methods and headers.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
