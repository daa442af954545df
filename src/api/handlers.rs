//! API Handlers

use super::types::*;
use crate::data::RecordStore;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::models::{
    DeleteResponse, ListParams, PageMeta, PaginatedRecords, Record, RecordCreate, RecordUpdate,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub store: Arc<dyn RecordStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            metrics,
            store,
            start_time: Instant::now(),
        }
    }
}

/// `GET /`
pub async fn root() -> Json<RootHealth> {
    info!("Health check requested");
    Json(RootHealth { message: "Healthy" })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs_f64(),
        message: "Healthy",
    })
}

/// `GET /metrics`
pub async fn metrics_exposition(State(state): State<AppState>) -> Response {
    let exposition = state.metrics.render_exposition();
    (
        [(header::CONTENT_TYPE, exposition.content_type)],
        exposition.body,
    )
        .into_response()
}

/// `GET /metrics/info`
pub async fn metrics_info(State(state): State<AppState>) -> Json<MetricsInfo> {
    let native = state.metrics.is_native_backend_available();
    let message = if native {
        "Metrics are served at /metrics in Prometheus text format"
    } else {
        "Metrics are served at /metrics as JSON aggregates (native backend unavailable)"
    };

    Json(MetricsInfo {
        message: message.to_string(),
        native_backend_available: native,
        mode: state.metrics.mode(),
    })
}

/// `GET /records`
pub async fn list_records(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> AppResult<Json<PaginatedRecords>> {
    let Query(pairs) = query?;
    let params = ListParams::from_pairs(&pairs)?;

    let (items, total) = state.store.list(&params).await?;
    info!(page = params.page, page_size = params.page_size, total = total, "Listed records");

    Ok(Json(PaginatedRecords {
        items,
        meta: PageMeta::new(params.page, params.page_size, total),
    }))
}

/// `GET /records/:id`
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Record>> {
    let record = state.store.get(&id).await?;
    info!(id = %id, "Fetched record");
    Ok(Json(record))
}

/// `POST /records`
pub async fn create_record(
    State(state): State<AppState>,
    payload: Result<Json<RecordCreate>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Record>)> {
    let Json(payload) = payload?;
    let created = state.store.create(&payload).await?;
    info!(id = %created.id, "Created record");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /records/:id`
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecordUpdate>, JsonRejection>,
) -> AppResult<Json<Record>> {
    let Json(changes) = payload?;
    changes.ensure_not_empty()?;

    let updated = state.store.update(&id, &changes).await?;
    info!(id = %id, "Updated record");
    Ok(Json(updated))
}

/// `DELETE /records/:id`
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    let success = state.store.delete(&id).await?;
    info!(id = %id, success = success, "Deleted record");
    Ok(Json(DeleteResponse { success, id }))
}

/// Fallback for paths no route matches
pub async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EmptyStore;

    #[async_trait]
    impl RecordStore for EmptyStore {
        async fn list(&self, _params: &ListParams) -> AppResult<(Vec<Record>, u64)> {
            Ok((Vec::new(), 0))
        }

        async fn get(&self, id: &str) -> AppResult<Record> {
            Err(AppError::NotFound(format!("Record with id '{}' not found", id)))
        }

        async fn create(&self, record: &RecordCreate) -> AppResult<Record> {
            Ok(Record {
                id: "1".to_string(),
                title: record.title.clone(),
                description: record.description.clone(),
                created_at: None,
            })
        }

        async fn update(&self, id: &str, _changes: &RecordUpdate) -> AppResult<Record> {
            self.get(id).await
        }

        async fn delete(&self, id: &str) -> AppResult<bool> {
            self.get(id).await.map(|_| true)
        }
    }

    fn create_test_state() -> AppState {
        AppState::new(Arc::new(Metrics::fallback_only()), Arc::new(EmptyStore))
    }

    #[tokio::test]
    async fn test_health() {
        let response = health(State(create_test_state())).await;
        assert_eq!(response.0.status, "ok");
        assert_eq!(response.0.message, "Healthy");
        assert!(response.0.uptime_seconds >= 0.0);
    }

    #[tokio::test]
    async fn test_metrics_info_reports_fallback() {
        let response = metrics_info(State(create_test_state())).await;
        assert!(!response.0.native_backend_available);
        assert_eq!(response.0.mode, crate::metrics::BackendMode::Fallback);
    }

    #[tokio::test]
    async fn test_list_records_empty_page() {
        let response = list_records(State(create_test_state()), Ok(Query(Vec::new())))
            .await
            .unwrap();
        assert!(response.0.items.is_empty());
        assert_eq!(response.0.meta.total_pages, 1);
    }

    #[tokio::test]
    async fn test_update_without_fields_is_rejected() {
        let err = update_record(
            State(create_test_state()),
            Path("1".to_string()),
            Ok(Json(RecordUpdate::default())),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
