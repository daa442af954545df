//! Supabase Repository Integration Tests
//!
//! Runs the repository against a mock PostgREST server.

use axum::http::StatusCode;
use records_api::{
    config::SupabaseConfig,
    data::{ClientHandle, RecordStore, SupabaseRecordsRepository},
    error::AppError,
    models::{ListParams, RecordCreate, RecordUpdate, SortDirection, SortField},
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE_PATH: &str = "/rest/v1/records";

fn supabase_config(server: &MockServer) -> SupabaseConfig {
    SupabaseConfig {
        url: Some(server.uri()),
        service_role_key: Some("service-key".to_string()),
        ..Default::default()
    }
}

fn repository(config: SupabaseConfig) -> SupabaseRecordsRepository {
    SupabaseRecordsRepository::new(Arc::new(ClientHandle::new(config)))
}

#[tokio::test]
async fn test_list_sends_postgrest_query_and_reads_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(header("accept-profile", "public"))
        .and(header("prefer", "count=exact"))
        .and(query_param("select", "*"))
        .and(query_param("title", "eq.Beans"))
        .and(query_param("order", "title.asc"))
        .and(query_param("offset", "10"))
        .and(query_param("limit", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "10-11/12")
                .set_body_json(json!([
                    {
                        "id": 11,
                        "title": "Beans",
                        "description": null,
                        "created_at": "2024-01-01T00:00:00Z"
                    },
                    {
                        "id": 12,
                        "title": "Beans",
                        "description": "decaf",
                        "created_at": "2024-01-02T00:00:00Z"
                    }
                ])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut params = ListParams {
        page: 2,
        page_size: 10,
        sort_by: SortField::Title,
        sort_dir: SortDirection::Asc,
        ..Default::default()
    };
    params.filters.insert(SortField::Title, "Beans".to_string());

    let (items, total) = repository(supabase_config(&server)).list(&params).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "11");
    assert_eq!(items[1].description.as_deref(), Some("decaf"));
    assert_eq!(total, 12);
}

#[tokio::test]
async fn test_list_estimates_total_without_content_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a", "title": "only" }
        ])))
        .mount(&server)
        .await;

    let (items, total) = repository(supabase_config(&server))
        .list(&ListParams::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(total, 1);
}

#[tokio::test]
async fn test_get_missing_record_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.42"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = repository(supabase_config(&server)).get("42").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(err.to_string(), "Record with id '42' not found");
}

#[tokio::test]
async fn test_create_returns_inserted_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("content-profile", "public"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "title": "New" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "id": 7, "title": "New", "description": null, "created_at": "2024-03-01T00:00:00Z" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let created = repository(supabase_config(&server))
        .create(&RecordCreate {
            title: "New".to_string(),
            description: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "7");
    assert_eq!(created.created_at.as_deref(), Some("2024-03-01T00:00:00Z"));
}

#[tokio::test]
async fn test_update_sends_only_provided_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.3"))
        .and(body_json(json!({ "description": "changed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "title": "Kept", "description": "changed" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let changes = RecordUpdate {
        description: Some("changed".to_string()),
        ..Default::default()
    };
    let updated = repository(supabase_config(&server))
        .update("3", &changes)
        .await
        .unwrap();
    assert_eq!(updated.title, "Kept");
    assert_eq!(updated.description.as_deref(), Some("changed"));
}

#[tokio::test]
async fn test_delete_reports_missing_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "title": "gone" }])),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo = repository(supabase_config(&server));
    assert!(repo.delete("1").await.unwrap());
    assert!(matches!(repo.delete("2").await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_upstream_failure_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = repository(supabase_config(&server))
        .list(&ListParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(err.code(), "supabase_query_error");
    assert_eq!(err.public_message(), "Failed to fetch records");
}

#[tokio::test]
async fn test_anon_key_used_without_service_role_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/notes"))
        .and(header("apikey", "anon-key"))
        .and(header("accept-profile", "private"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = SupabaseConfig {
        url: Some(server.uri()),
        anon_key: Some("anon-key".to_string()),
        schema: "private".to_string(),
        table: "notes".to_string(),
        ..Default::default()
    };

    let (items, total) = repository(config).list(&ListParams::default()).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_unconfigured_client_is_config_error() {
    let repo = repository(SupabaseConfig::default());
    let err = repo.get("1").await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}
