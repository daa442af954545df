//! Records Repository
//!
//! Translates list parameters and record mutations into PostgREST requests.

use super::client::ClientHandle;
use crate::error::{AppError, AppResult};
use crate::models::{ListParams, Record, RecordCreate, RecordUpdate};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error};

const QUERY_ERROR: &str = "supabase_query_error";
const MUTATION_ERROR: &str = "supabase_mutation_error";

/// Storage for records, as seen by the HTTP handlers
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// One page of records plus the total number of matching rows
    async fn list(&self, params: &ListParams) -> AppResult<(Vec<Record>, u64)>;

    async fn get(&self, id: &str) -> AppResult<Record>;

    async fn create(&self, record: &RecordCreate) -> AppResult<Record>;

    async fn update(&self, id: &str, changes: &RecordUpdate) -> AppResult<Record>;

    /// `Ok(true)` when a row was deleted; a missing row is `NotFound`
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

/// `RecordStore` backed by a Supabase table
pub struct SupabaseRecordsRepository {
    handle: Arc<ClientHandle>,
    table: String,
}

impl SupabaseRecordsRepository {
    pub fn new(handle: Arc<ClientHandle>) -> Self {
        let table = handle.config().table.clone();
        Self { handle, table }
    }

    fn request(&self, method: Method) -> AppResult<RequestBuilder> {
        Ok(self.handle.get()?.request(method, &self.table))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        code: &'static str,
        failure: &'static str,
    ) -> AppResult<Response> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, table = %self.table, "{}", failure);
            AppError::upstream(code, failure)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, table = %self.table, "{}", failure);
            return Err(AppError::upstream(code, failure));
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        code: &'static str,
        failure: &'static str,
    ) -> AppResult<T> {
        response.json::<T>().await.map_err(|e| {
            error!(error = %e, table = %self.table, "Unexpected response body: {}", failure);
            AppError::upstream(code, failure)
        })
    }
}

#[async_trait]
impl RecordStore for SupabaseRecordsRepository {
    async fn list(&self, params: &ListParams) -> AppResult<(Vec<Record>, u64)> {
        let failure = "Failed to fetch records";
        let request = self
            .request(Method::GET)?
            .query(&list_query(params))
            .header("Prefer", "count=exact");

        let response = self.send(request, QUERY_ERROR, failure).await?;
        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        let items: Vec<Record> = self.decode(response, QUERY_ERROR, failure).await?;
        let total = total.unwrap_or_else(|| estimate_total(params, items.len()));

        debug!(page = params.page, items = items.len(), total = total, "Listed records");
        Ok((items, total))
    }

    async fn get(&self, id: &str) -> AppResult<Record> {
        let failure = "Failed to fetch record";
        let request = self.request(Method::GET)?.query(&[
            ("select", "*".to_string()),
            ("id", format!("eq.{}", id)),
            ("limit", "1".to_string()),
        ]);

        let response = self.send(request, QUERY_ERROR, failure).await?;
        let rows: Vec<Record> = self.decode(response, QUERY_ERROR, failure).await?;
        rows.into_iter().next().ok_or_else(|| not_found(id))
    }

    async fn create(&self, record: &RecordCreate) -> AppResult<Record> {
        let failure = "Failed to create record";
        let request = self
            .request(Method::POST)?
            .query(&[("select", "*")])
            .header("Prefer", "return=representation")
            .json(record);

        let response = self.send(request, MUTATION_ERROR, failure).await?;
        let rows: Vec<Record> = self.decode(response, MUTATION_ERROR, failure).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::upstream("record_create_failed", failure))
    }

    async fn update(&self, id: &str, changes: &RecordUpdate) -> AppResult<Record> {
        let failure = "Failed to update record";
        let request = self
            .request(Method::PATCH)?
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(changes);

        let response = self.send(request, MUTATION_ERROR, failure).await?;
        let rows: Vec<Record> = self.decode(response, MUTATION_ERROR, failure).await?;
        rows.into_iter().next().ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let failure = "Failed to delete record";
        let request = self
            .request(Method::DELETE)?
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");

        let response = self.send(request, MUTATION_ERROR, failure).await?;
        let rows: Vec<serde_json::Value> = self.decode(response, MUTATION_ERROR, failure).await?;
        if rows.is_empty() {
            return Err(not_found(id));
        }
        Ok(true)
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Record with id '{}' not found", id))
}

/// PostgREST query string for one page of records
pub fn list_query(params: &ListParams) -> Vec<(String, String)> {
    let mut query = vec![("select".to_string(), "*".to_string())];

    for (field, value) in &params.filters {
        query.push((field.as_str().to_string(), format!("eq.{}", value)));
    }

    if let Some(q) = &params.q {
        let pattern = quote_value(&format!("*{}*", q));
        query.push((
            "or".to_string(),
            format!("(title.ilike.{0},description.ilike.{0})", pattern),
        ));
    }

    query.push((
        "order".to_string(),
        format!("{}.{}", params.sort_by.as_str(), params.sort_dir.as_str()),
    ));

    let (from, _) = params.range();
    query.push(("offset".to_string(), from.to_string()));
    query.push(("limit".to_string(), params.page_size.to_string()));
    query
}

// PostgREST reserves `,.:()` inside logical filters; double quotes protect them.
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Total row count from a `Content-Range` header such as `0-19/57` or `*/0`
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

/// Best guess at the total when the server does not report one
fn estimate_total(params: &ListParams, page_len: usize) -> u64 {
    if params.page == 1 {
        page_len as u64
    } else {
        u64::from(params.page) * u64::from(params.page_size) + u64::from(page_len > 0)
    }
}
