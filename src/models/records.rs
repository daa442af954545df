//! Record Types

use crate::error::{AppError, AppResult, FieldError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A row of the records table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Database ids may be integers or uuids; both are exposed as strings
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Body of `POST /records`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PATCH /records/:id`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RecordUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// Reject updates that carry no fields
    pub fn ensure_not_empty(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::bad_request(
                "validation_error",
                "No fields provided for update",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Columns clients may sort and filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Title,
    CreatedAt,
}

impl SortField {
    pub const ALLOWED: &'static str = "created_at, id, title";

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(SortField::Id),
            "title" => Some(SortField::Title),
            "created_at" => Some(SortField::CreatedAt),
            _ => None,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated parameters of `GET /records`
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub sort_dir: SortDirection,
    pub q: Option<String>,
    /// Equality filters; entries with empty values are dropped
    pub filters: BTreeMap<SortField, String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::CreatedAt,
            sort_dir: SortDirection::Desc,
            q: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ListParams {
    /// Parse raw query pairs, collecting every violation into one error.
    ///
    /// `filters` may repeat; each value has the form `<field>=<value>`.
    /// Unknown parameters are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> AppResult<Self> {
        let mut params = ListParams::default();
        let mut errors = Vec::new();

        for (name, value) in pairs {
            match name.as_str() {
                "page" => match value.trim().parse::<u32>() {
                    Ok(page) if page >= 1 => params.page = page,
                    _ => errors.push(FieldError::new(
                        &["query", "page"],
                        "page must be an integer greater than or equal to 1",
                    )),
                },
                "page_size" => match value.trim().parse::<u32>() {
                    Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => params.page_size = size,
                    _ => errors.push(FieldError::new(
                        &["query", "page_size"],
                        format!("page_size must be an integer between 1 and {}", MAX_PAGE_SIZE),
                    )),
                },
                "sort_by" => match SortField::parse(value) {
                    Some(field) => params.sort_by = field,
                    None => errors.push(FieldError::new(
                        &["query", "sort_by"],
                        format!("Invalid sort_by '{}'. Allowed: {}", value, SortField::ALLOWED),
                    )),
                },
                "sort_dir" => match SortDirection::parse(value) {
                    Some(dir) => params.sort_dir = dir,
                    None => errors.push(FieldError::new(
                        &["query", "sort_dir"],
                        format!("Invalid sort_dir '{}'. Allowed: asc, desc", value),
                    )),
                },
                "q" => {
                    let q = value.trim();
                    params.q = if q.is_empty() { None } else { Some(q.to_string()) };
                }
                "filters" => match parse_filter(value) {
                    Ok(Some((field, v))) => {
                        params.filters.insert(field, v);
                    }
                    Ok(None) => {}
                    Err(msg) => errors.push(FieldError::new(&["query", "filters"], msg)),
                },
                _ => {}
            }
        }

        if errors.is_empty() {
            Ok(params)
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Zero-based inclusive row range covered by this page
    pub fn range(&self) -> (u64, u64) {
        let from = u64::from(self.page - 1) * u64::from(self.page_size);
        (from, from + u64::from(self.page_size) - 1)
    }
}

fn parse_filter(raw: &str) -> Result<Option<(SortField, String)>, String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid filter '{}'. Expected format '<field>=<value>'.", raw))?;

    let field = field.trim();
    let field = SortField::parse(field).ok_or_else(|| {
        format!(
            "Invalid filter field '{}'. Allowed: {}",
            field,
            SortField::ALLOWED
        )
    })?;

    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some((field, value.to_string())))
}

/// Pagination metadata returned with list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            page,
            page_size,
            total,
            total_pages: total.div_ceil(size).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedRecords {
    pub items: Vec<Record>,
    pub meta: PageMeta,
}

/// Acknowledgement of `DELETE /records/:id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: String,
}
