//! Application Errors
//!
//! Every failure that reaches an HTTP client is rendered as
//! `{"error": {"code", "message", "details", "trace_id"}}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

/// Result type of the data layer and the HTTP handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// One entry of a validation error list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
        }
    }
}

/// Errors surfaced by the records API
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Request validation failed")]
    Validation(Vec<FieldError>),

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Config(String),

    #[error("{message}")]
    Upstream { code: &'static str, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Upstream {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest { code, .. } => *code,
            AppError::NotFound(_) => "not_found",
            AppError::Config(_) => "config_error",
            AppError::Upstream { code, .. } => *code,
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Message shown to clients; internal details are never included
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation(errors) => Some(serde_json::json!({ "errors": errors })),
            _ => None,
        }
    }

    /// Build the response envelope, tagging it with `trace_id`
    pub fn to_body(&self, trace_id: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.public_message(),
                details: self.details(),
                trace_id: trace_id.to_string(),
            },
        }
    }
}

/// Top-level error response
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
    pub trace_id: String,
}

/// Random correlation id for logs and error bodies
pub fn generate_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let trace_id = generate_trace_id();
        let status = self.status_code();

        if status.is_server_error() {
            error!(trace_id = %trace_id, code = self.code(), error = %self, "Request failed");
        } else {
            warn!(trace_id = %trace_id, code = self.code(), error = %self, "Request rejected");
        }

        (status, Json(self.to_body(&trace_id))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(vec![FieldError::new(&["body"], rejection.body_text())])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(vec![FieldError::new(&["query"], rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(vec![FieldError::new(&["path"], rejection.body_text())])
    }
}
