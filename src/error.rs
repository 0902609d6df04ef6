//! Typed errors and HTTP mapping.

use crate::response::error_body;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name → human-readable message. Ordered so responses are stable.
pub type FieldErrors = BTreeMap<String, String>;

/// Status used when a session is dropped for inactivity.
pub const SESSION_EXPIRED_STATUS: u16 = 440;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("table '{table}' not found in catalog '{catalog}'")]
    TableNotFound { table: String, catalog: String },
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },
    #[error("table '{0}' has no primary key")]
    MissingPrimaryKey(String),
    #[error("malformed catalog row for '{table}': {detail}")]
    MalformedCatalog { table: String, detail: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed for {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("session expired due to inactivity")]
    SessionExpired,
    #[error("session store: {0}")]
    Session(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(SchemaError::UnknownColumn { .. }) => StatusCode::BAD_REQUEST,
            AppError::Schema(_)
            | AppError::Config(_)
            | AppError::Session(_)
            | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::SessionExpired => {
                StatusCode::from_u16(SESSION_EXPIRED_STATUS).unwrap_or(StatusCode::UNAUTHORIZED)
            }
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(e: tower_sessions::session::Error) -> Self {
        AppError::Session(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let error = match self {
            AppError::Validation(fields) => serde_json::to_value(fields).unwrap_or(Value::Null),
            // Driver messages can leak schema details; keep them in the log only.
            AppError::Db(ref e) if !matches!(e, sqlx::Error::RowNotFound) => {
                Value::String("database error".into())
            }
            other => Value::String(other.to_string()),
        };
        (status, Json(error_body(error))).into_response()
    }
}
