use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;

const STUDENT_NOT_FOUND: &str = "Student not found";

/// Error response with a single-key JSON body, e.g. `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    key: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            key,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "error", STUDENT_NOT_FOUND)
    }

    /// The GET endpoint reports a miss under the `Failed` key.
    pub fn lookup_failed() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Failed", STUDENT_NOT_FOUND)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "error", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        } else {
            tracing::warn!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }

        let mut body = Map::new();
        body.insert(self.key.to_owned(), Value::String(self.message));
        (self.status, Json(Value::Object(body))).into_response()
    }
}

/// GET: any lookup failure other than an unreachable store reads as a miss.
pub fn map_lookup_error(e: DomainError) -> ApiError {
    match e {
        DomainError::StorageUnavailable { message } => ApiError::internal(message),
        DomainError::StudentNotFound { .. } | DomainError::Database { .. } => {
            ApiError::lookup_failed()
        }
    }
}

/// POST: insert failures surface as a fixed message.
pub fn map_create_error(e: DomainError) -> ApiError {
    match e {
        DomainError::StorageUnavailable { message } => ApiError::internal(message),
        DomainError::Database { message } => {
            tracing::error!(error = %message, "Insert failed");
            ApiError::internal("Migration error")
        }
        DomainError::StudentNotFound { .. } => ApiError::not_found(),
    }
}

/// PUT pre-check: like GET, but the miss is reported under `error`.
pub fn map_precheck_error(e: DomainError) -> ApiError {
    match e {
        DomainError::StorageUnavailable { message } => ApiError::internal(message),
        DomainError::StudentNotFound { .. } | DomainError::Database { .. } => ApiError::not_found(),
    }
}

/// PUT/DELETE: misses are 404 under `error`, write failures keep their message.
pub fn map_write_error(e: DomainError) -> ApiError {
    match e {
        DomainError::StudentNotFound { .. } => ApiError::not_found(),
        DomainError::StorageUnavailable { message } | DomainError::Database { message } => {
            ApiError::internal(message)
        }
    }
}
