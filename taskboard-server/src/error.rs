//! Service errors and their HTTP mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskboard_proto::id::InvalidIdError;
use taskboard_proto::message::ErrorBody;

use crate::store::StoreError;

/// Errors returned by the task and user services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The identifier is not in the store's identifier shape.
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),
    /// The request is missing something the operation needs.
    #[error("{0}")]
    InvalidArgument(String),
    /// The store failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error response: a status code and an `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 with `message`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::InvalidId(_) | ServiceError::InvalidArgument(_) => {
                Self::bad_request(err.to_string())
            }
            ServiceError::Store(_) => {
                tracing::error!(error = %err, "store operation failed");
                Self::internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "rejected request body");
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}
