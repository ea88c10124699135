//! Error-to-HTTP response conversion.
//!
//! Every failed job becomes a JSON body `{error, message, request_id}` with
//! the status assigned to its [`ErrorKind`](sv_core::ErrorKind). Handlers
//! return `Result<T, AppError>` and use `?` on [`sv_core::Error`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failure body, as documented in the OpenAPI schema.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `INVALID_REQUEST`.
    pub error: String,
    /// Human-readable explanation.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: sv_core::Error,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: sv_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, id: Option<String>) -> Self {
        self.request_id = id;
        self
    }

    pub fn inner(&self) -> &sv_core::Error {
        &self.inner
    }
}

impl From<sv_core::Error> for AppError {
    fn from(e: sv_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                code = self.inner.code(),
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = ErrorBody {
            error: self.inner.code().to_string(),
            message: self.inner.message(),
            request_id: self.request_id,
        };

        (status, axum::Json(body)).into_response()
    }
}
