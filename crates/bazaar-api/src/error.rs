use std::fmt::Display;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use bazaar_types::api::MessageResponse;

/// Handler failure kinds. Every variant carries the message shown to the
/// client; internal causes are logged where they are converted and never
/// leave the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Build a `map_err` adapter that logs the cause and yields an opaque
    /// internal error with `message`.
    pub fn internal<E: Display>(message: &'static str) -> impl FnOnce(E) -> ApiError {
        move |cause| {
            error!(error = %cause, "{}", message);
            ApiError::Internal(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unreadable or mistyped JSON bodies get the same envelope as every other
/// failure. The parser's detail stays in the log.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Invalid request body")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = MessageResponse {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
