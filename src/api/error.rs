use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::error;

use crate::month::MonthParseError;

/// Errors surfaced at the HTTP boundary.
///
/// Responses are plain text. Internal failures only ever show the fixed
/// per-endpoint message; the cause goes to the log.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal {
        message: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    /// `map_err` adapter: `.map_err(ApiError::internal("Error fetching statistics"))`
    pub fn internal<E>(message: &'static str) -> impl FnOnce(E) -> ApiError
    where
        E: Into<anyhow::Error>,
    {
        move |cause| ApiError::Internal {
            message,
            cause: cause.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Internal { message, cause } => write!(f, "{}: {:#}", message, cause),
        }
    }
}

impl From<MonthParseError> for ApiError {
    fn from(err: MonthParseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Internal { message, cause } => {
                error!(error = %format!("{:#}", cause), "{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}
