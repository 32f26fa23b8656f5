use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use pezo_core::llm::error::UpstreamError;

/// Terminal pipeline failures. Every stage fails fast into exactly one of
/// these; there is no aggregation and no retry.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    NotFound,
    InvalidAppHeader,
    MissingClientId,
    RateLimited,
    InvalidBody,
    MissingField(&'static str),
    MissingCredential,
    Upstream(UpstreamError),
    Internal(anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ErrorBody {
    fn bare(error: &str) -> Self {
        Self {
            error: error.to_string(),
            message: None,
        }
    }

    fn with_message(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: Some(message.to_string()),
        }
    }
}

impl ApiError {
    /// Recover the upstream taxonomy from an `anyhow` chain. Anything that
    /// is not an [`UpstreamError`] (transport failures, decode faults) is an
    /// unclassified 500, reported to Sentry.
    pub fn from_pipeline_fault(err: anyhow::Error) -> Self {
        match err.downcast::<UpstreamError>() {
            Ok(upstream) => ApiError::Upstream(upstream),
            Err(other) => {
                sentry_anyhow::capture_anyhow(&other);
                tracing::error!(error = %other, "unhandled pipeline fault");
                ApiError::Internal(other)
            }
        }
    }

    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                ErrorBody::bare("Method not allowed"),
            ),
            ApiError::NotFound => (StatusCode::NOT_FOUND, ErrorBody::bare("Not found")),
            ApiError::InvalidAppHeader => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::bare("Unauthorized: Invalid app header"),
            ),
            ApiError::MissingClientId => (
                StatusCode::BAD_REQUEST,
                ErrorBody::bare("Missing X-CLIENT-ID header"),
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::with_message(
                    "Rate limit exceeded",
                    "Maximum 3 requests per day. Please try again tomorrow.",
                ),
            ),
            ApiError::InvalidBody => {
                (StatusCode::BAD_REQUEST, ErrorBody::bare("Invalid JSON body"))
            }
            ApiError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: format!("Missing required field: {field}"),
                    message: None,
                },
            ),
            ApiError::MissingCredential => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::bare("Server configuration error"),
            ),
            ApiError::Upstream(err) => upstream_status_and_body(err),
            ApiError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal server error".to_string(),
                    message: Some(err.to_string()),
                },
            ),
        }
    }
}

/// The whole upstream family is a uniform 502 to the caller; diagnostic
/// detail is logged where the error was raised, never surfaced.
fn upstream_status_and_body(err: &UpstreamError) -> (StatusCode, ErrorBody) {
    let (error, message) = match err {
        UpstreamError::Http { .. } => ("AI service unavailable", "Failed to get AI decision"),
        UpstreamError::EmptyCompletion => {
            ("Invalid AI response", "AI did not return a valid response")
        }
        UpstreamError::Parse { .. } => ("Invalid AI response format", "AI returned invalid JSON"),
        UpstreamError::Structure { .. } => (
            "Invalid AI response structure",
            "AI response does not match expected format",
        ),
    };
    (StatusCode::BAD_GATEWAY, ErrorBody::with_message(error, message))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
