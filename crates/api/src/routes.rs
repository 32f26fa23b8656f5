use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use std::sync::Arc;

use pezo_core::domain::decision::{self, DecisionRequest};
use pezo_core::llm::{prompt, DecisionClient};
use pezo_core::quota::{Admission, QuotaGate};

use crate::error::ApiError;

pub const ROUTE_PATH: &str = "/should-i-buy";

const APP_HEADER: &str = "x-pezo-app";
const CLIENT_ID_HEADER: &str = "x-client-id";

// Static shared secret, a weak trust boundary rather than authentication:
// it only keeps casual traffic out.
const APP_HEADER_VALUE: &str = "pezo_v1";

const ALLOWED_HEADERS: &str = "Content-Type, X-PEZO-APP, X-CLIENT-ID";

const PREFLIGHT_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "POST, OPTIONS"),
    ("access-control-allow-headers", ALLOWED_HEADERS),
    ("access-control-max-age", "86400"),
];

const RESPONSE_CORS_HEADERS: [(&str, &str); 2] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-headers", ALLOWED_HEADERS),
];

#[derive(Clone)]
pub struct AppState {
    pub quota: QuotaGate,
    /// None when the upstream credential is missing; the server runs in
    /// degraded mode and every decision request answers 500.
    pub llm: Option<Arc<dyn DecisionClient>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            ROUTE_PATH,
            post(should_i_buy)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(unmatched_path)
        .with_state(state)
}

/// Preflight probes get an empty 204 on every path, before any header or
/// body checks. The stock tower-http CORS layer answers preflights with
/// 200, so the route handles OPTIONS itself.
async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, PREFLIGHT_HEADERS)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Method checks come before path checks: a stray GET is a 405 even on an
/// unknown path, and OPTIONS is always a preflight.
async fn unmatched_path(method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight().await.into_response()
    } else if method == Method::POST {
        ApiError::NotFound.into_response()
    } else {
        ApiError::MethodNotAllowed.into_response()
    }
}

async fn should_i_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let app_header = headers.get(APP_HEADER).and_then(|v| v.to_str().ok());
    if app_header != Some(APP_HEADER_VALUE) {
        return Err(ApiError::InvalidAppHeader);
    }

    let client_id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingClientId)?;

    // Day boundary is UTC midnight.
    let today = Utc::now().date_naive();
    if state.quota.admit(client_id, today).await == Admission::Exhausted {
        return Err(ApiError::RateLimited);
    }

    // Body syntax first, then required fields in fixed order, then the
    // typed view. Each failure is a distinct 400.
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidBody)?;
    if let Some(field) = decision::missing_required_field(&payload) {
        return Err(ApiError::MissingField(field));
    }
    let request: DecisionRequest =
        serde_json::from_value(payload).map_err(|_| ApiError::InvalidBody)?;

    let llm = state.llm.as_ref().ok_or(ApiError::MissingCredential)?;

    let prompt = prompt::build(&request);
    let decision = llm
        .decide(prompt)
        .await
        .map_err(ApiError::from_pipeline_fault)?;

    Ok((RESPONSE_CORS_HEADERS, Json(decision)).into_response())
}
