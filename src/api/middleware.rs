use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::AppError;

pub const ALLOW_METHODS: &str = "GET,HEAD,POST,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, x-auth-token";
pub const MAX_AGE: &str = "86400";

/// Answers every `OPTIONS` request with 204, echoing the requested headers.
pub async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let allow_headers = request
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("x-auth-token"));

    (
        StatusCode::NO_CONTENT,
        [
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOW_METHODS),
            ),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers),
        ],
        Body::empty(),
    )
        .into_response()
}

/// Rejects requests whose shared-secret header does not match the
/// configured token. Does nothing when no token is configured.
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.auth_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(state.config.auth_header.as_str())
        .map(|v| v.as_bytes());

    if presented != Some(expected.as_bytes()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with missing or wrong {} header",
            state.config.auth_header
        );
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
