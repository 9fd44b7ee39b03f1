use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

const INTERNAL_MESSAGE: &str = "Internal Server Error";

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Endpoint refresh failed: {0}")]
    UpstreamAuth(String),

    #[error("Speech synthesis failed with status {status}")]
    UpstreamSynthesis { status: u16 },

    #[error("Voice list request failed with status {status}")]
    UpstreamVoices { status: u16 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::UpstreamAuth(_) => (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_AUTH_ERROR"),
            AppError::UpstreamSynthesis { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_SYNTHESIS_ERROR",
            ),
            AppError::UpstreamVoices { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_VOICES_ERROR")
            }
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Http(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HTTP_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        tracing::error!("Request failed: {} - {}", code, self);

        // Upstream details stay in the log.
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            _ => INTERNAL_MESSAGE.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}
