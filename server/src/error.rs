use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    /// The engine could not set up a stream. Nothing was sent yet.
    #[error("Could not start audio stream")]
    StreamStart(#[source] anyhow::Error),

    #[error("HTML conversion failed: {0}")]
    Conversion(String),

    #[error("Failed to build response")]
    Response(#[from] axum::http::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::StreamStart(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Response(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidInput(msg) => tracing::debug!("Rejected request: {msg}"),
            ApiError::StreamStart(e) => tracing::error!("Stream start failed: {e:#}"),
            ApiError::Conversion(msg) => tracing::warn!("{msg}"),
            ApiError::Response(e) => tracing::error!("Response build failed: {e}"),
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            code: status.as_u16(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_start_is_unavailable_and_hides_cause() {
        let err = ApiError::StreamStart(anyhow::anyhow!("engine secret detail"));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "Could not start audio stream");
    }

    #[test]
    fn test_invalid_input_keeps_message() {
        let err = ApiError::InvalidInput("Text cannot be empty".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Text cannot be empty");
    }
}
