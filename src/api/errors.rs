use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{store::StoreError, thingspeak::ProviderError};

/// Error taxonomy surfaced to API callers. Nothing here is retried by the
/// service; retry is the user invoking the operation again.
#[derive(Debug, Error)]
pub enum AppError {
    /// Required provider settings (channel id / API keys) are missing.
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed caller input (e.g. a manual-watering override).
    #[error("{0}")]
    Validation(String),

    /// The owner identity header is missing or malformed.
    #[error("missing or malformed owner identity")]
    Unauthorized,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::BAD_REQUEST,
            Self::Provider(ProviderError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
            Self::Provider(ProviderError::Rejected) => StatusCode::TOO_MANY_REQUESTS,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
