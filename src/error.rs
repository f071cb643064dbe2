use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Failures while handling a webhook delivery.
///
/// The underlying causes are logged where they happen; only these outcomes
/// reach the caller.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncError {
    #[error("missing signature headers")]
    MissingSignatureHeaders,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("failed to sync profile")]
    SyncWriteFailed,
    #[error("internal server error")]
    Internal,
}

impl SyncError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSignatureHeaders | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::SyncWriteFailed | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
