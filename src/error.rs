use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generator::GenerationError;

/// Errors returned to recipe service callers. The messages are fixed so that
/// provider details never reach the client.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid ingredients")]
    InvalidInput,

    #[error("Failed to generate recipe")]
    GenerationFailed(#[source] GenerationError),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput => StatusCode::BAD_REQUEST,
            ServiceError::GenerationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
