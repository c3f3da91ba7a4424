use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The configuration store could not be read.
    #[error("Store error: {0:#}")]
    Store(anyhow::Error),

    /// The external converter failed or timed out.
    #[error("Conversion failed: {0:#}")]
    Conversion(anyhow::Error),
}

impl SubError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubError::BadRequest(_) => StatusCode::BAD_REQUEST,
            SubError::NotFound(_) => StatusCode::NOT_FOUND,
            SubError::Store(_) | SubError::Conversion(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes() {
        assert_eq!(
            SubError::BadRequest("email".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SubError::NotFound("sub".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SubError::Conversion(anyhow::anyhow!("timeout")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_error_keeps_context_chain() {
        let err = SubError::Store(anyhow::anyhow!("disk").context("Failed to load inbounds"));
        assert_eq!(err.to_string(), "Store error: Failed to load inbounds: disk");
    }
}
