use axum::{
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use super::request_host;
use crate::AppState;
use crate::error::SubError;

pub async fn clash_handler(
    Path(email): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SubError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(SubError::BadRequest("email is required".to_string()));
    }

    let host = request_host(&headers);
    info!("Clash subscription request: email={}, host={}", email, host);

    let yaml = state.clash.get_clash_subscription(email, &host).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-yaml; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=clash-config.yaml",
            ),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        yaml,
    )
        .into_response())
}
