use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderName},
    response::{AppendHeaders, IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::info;

use super::request_host;
use crate::AppState;
use crate::error::SubError;

pub async fn subscription_handler(
    Path(sub_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SubError> {
    let host = request_host(&headers);
    info!("Subscription request: sub_id={}, host={}", sub_id, host);

    let (links, userinfo) = state.subscriptions.get_subs(&sub_id, &host).await?;

    let mut body = links.join("\n");
    if state.config.encrypt {
        body = STANDARD.encode(body);
    }

    let mut extra = vec![
        (HeaderName::from_static("subscription-userinfo"), userinfo),
        (
            HeaderName::from_static("profile-update-interval"),
            state.config.update_interval.to_string(),
        ),
    ];
    if !state.config.title.is_empty() {
        extra.push((
            HeaderName::from_static("profile-title"),
            format!("base64:{}", STANDARD.encode(&state.config.title)),
        ));
    }

    Ok((AppendHeaders(extra), body).into_response())
}
