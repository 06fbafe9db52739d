use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::discord::verify::{SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_signature};
use crate::state::BotState;
use crate::types::discord::Interaction;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Discord interactions webhook.
pub async fn handle(State(state): State<BotState>, headers: HeaderMap, body: Bytes) -> Response {
    let verified = match (
        state.config.public_key.as_deref(),
        header(&headers, SIGNATURE_HEADER),
        header(&headers, TIMESTAMP_HEADER),
    ) {
        (Some(public_key), Some(signature), Some(timestamp)) => {
            verify_signature(public_key, signature, timestamp, &body)
        }
        _ => false,
    };
    if !verified {
        tracing::warn!("rejected interaction with a bad signature");
        return (StatusCode::UNAUTHORIZED, "Bad request signature").into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(e) => {
            tracing::warn!(error = %e, "interaction body is not valid JSON");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    tracing::debug!(
        id = %interaction.id,
        kind = ?interaction.kind(),
        command = ?interaction.command_name(),
        custom_id = ?interaction.custom_id(),
        "interaction received"
    );
    state.registry.dispatch(&state, &interaction).await.into_response()
}
