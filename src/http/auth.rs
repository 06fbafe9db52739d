use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::BotState;

/// Lets a request through only with `Authorization: Bearer <API_TOKEN>`.
/// With no token configured every request is refused.
pub async fn require_api_token(State(state): State<BotState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match (state.config.api_token.as_deref(), presented) {
        (Some(expected), Some(token)) if token == expected => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "rejected unauthenticated api request");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}
