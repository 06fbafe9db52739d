mod auth;
mod images;
mod interactions;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Router, middleware};

use crate::db::images::ImageKind;
use crate::state::BotState;

/// Discord attachments top out at 25 MB.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn router(state: BotState) -> Router {
    let api = Router::new()
        .nest("/pillow", images::routes(ImageKind::Pillow))
        .nest("/photos", images::routes(ImageKind::Photo))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_api_token));

    Router::new()
        .route("/interactions", post(interactions::handle))
        .merge(api)
        .fallback(fallback)
        .method_not_allowed_fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

/// Any `POST .../interactions` is the webhook too.
async fn fallback(state: State<BotState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    if method == Method::POST && uri.path().ends_with("/interactions") {
        return interactions::handle(state, headers, body).await;
    }
    not_found().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::images::PillowData;
    use crate::db::{ListOptions, from_metadata};
    use crate::test_utils;
    use axum::body::Body;
    use axum::http::{Request, header};
    use ed25519_dalek::Signer;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const TOKEN: &str = "Bearer secret-api-token";
    const BOUNDARY: &str = "fry-test-boundary";

    fn signed(path: &str, body: &str) -> Request<Body> {
        let timestamp = "1700000000";
        let signature = test_utils::signing_key().sign(format!("{timestamp}{body}").as_bytes());
        Request::post(path)
            .header("x-signature-ed25519", hex::encode(signature.to_bytes()))
            .header("x-signature-timestamp", timestamp)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn text(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn multipart(fields: &[(&str, &str)], file: Option<&[u8]>) -> Body {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"p.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(file);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn upload(path: &str, body: Body) -> Request<Body> {
        Request::post(path)
            .header(header::AUTHORIZATION, TOKEN)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn unsigned_interactions_are_rejected() {
        let app = router(test_utils::state());
        let request = Request::post("/interactions")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text(response).await, "Bad request signature");
    }

    #[tokio::test]
    async fn tampered_body_fails_verification() {
        let app = router(test_utils::state());
        let mut request = signed("/interactions", r#"{"type":1}"#);
        *request.body_mut() = Body::from(r#"{"type":2}"#);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signed_ping_gets_a_pong() {
        let app = router(test_utils::state());
        let response = app.oneshot(signed("/interactions", r#"{"type":1}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn nested_interactions_path_is_accepted() {
        let app = router(test_utils::state());
        let response = app
            .oneshot(signed("/api/discord/interactions", r#"{"type":1}"#))
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn signed_garbage_is_a_bad_request() {
        let app = router(test_utils::state());
        let response = app.oneshot(signed("/interactions", "{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Invalid JSON");
    }

    #[tokio::test]
    async fn signed_command_is_dispatched() {
        let app = router(test_utils::state());
        let body = json!({
            "id": test_utils::snowflake_now(),
            "type": 2,
            "data": { "name": "ping" }
        })
        .to_string();
        let response = app.oneshot(signed("/interactions", &body)).await.unwrap();
        let reply = json_body(response).await;
        assert_eq!(reply["type"], 4);
        assert!(reply["data"]["content"].as_str().unwrap().starts_with("🏓Pong!"));
    }

    #[tokio::test]
    async fn api_needs_the_bearer_token() {
        let app = router(test_utils::state());
        let response = app
            .clone()
            .oneshot(Request::get("/pillow/list").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(text(response).await, "Unauthorized");

        let response = app
            .oneshot(
                Request::get("/pillow/list")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let app = router(test_utils::state());
        for request in [
            Request::get("/").body(Body::empty()).unwrap(),
            Request::get("/interactions").body(Body::empty()).unwrap(),
            Request::get("/pillow/nothing").header(header::AUTHORIZATION, TOKEN).body(Body::empty()).unwrap(),
        ] {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(text(response).await, "Not found");
        }
    }

    #[tokio::test]
    async fn pillow_upload_round_trips_through_the_api() {
        let state = test_utils::state();
        let app = router(state.clone());

        let body = multipart(
            &[("userId", "42"), ("userName", "fry"), ("name", "Cozy"), ("type", "Regular")],
            Some(test_utils::PNG_BYTES),
        );
        let response = app.clone().oneshot(upload("/pillow/upload", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "success": true, "key": "42_Regular" }));

        let stored = state.stores.pillows.head("42_Regular").await.unwrap().unwrap();
        let meta: PillowData = from_metadata(&stored.metadata).unwrap();
        assert_eq!(meta.name, "Cozy");

        let response = app
            .clone()
            .oneshot(
                Request::get("/pillow/texture/42_Regular")
                    .header(header::AUTHORIZATION, TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(body_bytes(response).await, test_utils::PNG_BYTES);

        let response = app
            .clone()
            .oneshot(
                Request::get("/pillow/list")
                    .header(header::AUTHORIZATION, TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = json_body(response).await;
        assert_eq!(listed[0]["key"], "42_Regular");
        assert_eq!(listed[0]["metadata"]["userName"], "fry");

        let response = app
            .oneshot(
                Request::delete("/pillow/delete/42_Regular")
                    .header(header::AUTHORIZATION, TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await, json!({ "success": true, "key": "42_Regular" }));
        assert!(state.stores.pillows.list(ListOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_without_a_file_or_fields_is_rejected() {
        let app = router(test_utils::state());

        let response = app
            .clone()
            .oneshot(upload("/photos/upload", multipart(&[("userId", "42"), ("userName", "fry")], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "File missing or invalid");

        let response = app
            .oneshot(upload("/photos/upload", multipart(&[("userId", "42")], Some(test_utils::PNG_BYTES))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(text(response).await, "Missing userId or userName");
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let app = router(test_utils::state());
        let response = app
            .oneshot(
                Request::get("/photos/data/nope")
                    .header(header::AUTHORIZATION, TOKEN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
