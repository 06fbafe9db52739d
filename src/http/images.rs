//! Bearer-gated REST access to the image buckets.

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;

use crate::db::images::{ImageKind, PhotoData, PillowData, PillowType, pillow_key};
use crate::db::{ListOptions, PutObject, to_metadata};
use crate::error::Result;
use crate::state::BotState;

/// `list`, `data/{id}`, `{bytes}/{id}`, `upload` and `delete/{id}` for one bucket.
pub fn routes(kind: ImageKind) -> Router<BotState> {
    let bytes_route = match kind {
        ImageKind::Pillow => "/texture/{id}",
        ImageKind::Photo => "/image/{id}",
    };
    Router::new()
        .route("/list", get(move |State(state): State<BotState>| list(state, kind)))
        .route(
            "/data/{id}",
            get(move |State(state): State<BotState>, Path(id): Path<String>| data(state, kind, id)),
        )
        .route(
            bytes_route,
            get(move |State(state): State<BotState>, Path(id): Path<String>| bytes(state, kind, id)),
        )
        .route(
            "/upload",
            post(move |State(state): State<BotState>, multipart: Multipart| upload(state, kind, multipart)),
        )
        .route(
            "/delete/{id}",
            delete(move |State(state): State<BotState>, Path(id): Path<String>| remove(state, kind, id)),
        )
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn internal(context: &'static str, e: crate::error::BotError) -> Response {
    e.print_tree();
    (StatusCode::INTERNAL_SERVER_ERROR, context).into_response()
}

async fn list(state: BotState, kind: ImageKind) -> Response {
    match state.stores.bucket(kind).list(ListOptions::with_metadata()).await {
        Ok(objects) => Json(objects).into_response(),
        Err(e) => internal("List failed", e),
    }
}

async fn data(state: BotState, kind: ImageKind, id: String) -> Response {
    match state.stores.bucket(kind).head(&id).await {
        Ok(Some(head)) => Json(head.metadata).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal("Lookup failed", e),
    }
}

async fn bytes(state: BotState, kind: ImageKind, id: String) -> Response {
    match state.stores.bucket(kind).get(&id).await {
        Ok(Some(object)) => {
            let content_type = object
                .head
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, content_type)], object.data).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal("Lookup failed", e),
    }
}

async fn remove(state: BotState, kind: ImageKind, id: String) -> Response {
    match state.stores.bucket(kind).delete(&id).await {
        Ok(existed) => {
            tracing::info!(key = %id, kind = %kind, existed, "image deleted over api");
            Json(json!({ "success": true, "key": id })).into_response()
        }
        Err(e) => internal("Delete failed", e),
    }
}

struct Upload {
    file: Option<(Bytes, Option<String>)>,
    fields: HashMap<String, String>,
}

async fn read_form(mut multipart: Multipart) -> std::result::Result<Upload, Response> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        tracing::warn!(error = %e, "unreadable multipart upload");
        (StatusCode::BAD_REQUEST, "File missing or invalid").into_response()
    };

    let mut upload = Upload {
        file: None,
        fields: HashMap::new(),
    };
    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.map_err(bad_form)?;
            upload.file = Some((data, content_type));
        } else {
            let value = field.text().await.map_err(bad_form)?;
            upload.fields.insert(name, value);
        }
    }
    Ok(upload)
}

fn submitted_at(fields: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key).filter(|v| !v.is_empty()) {
        Some(raw) => DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc)),
        None => Some(Utc::now()),
    }
}

/// Key and metadata for an upload, or the 400 explaining what is missing.
fn describe(kind: ImageKind, fields: &HashMap<String, String>) -> std::result::Result<(String, PutMeta), &'static str> {
    let field = |key: &str| fields.get(key).filter(|v| !v.is_empty()).cloned();
    match kind {
        ImageKind::Pillow => {
            let (Some(user_id), Some(user_name), Some(name), Some(raw_type)) = (
                field(PillowData::USER_ID),
                field(PillowData::USER_NAME),
                field(PillowData::NAME),
                field(PillowData::PILLOW_TYPE),
            ) else {
                return Err("Missing userId, userName, name or type");
            };
            let pillow_type = raw_type.parse::<PillowType>().map_err(|_| "Invalid pillow type")?;
            let submitted_at = submitted_at(fields, PillowData::SUBMITTED_AT).ok_or("Invalid submittedAt")?;
            let approved_at = match field(PillowData::APPROVED_AT) {
                Some(raw) => Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .map_err(|_| "Invalid approvedAt")?
                        .with_timezone(&Utc),
                ),
                None => None,
            };
            let data = PillowData {
                user_id: user_id.clone(),
                user_name,
                name,
                pillow_type,
                submitted_at,
                approver_id: field(PillowData::APPROVER_ID),
                approved_at,
            };
            Ok((pillow_key(&user_id, pillow_type), PutMeta::Pillow(data)))
        }
        ImageKind::Photo => {
            let (Some(user_id), Some(user_name)) = (field(PhotoData::USER_ID), field(PhotoData::USER_NAME)) else {
                return Err("Missing userId or userName");
            };
            let data = PhotoData {
                user_id,
                user_name,
                date: field(PhotoData::DATE).unwrap_or_default(),
                submitted_at: submitted_at(fields, PhotoData::SUBMITTED_AT).ok_or("Invalid submittedAt")?,
            };
            Ok((uuid::Uuid::new_v4().to_string(), PutMeta::Photo(data)))
        }
    }
}

enum PutMeta {
    Pillow(PillowData),
    Photo(PhotoData),
}

impl PutMeta {
    fn to_metadata(&self) -> Result<crate::db::Metadata> {
        match self {
            PutMeta::Pillow(data) => to_metadata(data),
            PutMeta::Photo(data) => to_metadata(data),
        }
    }
}

async fn upload(state: BotState, kind: ImageKind, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let Some((data, content_type)) = form.file else {
        return (StatusCode::BAD_REQUEST, "File missing or invalid").into_response();
    };
    let (key, meta) = match describe(kind, &form.fields) {
        Ok(described) => described,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    let metadata = match meta.to_metadata() {
        Ok(metadata) => metadata,
        Err(e) => return internal("Upload failed", e),
    };

    let object = PutObject {
        data,
        content_type,
        metadata,
    };
    match state.stores.bucket(kind).put(&key, object).await {
        Ok(head) => {
            tracing::info!(key = %key, kind = %kind, size = head.size, "image uploaded over api");
            Json(json!({ "success": true, "key": key })).into_response()
        }
        Err(e) => internal("Upload failed", e),
    }
}
