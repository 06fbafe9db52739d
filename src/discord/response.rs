use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::Value;

use crate::types::discord::{
    AllowedMentions, AttachmentRef, CallbackType, Embed, FLAG_EPHEMERAL, FLAG_IS_COMPONENTS_V2,
    InteractionResponse, InteractionResponseData,
};

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// What a handler answers an interaction with.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(InteractionResponse),
    /// Sent as `multipart/form-data` with the file as `files[0]`.
    WithAttachment {
        response: InteractionResponse,
        file: FileUpload,
    },
}

fn no_mentions() -> Option<AllowedMentions> {
    Some(AllowedMentions { parse: Vec::new() })
}

impl Reply {
    pub fn pong() -> Self {
        Reply::Json(InteractionResponse {
            response_type: CallbackType::Pong as u8,
            data: None,
        })
    }

    pub fn channel(data: InteractionResponseData) -> Self {
        Reply::Json(InteractionResponse {
            response_type: CallbackType::ChannelMessageWithSource as u8,
            data: Some(data),
        })
    }

    pub fn update(data: InteractionResponseData) -> Self {
        Reply::Json(InteractionResponse {
            response_type: CallbackType::UpdateMessage as u8,
            data: Some(data),
        })
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::channel(InteractionResponseData {
            content: Some(content.into()),
            allowed_mentions: no_mentions(),
            ..Default::default()
        })
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self::channel(InteractionResponseData {
            content: Some(content.into()),
            allowed_mentions: no_mentions(),
            flags: Some(FLAG_EPHEMERAL),
            ..Default::default()
        })
    }

    pub fn embed(embed: Embed, content: Option<String>, components: Vec<Value>) -> Self {
        Self::channel(InteractionResponseData {
            content,
            embeds: Some(vec![embed]),
            components: Some(components),
            allowed_mentions: no_mentions(),
            ..Default::default()
        })
    }

    /// A Components V2 message; no content or embeds allowed alongside.
    pub fn components(components: Vec<Value>) -> Self {
        Self::channel(Self::v2_data(components))
    }

    pub fn ephemeral_components(components: Vec<Value>) -> Self {
        let mut data = Self::v2_data(components);
        data.flags = Some(FLAG_IS_COMPONENTS_V2 | FLAG_EPHEMERAL);
        Self::channel(data)
    }

    pub fn update_components(components: Vec<Value>) -> Self {
        Self::update(Self::v2_data(components))
    }

    fn v2_data(components: Vec<Value>) -> InteractionResponseData {
        InteractionResponseData {
            components: Some(components),
            flags: Some(FLAG_IS_COMPONENTS_V2),
            allowed_mentions: no_mentions(),
            ..Default::default()
        }
    }

    pub fn with_attachment(self, file: FileUpload) -> Self {
        let mut response = self.into_interaction_response();
        if let Some(data) = response.data.as_mut() {
            data.attachments = Some(vec![AttachmentRef {
                id: "0".to_string(),
                filename: file.filename.clone(),
            }]);
        }
        Reply::WithAttachment { response, file }
    }

    pub fn interaction_response(&self) -> &InteractionResponse {
        match self {
            Reply::Json(response) => response,
            Reply::WithAttachment { response, .. } => response,
        }
    }

    fn into_interaction_response(self) -> InteractionResponse {
        match self {
            Reply::Json(response) => response,
            Reply::WithAttachment { response, .. } => response,
        }
    }

    pub fn content(&self) -> Option<&str> {
        self.interaction_response().data.as_ref()?.content.as_deref()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.interaction_response()
            .data
            .as_ref()
            .and_then(|d| d.flags)
            .is_some_and(|f| f & FLAG_EPHEMERAL != 0)
    }
}

fn multipart_body(boundary: &str, payload: &[u8], file: &FileUpload) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + file.data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"payload_json\"\r\nContent-Type: application/json\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"files[0]\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            file.filename.replace('"', ""),
            file.content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(&file.data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(response) => axum::Json(response).into_response(),
            Reply::WithAttachment { response, file } => {
                let payload = match serde_json::to_vec(&response) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to serialize interaction response");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                };
                let boundary = format!("fry-{}", uuid::Uuid::new_v4().simple());
                let body = multipart_body(&boundary, &payload, &file);
                (
                    [(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )],
                    body,
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_sets_flag_and_suppresses_mentions() {
        let reply = Reply::ephemeral("nope");
        assert!(reply.is_ephemeral());
        assert_eq!(reply.content(), Some("nope"));
        let json = serde_json::to_value(reply.interaction_response()).unwrap();
        assert_eq!(json["type"], 4);
        assert_eq!(json["data"]["flags"], 64);
        assert_eq!(json["data"]["allowed_mentions"]["parse"], serde_json::json!([]));
    }

    #[test]
    fn multipart_carries_payload_and_file() {
        let file = FileUpload {
            filename: "1_Regular.png".into(),
            content_type: "image/png".into(),
            data: Bytes::from_static(b"\x89PNG"),
        };
        let reply = Reply::message("hi").with_attachment(file.clone());
        let response = reply.interaction_response().clone();
        assert_eq!(
            response.data.as_ref().unwrap().attachments.as_ref().unwrap()[0].filename,
            "1_Regular.png"
        );

        let body = multipart_body("b", br#"{"type":4}"#, &file);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--b\r\n"));
        assert!(text.contains("name=\"payload_json\""));
        assert!(text.contains("name=\"files[0]\"; filename=\"1_Regular.png\""));
        assert!(text.ends_with("\r\n--b--\r\n"));
    }
}
