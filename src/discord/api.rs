use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};

use crate::error::{BotError, Result};
use crate::state::RateLimiter;
use crate::types::discord::{ApplicationCommand, ApplicationInfo, DiscordErrorResponse};

/// Bytes fetched from an attachment URL.
#[derive(Debug, Clone)]
pub struct Download {
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Outbound calls the bot makes. Handlers only ever see this trait.
#[async_trait]
pub trait DiscordHttp: Send + Sync {
    async fn application_id(&self) -> Result<String>;

    async fn register_commands(&self, application_id: &str, commands: &[ApplicationCommand]) -> Result<()>;

    async fn download(&self, url: &str) -> Result<Download>;
}

pub struct RestClient {
    client: Client,
    token: Option<String>,
    api_base: String,
    rate_limiter: Arc<RateLimiter>,
}

impl RestClient {
    pub fn new(token: Option<String>, api_base: String, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            client: Client::new(),
            token,
            api_base,
            rate_limiter,
        }
    }

    fn request(&self, method: Method, route: &str) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| BotError::new("missing_bot_token").push_str(format!("{method} {route}")))?;
        Ok(self
            .client
            .request(method, format!("{}{}", self.api_base, route))
            .header("Authorization", format!("Bot {}", token)))
    }

    async fn send(&self, request: RequestBuilder, label: &str) -> Result<Response> {
        self.rate_limiter.acquire().await;
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(discord_err) = serde_json::from_str::<DiscordErrorResponse>(&error_text) {
                return Err(BotError::new("discord_api_error").push_str(format!("{label}: {discord_err}")));
            }

            return Err(BotError::new("http_error").push_str(format!("{label}: {status} - {error_text}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl DiscordHttp for RestClient {
    async fn application_id(&self) -> Result<String> {
        let route = "/oauth2/applications/@me";
        let request = self.request(Method::GET, route)?;
        let response = self.send(request, &format!("GET {route}")).await?;
        let app_info: ApplicationInfo = response.json().await?;
        Ok(app_info.id)
    }

    async fn register_commands(&self, application_id: &str, commands: &[ApplicationCommand]) -> Result<()> {
        let route = format!("/applications/{application_id}/commands");
        let request = self.request(Method::PUT, &route)?.json(commands);
        self.send(request, &format!("PUT {route}")).await?;
        tracing::info!(count = commands.len(), application_id, "registered application commands");
        Ok(())
    }

    async fn download(&self, url: &str) -> Result<Download> {
        let request = self.client.get(url);
        let response = self
            .send(request, "GET attachment")
            .await
            .map_err(|e| BotError::new("attachment_download").push_any(e))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_owned());
        let bytes = response.bytes().await?;
        Ok(Download { content_type, bytes })
    }
}
