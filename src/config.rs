use std::env;
use std::net::SocketAddr;

use strum::EnumString;

use crate::db::images::ImageKind;
use crate::error::{BotError, Result};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8787";
const DEFAULT_PILLOW_URL: &str = "https://pillows.fry.api.lisekilis.dev";
const DEFAULT_PHOTO_URL: &str = "https://photos.fry.api.lisekilis.dev";

/// Compile-time value first, then the runtime environment.
macro_rules! env_value {
    ($name:literal) => {
        option_env!($name)
            .map(String::from)
            .or_else(|| env::var($name).ok())
            .filter(|v| !v.is_empty())
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StorageKind {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub public_key: Option<String>,
    pub bot_token: Option<String>,
    pub application_id: Option<String>,
    pub api_token: Option<String>,
    pub owner_id: Option<String>,
    pub storage: StorageKind,
    pub mongo_url: Option<String>,
    pub mongo_db: Option<String>,
    pub pillow_url: String,
    pub photo_url: String,
    pub bind_addr: SocketAddr,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage = match env_value!("STORAGE") {
            Some(raw) => raw.parse::<StorageKind>().map_err(|e| {
                BotError::new("config_storage").push_str(format!("STORAGE={raw}: {e}"))
            })?,
            None => StorageKind::Mongo,
        };

        let bind_addr = env_value!("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()?;

        Ok(Self {
            public_key: env_value!("DISCORD_PUBLIC_KEY"),
            bot_token: env_value!("DISCORD_BOT_TOKEN"),
            application_id: env_value!("DISCORD_APPLICATION_ID"),
            api_token: env_value!("API_TOKEN"),
            owner_id: env_value!("OWNER_ID"),
            storage,
            mongo_url: env_value!("MONGO_URL"),
            mongo_db: env_value!("MONGO_DB"),
            pillow_url: base_url(env_value!("PILLOW_URL"), DEFAULT_PILLOW_URL)?,
            photo_url: base_url(env_value!("PHOTO_URL"), DEFAULT_PHOTO_URL)?,
            bind_addr,
            api_base: env_value!("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        })
    }

    pub fn require_public_key(&self) -> Result<&str> {
        required(&self.public_key, "DISCORD_PUBLIC_KEY")
    }

    pub fn require_bot_token(&self) -> Result<&str> {
        required(&self.bot_token, "DISCORD_BOT_TOKEN")
    }

    pub fn require_mongo(&self) -> Result<(&str, &str)> {
        Ok((
            required(&self.mongo_url, "MONGO_URL")?,
            required(&self.mongo_db, "MONGO_DB")?,
        ))
    }

    pub fn image_url(&self, kind: ImageKind) -> &str {
        match kind {
            ImageKind::Pillow => &self.pillow_url,
            ImageKind::Photo => &self.photo_url,
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

/// Validated public base URL, without a trailing slash.
fn base_url(value: Option<String>, default: &str) -> Result<String> {
    let raw = value.unwrap_or_else(|| default.to_string());
    url::Url::parse(&raw)?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| BotError::new("config_missing").push_str(format!("{name} is not set")))
}

#[cfg(test)]
impl Config {
    pub fn for_tests(public_key: &str) -> Self {
        Self {
            public_key: Some(public_key.to_string()),
            bot_token: Some("test-bot-token".to_string()),
            application_id: Some("100000000000000000".to_string()),
            api_token: Some("secret-api-token".to_string()),
            owner_id: Some("1".to_string()),
            storage: StorageKind::Memory,
            mongo_url: None,
            mongo_db: None,
            pillow_url: DEFAULT_PILLOW_URL.to_string(),
            photo_url: DEFAULT_PHOTO_URL.to_string(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}
