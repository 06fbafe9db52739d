use proc_macros::define_field_names;
use serde::{Deserialize, Serialize};

use crate::db::KvStore;
use crate::error::Result;

/// Per-guild configuration. A guild is whitelisted once `name` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[define_field_names]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_role_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillow_channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_channel_id: Option<String>,
    /// Seconds between submissions of one user; 0 disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u64>,
}

impl Settings {
    pub async fn load(kv: &dyn KvStore, guild_id: &str) -> Result<Option<Self>> {
        match kv.get(guild_id).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn load_or_default(kv: &dyn KvStore, guild_id: &str) -> Result<Self> {
        Ok(Self::load(kv, guild_id).await?.unwrap_or_default())
    }

    /// Read-modify-write overlay. Not atomic: the last concurrent writer wins.
    pub async fn patch(kv: &dyn KvStore, guild_id: &str, patch: Settings) -> Result<Self> {
        let merged = Self::load_or_default(kv, guild_id).await?.merge(patch);
        kv.put(guild_id, serde_json::to_string(&merged)?, None).await?;
        tracing::info!(guild = guild_id, settings = ?merged, "settings updated");
        Ok(merged)
    }

    pub fn merge(self, patch: Settings) -> Self {
        Self {
            name: patch.name.or(self.name),
            mod_role_id: patch.mod_role_id.or(self.mod_role_id),
            pillow_channel_id: patch.pillow_channel_id.or(self.pillow_channel_id),
            photo_channel_id: patch.photo_channel_id.or(self.photo_channel_id),
            cooldown: patch.cooldown.or(self.cooldown),
        }
    }

    pub fn is_whitelisted(&self) -> bool {
        self.name.is_some()
    }

    pub fn cooldown_secs(&self) -> Option<u64> {
        self.cooldown.filter(|c| *c > 0)
    }
}
