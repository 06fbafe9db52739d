use std::time::Duration;

use async_trait::async_trait;
use bson::serde_helpers::datetime;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use proc_macros::define_field_names;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::db::KvStore;
use crate::error::{BotError, Result};

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[define_field_names]
struct KvEntry {
    #[serde(rename = "_id")]
    key: String,

    value: String,

    #[serde_as(as = "Option<datetime::FromChrono04DateTime>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl KvEntry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| at > Utc::now())
    }
}

/// Key-value namespace stored as one collection. Mongo's TTL monitor purges
/// expired entries eventually; reads filter them out until it does.
pub struct MongoKv {
    collection: Collection<KvEntry>,
}

impl MongoKv {
    pub async fn open(db: &Database, name: &str) -> Result<Self> {
        let collection: Collection<KvEntry> = db.collection(name);
        let index = IndexModel::builder()
            .keys(doc! { KvEntry::EXPIRES_AT: 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(0))
                    .build(),
            )
            .build();
        collection.create_index(index).await?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl KvStore for MongoKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = self.collection.find_one(doc! { KvEntry::KEY: key }).await?;
        Ok(entry.filter(KvEntry::is_live).map(|e| e.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires_at = match ttl {
            Some(ttl) => Some(
                Utc::now()
                    + chrono::Duration::from_std(ttl)
                        .map_err(|e| BotError::new("kv_ttl").push_std(e))?,
            ),
            None => None,
        };
        let entry = KvEntry {
            key: key.to_string(),
            value,
            expires_at,
        };
        self.collection
            .replace_one(doc! { KvEntry::KEY: key }, &entry)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.collection.delete_one(doc! { KvEntry::KEY: key }).await?;
        Ok(())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let filter = match prefix {
            Some(p) => doc! { KvEntry::KEY: { "$regex": format!("^{}", regex::escape(p)) } },
            None => doc! {},
        };
        let entries: Vec<KvEntry> = self
            .collection
            .find(filter)
            .sort(doc! { KvEntry::KEY: 1 })
            .await?
            .try_collect()
            .await?;
        Ok(entries
            .into_iter()
            .filter(KvEntry::is_live)
            .map(|e| e.key)
            .collect())
    }
}
