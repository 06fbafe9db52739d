pub mod images;
pub mod kv;
pub mod memory;
pub mod mongo;
pub mod objects;
pub mod settings;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Config, StorageKind};
use crate::db::images::ImageKind;
use crate::error::{BotError, Result};

pub type Metadata = BTreeMap<String, String>;

/// Object description without its bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHead {
    pub key: String,
    pub size: u64,
    pub uploaded: DateTime<Utc>,
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub head: ObjectHead,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct PutObject {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub include_metadata: bool,
}

impl ListOptions {
    pub fn with_metadata() -> Self {
        Self {
            prefix: None,
            include_metadata: true,
        }
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            include_metadata: true,
        }
    }
}

/// Bucket of binary objects with free-form string metadata.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>>;

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>>;

    async fn put(&self, key: &str, object: PutObject) -> Result<ObjectHead>;

    /// Removes the object, reporting whether it existed. Of two concurrent
    /// deletes of one key exactly one sees `true`.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Objects ordered by key.
    async fn list(&self, options: ListOptions) -> Result<Vec<ObjectHead>>;
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>>;
}

pub type Bucket = Arc<dyn ObjectStore>;
pub type Kv = Arc<dyn KvStore>;

#[derive(Clone)]
pub struct Stores {
    pub settings: Kv,
    pub cooldowns: Kv,
    pub pillows: Bucket,
    pub pillow_submissions: Bucket,
    pub photos: Bucket,
}

impl Stores {
    pub const SETTINGS: &'static str = "settings";
    pub const COOLDOWNS: &'static str = "cooldowns";
    pub const PILLOWS: &'static str = "pillows";
    pub const PILLOW_SUBMISSIONS: &'static str = "pillow_submissions";
    pub const PHOTOS: &'static str = "photos";

    /// Approved images of one family.
    pub fn bucket(&self, kind: ImageKind) -> &Bucket {
        match kind {
            ImageKind::Pillow => &self.pillows,
            ImageKind::Photo => &self.photos,
        }
    }

    pub fn memory() -> Self {
        Self {
            settings: Arc::new(memory::MemoryKv::default()),
            cooldowns: Arc::new(memory::MemoryKv::default()),
            pillows: Arc::new(memory::MemoryBucket::default()),
            pillow_submissions: Arc::new(memory::MemoryBucket::default()),
            photos: Arc::new(memory::MemoryBucket::default()),
        }
    }

    pub async fn open(config: &Config) -> Result<Self> {
        match config.storage {
            StorageKind::Memory => Ok(Self::memory()),
            StorageKind::Mongo => {
                let (url, name) = config.require_mongo()?;
                let db = mongo::mongo_pool(url, name).await?;
                Ok(Self {
                    settings: Arc::new(kv::MongoKv::open(&db, Self::SETTINGS).await?),
                    cooldowns: Arc::new(kv::MongoKv::open(&db, Self::COOLDOWNS).await?),
                    pillows: Arc::new(objects::MongoBucket::new(&db, Self::PILLOWS)),
                    pillow_submissions: Arc::new(objects::MongoBucket::new(
                        &db,
                        Self::PILLOW_SUBMISSIONS,
                    )),
                    photos: Arc::new(objects::MongoBucket::new(&db, Self::PHOTOS)),
                })
            }
        }
    }
}

/// Flattens a metadata struct into string pairs. `null` fields are dropped.
pub fn to_metadata<T: Serialize>(value: &T) -> Result<Metadata> {
    let Value::Object(map) = serde_json::to_value(value)? else {
        return Err(BotError::new("metadata_shape").push_str("metadata must be an object"));
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k, s)),
            other => Some((k, other.to_string())),
        })
        .collect())
}

pub fn from_metadata<T: DeserializeOwned>(metadata: &Metadata) -> Result<T> {
    let map = metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect::<serde_json::Map<_, _>>();
    Ok(serde_json::from_value(Value::Object(map))?)
}
