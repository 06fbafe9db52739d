use async_trait::async_trait;
use bson::serde_helpers::datetime;
use bson::spec::BinarySubtype;
use bson::{Binary, Document};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use proc_macros::define_field_names;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::db::{ListOptions, Metadata, ObjectHead, ObjectStore, PutObject, StoredObject};
use crate::error::Result;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[define_field_names]
struct ObjectDoc {
    #[serde(rename = "_id")]
    key: String,

    /// Absent when the query projects it away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Binary>,

    size: i64,

    #[serde_as(as = "datetime::FromChrono04DateTime")]
    uploaded: DateTime<Utc>,

    #[serde(default)]
    content_type: Option<String>,

    #[serde(default)]
    metadata: Metadata,
}

impl ObjectDoc {
    fn head(&self) -> ObjectHead {
        ObjectHead {
            key: self.key.clone(),
            size: self.size.max(0) as u64,
            uploaded: self.uploaded,
            content_type: self.content_type.clone(),
            metadata: self.metadata.clone(),
        }
    }

    fn without_data() -> Document {
        doc! { ObjectDoc::DATA: 0 }
    }
}

/// Bucket stored as one collection, bytes inline as BSON binary.
pub struct MongoBucket {
    collection: Collection<ObjectDoc>,
}

impl MongoBucket {
    pub fn new(db: &Database, name: &str) -> Self {
        Self {
            collection: db.collection(name),
        }
    }
}

#[async_trait]
impl ObjectStore for MongoBucket {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let found = self.collection.find_one(doc! { ObjectDoc::KEY: key }).await?;
        Ok(found.map(|d| StoredObject {
            head: d.head(),
            data: d.data.map(|b| Bytes::from(b.bytes)).unwrap_or_default(),
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        let found = self
            .collection
            .find_one(doc! { ObjectDoc::KEY: key })
            .projection(ObjectDoc::without_data())
            .await?;
        Ok(found.as_ref().map(ObjectDoc::head))
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<ObjectHead> {
        let document = ObjectDoc {
            key: key.to_string(),
            size: object.data.len() as i64,
            data: Some(Binary {
                subtype: BinarySubtype::Generic,
                bytes: object.data.to_vec(),
            }),
            uploaded: Utc::now(),
            content_type: object.content_type,
            metadata: object.metadata,
        };
        self.collection
            .replace_one(doc! { ObjectDoc::KEY: key }, &document)
            .upsert(true)
            .await?;
        Ok(document.head())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { ObjectDoc::KEY: key }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, options: ListOptions) -> Result<Vec<ObjectHead>> {
        let filter = match &options.prefix {
            Some(p) => doc! { ObjectDoc::KEY: { "$regex": format!("^{}", regex::escape(p)) } },
            None => doc! {},
        };
        let mut projection = ObjectDoc::without_data();
        if !options.include_metadata {
            projection.insert(ObjectDoc::METADATA, 0);
        }
        let docs: Vec<ObjectDoc> = self
            .collection
            .find(filter)
            .projection(projection)
            .sort(doc! { ObjectDoc::KEY: 1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs.iter().map(ObjectDoc::head).collect())
    }
}
