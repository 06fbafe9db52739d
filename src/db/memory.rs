use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::db::{KvStore, ListOptions, ObjectHead, ObjectStore, PutObject, StoredObject};
use crate::error::Result;

#[derive(Default)]
pub struct MemoryKv {
    entries: DashMap<String, (String, Option<Instant>)>,
}

fn live(expires: &Option<Instant>) -> bool {
    expires.is_none_or(|at| at > Instant::now())
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .entries
            .get(key)
            .filter(|e| live(&e.1))
            .map(|e| e.0.clone());
        if value.is_none() {
            self.entries.remove_if(key, |_, e| !live(&e.1));
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let expires = ttl.map(|t| Instant::now() + t);
        self.entries.insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| live(&e.value().1))
            .map(|e| e.key().clone())
            .filter(|k| prefix.is_none_or(|p| k.starts_with(p)))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[derive(Default)]
pub struct MemoryBucket {
    objects: DashMap<String, StoredObject>,
}

#[async_trait]
impl ObjectStore for MemoryBucket {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        Ok(self.objects.get(key).map(|o| o.clone()))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        Ok(self.objects.get(key).map(|o| o.head.clone()))
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<ObjectHead> {
        let head = ObjectHead {
            key: key.to_string(),
            size: object.data.len() as u64,
            uploaded: Utc::now(),
            content_type: object.content_type,
            metadata: object.metadata,
        };
        self.objects.insert(
            key.to_string(),
            StoredObject {
                head: head.clone(),
                data: object.data,
            },
        );
        Ok(head)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.objects.remove(key).is_some())
    }

    async fn list(&self, options: ListOptions) -> Result<Vec<ObjectHead>> {
        let mut heads: Vec<ObjectHead> = self
            .objects
            .iter()
            .filter(|o| {
                options
                    .prefix
                    .as_deref()
                    .is_none_or(|p| o.key().starts_with(p))
            })
            .map(|o| {
                let mut head = o.head.clone();
                if !options.include_metadata {
                    head.metadata.clear();
                }
                head
            })
            .collect();
        heads.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(heads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn expired_entries_are_never_returned() {
        let kv = MemoryKv::default();
        kv.put("user", "true".into(), Some(Duration::from_millis(30)))
            .await
            .unwrap();
        kv.put("other", "x".into(), None).await.unwrap();
        assert_eq!(kv.get("user").await.unwrap().as_deref(), Some("true"));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(kv.get("user").await.unwrap(), None);
        assert_eq!(kv.list_keys(None).await.unwrap(), vec!["other".to_string()]);
    }

    #[tokio::test]
    async fn list_is_ordered_and_filtered_by_prefix() {
        let bucket = MemoryBucket::default();
        for key in ["2_Regular", "1_Dakimakura", "1_Regular"] {
            let mut object = PutObject {
                data: Bytes::from_static(b"png"),
                ..Default::default()
            };
            object.metadata.insert("name".into(), key.into());
            bucket.put(key, object).await.unwrap();
        }

        let all = bucket.list(ListOptions::default()).await.unwrap();
        let keys: Vec<_> = all.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, ["1_Dakimakura", "1_Regular", "2_Regular"]);
        assert!(all.iter().all(|h| h.metadata.is_empty()));

        let mine = bucket.list(ListOptions::prefixed("1_")).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].metadata.get("name").map(String::as_str), Some("1_Dakimakura"));
    }

    #[tokio::test]
    async fn delete_reports_existence_once() {
        let bucket = MemoryBucket::default();
        bucket.put("k", PutObject::default()).await.unwrap();
        assert!(bucket.delete("k").await.unwrap());
        assert!(!bucket.delete("k").await.unwrap());
    }
}
