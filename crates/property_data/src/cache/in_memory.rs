use async_trait::async_trait;
use common::domain::{DomainResult, LatestPropertyValue, LatestPropertyValueCache};
use std::collections::HashMap;
use tokio::sync::RwLock;

type CacheKey = (String, String, String);

/// Process-local latest-value cache
#[derive(Default)]
pub struct InMemoryLatestValueCache {
    entries: RwLock<HashMap<CacheKey, LatestPropertyValue>>,
}

impl InMemoryLatestValueCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LatestPropertyValueCache for InMemoryLatestValueCache {
    async fn get(
        &self,
        product_key: &str,
        device_name: &str,
        identifier: &str,
    ) -> DomainResult<Option<LatestPropertyValue>> {
        let key = (
            product_key.to_string(),
            device_name.to_string(),
            identifier.to_string(),
        );
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn put(&self, value: &LatestPropertyValue) -> DomainResult<()> {
        let key = (
            value.product_key.clone(),
            value.device_name.clone(),
            value.identifier.clone(),
        );
        self.entries.write().await.insert(key, value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn entry(device_name: &str, identifier: &str, value: serde_json::Value) -> LatestPropertyValue {
        LatestPropertyValue {
            device_id: None,
            product_key: "P1".to_string(),
            device_name: device_name.to_string(),
            identifier: identifier.to_string(),
            thing_model_id: None,
            name: None,
            data_type: None,
            value: Some(value),
            updated_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let cache = InMemoryLatestValueCache::new();

        assert_eq!(cache.get("P1", "D1", "temp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let cache = InMemoryLatestValueCache::new();

        cache.put(&entry("D1", "temp", json!(20))).await.unwrap();
        cache.put(&entry("D1", "temp", json!(21))).await.unwrap();

        let value = cache.get("P1", "D1", "temp").await.unwrap().unwrap();
        assert_eq!(value.value, Some(json!(21)));
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_different_keys() {
        let cache = Arc::new(InMemoryLatestValueCache::new());

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache
                        .put(&entry(&format!("D{}", i), "temp", json!(i)))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        for i in 0..16 {
            let value = cache
                .get("P1", &format!("D{}", i), "temp")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(value.value, Some(json!(i)));
        }
    }
}
