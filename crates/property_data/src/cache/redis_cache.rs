use anyhow::Context;
use async_trait::async_trait;
use common::domain::{DomainError, DomainResult, LatestPropertyValue, LatestPropertyValueCache};
use common::redis::RedisClient;
use redis::AsyncCommands;
use tracing::instrument;

/// Hash holding every latest value of one device, one field per identifier
pub fn device_property_key(product_key: &str, device_name: &str) -> String {
    format!("iot:device_property:{}:{}", product_key, device_name)
}

/// Latest values stored as JSON in a per-device Redis hash
#[derive(Clone)]
pub struct RedisLatestValueCache {
    client: RedisClient,
}

impl RedisLatestValueCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LatestPropertyValueCache for RedisLatestValueCache {
    #[instrument(skip(self))]
    async fn get(
        &self,
        product_key: &str,
        device_name: &str,
        identifier: &str,
    ) -> DomainResult<Option<LatestPropertyValue>> {
        let key = device_property_key(product_key, device_name);
        let mut connection = self.client.connection();

        let raw = connection
            .hget::<&str, &str, Option<String>>(&key, identifier)
            .await
            .context("unable to read latest property value")?;

        raw.map(|raw| {
            serde_json::from_str(&raw)
                .with_context(|| format!("malformed cached value for {} in {}", identifier, key))
                .map_err(DomainError::RepositoryError)
        })
        .transpose()
    }

    #[instrument(skip(self, value), fields(product_key = %value.product_key, device_name = %value.device_name, identifier = %value.identifier))]
    async fn put(&self, value: &LatestPropertyValue) -> DomainResult<()> {
        let key = device_property_key(&value.product_key, &value.device_name);
        let payload = serde_json::to_string(value).context("unable to encode latest property value")?;
        let mut connection = self.client.connection();

        connection
            .hset::<&str, &str, String, ()>(&key, &value.identifier, payload)
            .await
            .context("unable to write latest property value")?;
        Ok(())
    }
}
