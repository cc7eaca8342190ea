use crate::cache::{InMemoryLatestValueCache, RedisLatestValueCache};
use crate::clickhouse::ClickHousePropertyTableStore;
use crate::config::ServiceConfig;
use crate::domain::{DevicePropertyDataService, PropertyDataDependencies};
use crate::nats::{NatsSimulatedMessageProducer, NatsThingModelMessageProducer};
use anyhow::{bail, Context};
use common::clickhouse::ClickHouseClient;
use common::domain::LatestPropertyValueCache;
use common::nats::NatsClient;
use common::postgres::{
    PostgresClient, PostgresDeviceRepository, PostgresProductRepository,
    PostgresThingModelRepository,
};
use common::redis::RedisClient;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Where latest property values are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => bail!("unknown cache backend: {}", other),
        }
    }
}

/// Wires the property data services onto PostgreSQL, ClickHouse, NATS and the cache
pub struct PropertyDataModule;

impl PropertyDataModule {
    pub async fn connect(config: &ServiceConfig) -> anyhow::Result<DevicePropertyDataService> {
        let cache_backend = CacheBackend::from_str(&config.cache_backend)?;

        info!("Initializing PostgreSQL...");
        let postgres_client = PostgresClient::new(&config.postgres_config())?;
        postgres_client
            .ping()
            .await
            .context("PostgreSQL is not reachable")?;

        info!("Initializing ClickHouse...");
        let clickhouse_client = ClickHouseClient::new(
            &config.clickhouse_url,
            &config.clickhouse_database,
            &config.clickhouse_username,
            &config.clickhouse_password,
        );
        clickhouse_client
            .ping()
            .await
            .context("ClickHouse is not reachable")?;

        info!("Initializing NATS...");
        let nats_client = NatsClient::connect(&config.nats_url, config.startup_timeout()).await?;
        nats_client
            .ensure_stream(&config.nats_property_stream, &config.nats_property_subject)
            .await?;
        nats_client
            .ensure_stream(&config.nats_simulate_stream, &config.nats_simulate_subject)
            .await?;
        let publisher = nats_client.create_publisher_client();

        let cache: Arc<dyn LatestPropertyValueCache> = match cache_backend {
            CacheBackend::Redis => {
                info!("Initializing Redis...");
                let redis_client = RedisClient::connect(&config.redis_url).await?;
                redis_client.ping().await?;
                Arc::new(RedisLatestValueCache::new(redis_client))
            }
            CacheBackend::Memory => Arc::new(InMemoryLatestValueCache::new()),
        };

        let service = DevicePropertyDataService::new(PropertyDataDependencies {
            device_repository: Arc::new(PostgresDeviceRepository::new(postgres_client.clone())),
            product_repository: Arc::new(PostgresProductRepository::new(postgres_client.clone())),
            thing_model_repository: Arc::new(PostgresThingModelRepository::new(postgres_client)),
            table_store: Arc::new(ClickHousePropertyTableStore::new(clickhouse_client)),
            cache,
            producer: Arc::new(NatsThingModelMessageProducer::new(
                publisher.clone(),
                config.nats_property_subject.clone(),
            )),
            simulated_producer: Arc::new(NatsSimulatedMessageProducer::new(
                publisher,
                config.nats_simulate_subject.clone(),
            )),
            database: config.clickhouse_database.clone(),
            call_timeout: config.call_timeout(),
        })?;

        info!(
            cache_backend = ?cache_backend,
            call_timeout_ms = config.call_timeout_ms,
            "property data services ready"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_backend_parsing() {
        assert_eq!(CacheBackend::from_str("redis").unwrap(), CacheBackend::Redis);
        assert_eq!(CacheBackend::from_str(" Memory ").unwrap(), CacheBackend::Memory);
        assert!(CacheBackend::from_str("memcached").is_err());
    }
}
