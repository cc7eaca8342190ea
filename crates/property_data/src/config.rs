use common::postgres::PostgresConfig;
use common::telemetry::{TelemetryConfig, DEFAULT_OTEL_ENDPOINT, DEFAULT_SERVICE_NAME};
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // ClickHouse configuration
    /// ClickHouse HTTP URL
    #[serde(default = "default_clickhouse_url")]
    pub clickhouse_url: String,

    /// Database holding product and device property tables
    #[serde(default = "default_clickhouse_database")]
    pub clickhouse_database: String,

    #[serde(default = "default_clickhouse_username")]
    pub clickhouse_username: String,

    #[serde(default = "default_clickhouse_password")]
    pub clickhouse_password: String,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    // NATS configuration
    /// NATS server URL
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// JetStream stream capturing reported property messages
    #[serde(default = "default_nats_property_stream")]
    pub nats_property_stream: String,

    /// Base subject for reported property messages
    #[serde(default = "default_nats_property_subject")]
    pub nats_property_subject: String,

    /// JetStream stream capturing simulated messages
    #[serde(default = "default_nats_simulate_stream")]
    pub nats_simulate_stream: String,

    /// Base subject for simulated messages
    #[serde(default = "default_nats_simulate_subject")]
    pub nats_simulate_subject: String,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    // Latest-value cache
    /// `redis` or `memory`
    #[serde(default = "default_cache_backend")]
    pub cache_backend: String,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Deadline for each registry, store, cache and dispatch call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_database() -> String {
    "iot".to_string()
}

fn default_clickhouse_username() -> String {
    "default".to_string()
}

fn default_clickhouse_password() -> String {
    "".to_string()
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "iot".to_string()
}

fn default_postgres_username() -> String {
    "iot".to_string()
}

fn default_postgres_password() -> String {
    "iot".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    10
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_property_stream() -> String {
    "thing_model_messages".to_string()
}

fn default_nats_property_subject() -> String {
    "iot.thing.property".to_string()
}

fn default_nats_simulate_stream() -> String {
    "thing_model_simulations".to_string()
}

fn default_nats_simulate_subject() -> String {
    "iot.thing.simulate".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    30
}

fn default_cache_backend() -> String {
    "redis".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_otel_endpoint() -> String {
    DEFAULT_OTEL_ENDPOINT.to_string()
}

fn default_otel_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_otel_enabled() -> bool {
    false
}

impl ServiceConfig {
    /// Load configuration from `IOT_`-prefixed environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("IOT"))
            .build()?
            .try_deserialize()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
        }
    }
}
