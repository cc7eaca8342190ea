use serde::{Deserialize, Serialize};

/// PostgreSQL configuration for the device registry and thing-model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "iot".to_string(),
            username: "iot".to_string(),
            password: "iot".to_string(),
            max_pool_size: 10,
        }
    }
}
