use anyhow::{Context, Result};
use ::redis::aio::MultiplexedConnection;
use tracing::{debug, info};

/// Redis client holding one multiplexed connection shared by all callers
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %url, "Connecting to Redis");

        let client = ::redis::Client::open(url).context("invalid redis url")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("unable to connect to redis")?;

        Ok(Self { connection })
    }

    pub async fn ping(&self) -> Result<()> {
        let mut connection = self.connection();
        let _: String = ::redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .context("redis ping failed")?;
        debug!("redis connection successful");
        Ok(())
    }

    /// Cheap handle onto the shared connection
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}
