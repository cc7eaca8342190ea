use crate::domain::{Device, DeviceRepository, DomainError, DomainResult};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tokio_postgres::Row;
use tracing::{debug, instrument};

const DEVICE_COLUMNS: &str = "id, device_key, device_name, product_id, product_key";

/// Device row as stored in `iot_device`
#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub id: i64,
    pub device_key: String,
    pub device_name: String,
    pub product_id: i64,
    pub product_key: String,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            id: row.get(0),
            device_key: row.get(1),
            device_name: row.get(2),
            product_id: row.get(3),
            product_key: row.get(4),
        }
    }
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Device {
            id: row.id,
            device_key: row.device_key,
            device_name: row.device_name,
            product_id: row.product_id,
            product_key: row.product_key,
        }
    }
}

/// PostgreSQL implementation of the read-only device registry
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn query_one_device(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let sql = format!(
            "SELECT {} FROM iot_device WHERE {} AND deleted = FALSE LIMIT 1",
            DEVICE_COLUMNS, filter
        );

        let row = conn
            .query_opt(sql.as_str(), params)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| Device::from(DeviceRow::from(&row))))
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(skip(self))]
    async fn get_device_by_product_key_and_name(
        &self,
        product_key: &str,
        device_name: &str,
    ) -> DomainResult<Option<Device>> {
        let device = self
            .query_one_device("product_key = $1 AND device_name = $2", &[&product_key, &device_name])
            .await?;
        debug!(found = device.is_some(), "looked up device by product key and name");
        Ok(device)
    }

    #[instrument(skip(self))]
    async fn get_device_by_key(&self, device_key: &str) -> DomainResult<Option<Device>> {
        let device = self.query_one_device("device_key = $1", &[&device_key]).await?;
        debug!(found = device.is_some(), "looked up device by key");
        Ok(device)
    }

    #[instrument(skip(self))]
    async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>> {
        self.query_one_device("id = $1", &[&device_id]).await
    }
}
