use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Domain entity for a registered device
///
/// Identified both by `(product_key, device_name)` and by the unique `device_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub device_key: String,
    pub device_name: String,
    pub product_id: i64,
    pub product_key: String,
}

/// Read-only device registry
///
/// A miss is `Ok(None)`; callers decide whether that is `DeviceNotFound`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Look up a device by its product key and device name
    async fn get_device_by_product_key_and_name(
        &self,
        product_key: &str,
        device_name: &str,
    ) -> DomainResult<Option<Device>>;

    /// Look up a device by its unique device key
    async fn get_device_by_key(&self, device_key: &str) -> DomainResult<Option<Device>>;

    /// Look up a device by its numeric id
    async fn get_device(&self, device_id: i64) -> DomainResult<Option<Device>>;
}
