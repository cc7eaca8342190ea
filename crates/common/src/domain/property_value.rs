use crate::domain::result::DomainResult;
use crate::domain::thing_model::DataType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent value of one property of one device
///
/// Metadata fields are denormalized for reads. A row with `value == None` and
/// `updated_at == None` is a placeholder for a property never reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPropertyValue {
    pub device_id: Option<i64>,
    pub product_key: String,
    pub device_name: String,
    pub identifier: String,
    pub thing_model_id: Option<i64>,
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub value: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LatestPropertyValue {
    pub fn is_placeholder(&self) -> bool {
        self.value.is_none() && self.updated_at.is_none()
    }
}

/// Latest-value cache keyed by (product key, device name, identifier)
///
/// Keys are independent; writers to different keys never interfere.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LatestPropertyValueCache: Send + Sync {
    async fn get(
        &self,
        product_key: &str,
        device_name: &str,
        identifier: &str,
    ) -> DomainResult<Option<LatestPropertyValue>>;

    /// Overwrite the cached value for the entry's key
    async fn put(&self, value: &LatestPropertyValue) -> DomainResult<()>;
}
