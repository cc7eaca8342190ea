use crate::domain::device::Device;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Method tag for a device reporting its properties
pub const PROPERTY_POST_METHOD: &str = "thing.event.property.post";

/// Canonical telemetry envelope handed downstream for persistence and fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingModelMessage {
    pub id: Option<String>,
    pub sys: Option<serde_json::Value>,
    pub method: Option<String>,
    /// Property identifier to reported value
    pub params: Option<serde_json::Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    pub product_key: String,
    pub device_name: String,
    pub device_key: String,
}

/// Trait for handing envelopes to the real persistence/fan-out path
///
/// Implementations should:
/// - Serialize the envelope (JSON)
/// - Publish to the message broker and await acknowledgment
/// - Return error if publish fails
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThingModelMessageProducer: Send + Sync {
    async fn submit(&self, device: &Device, message: &ThingModelMessage) -> DomainResult<()>;
}

/// Trait for the simulated-send channel; never reaches real persistence
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SimulatedMessageProducer: Send + Sync {
    async fn submit_simulated(&self, message: &ThingModelMessage) -> DomainResult<()>;
}
