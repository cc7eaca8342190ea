use common::domain::{
    with_deadline, Device, DeviceRepository, DomainError, DomainResult, SimulatedMessageProducer,
    ThingModelMessage, ThingModelMessageProducer, DEFAULT_CALL_TIMEOUT, PROPERTY_POST_METHOD,
};
use common::garde::validate_struct;
use chrono::{DateTime, TimeZone, Utc};
use garde::Validate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Simulated report for a device, addressed by device key
#[derive(Debug, Clone, Validate)]
pub struct SimulateInput {
    #[garde(length(min = 1))]
    pub device_key: String,
    /// JSON object of property identifier to value
    #[garde(length(min = 1))]
    pub content: String,
    #[garde(skip)]
    pub report_time: DateTime<Utc>,
    #[garde(length(min = 1))]
    pub product_key: String,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    id: Option<String>,
    sys: Option<serde_json::Value>,
    method: Option<String>,
    params: Option<serde_json::Value>,
    time: Option<EpochMillis>,
}

/// Epoch milliseconds sent either as a JSON number or as a numeric string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpochMillis {
    Number(i64),
    Text(String),
}

impl EpochMillis {
    fn to_datetime(&self) -> DomainResult<DateTime<Utc>> {
        let millis = match self {
            EpochMillis::Number(millis) => *millis,
            EpochMillis::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                DomainError::PayloadParseError(format!("time {:?} is not epoch milliseconds", text))
            })?,
        };
        Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            DomainError::PayloadParseError(format!("time {} is out of range", millis))
        })
    }
}

/// Parse a device-reported payload into an envelope for `device`
///
/// A missing `time` falls back to `received_at`.
pub fn parse_payload(
    device: &Device,
    raw: &[u8],
    received_at: DateTime<Utc>,
) -> DomainResult<ThingModelMessage> {
    let payload: RawPayload = serde_json::from_slice(raw)
        .map_err(|e| DomainError::PayloadParseError(e.to_string()))?;

    let time = match &payload.time {
        Some(time) => time.to_datetime()?,
        None => received_at,
    };

    Ok(ThingModelMessage {
        id: payload.id,
        sys: payload.sys,
        method: payload.method,
        params: payload.params,
        time,
        product_key: device.product_key.clone(),
        device_name: device.device_name.clone(),
        device_key: device.device_key.clone(),
    })
}

/// Parse simulated content; only a JSON object is accepted
fn parse_content(content: &str) -> DomainResult<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| DomainError::ContentParseError(e.to_string()))?;
    if !value.is_object() {
        return Err(DomainError::ContentParseError(
            "content must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Turns device telemetry into envelopes and hands them downstream
///
/// The device is always resolved before anything else; a failed lookup
/// leaves the producers untouched.
pub struct IngestionService {
    device_repository: Arc<dyn DeviceRepository>,
    producer: Arc<dyn ThingModelMessageProducer>,
    simulated_producer: Arc<dyn SimulatedMessageProducer>,
    call_timeout: Duration,
}

impl IngestionService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        producer: Arc<dyn ThingModelMessageProducer>,
        simulated_producer: Arc<dyn SimulatedMessageProducer>,
    ) -> Self {
        Self {
            device_repository,
            producer,
            simulated_producer,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    async fn resolve_device(&self, product_key: &str, device_name: &str) -> DomainResult<Device> {
        with_deadline(
            "get_device_by_product_key_and_name",
            self.call_timeout,
            self.device_repository
                .get_device_by_product_key_and_name(product_key, device_name),
        )
        .await?
        .ok_or_else(|| DomainError::DeviceNotFound(format!("{}/{}", product_key, device_name)))
    }

    /// Reported telemetry from a device
    #[instrument(skip(self, raw), fields(payload_size = raw.len()))]
    pub async fn ingest(
        &self,
        product_key: &str,
        device_name: &str,
        raw: &[u8],
    ) -> DomainResult<ThingModelMessage> {
        let device = self.resolve_device(product_key, device_name).await?;
        let message = parse_payload(&device, raw, Utc::now())?;

        with_deadline(
            "submit",
            self.call_timeout,
            self.producer.submit(&device, &message),
        )
        .await?;

        debug!(message_id = ?message.id, method = ?message.method, "ingested device payload");
        Ok(message)
    }

    /// Forward an already-built envelope unchanged
    #[instrument(skip(self, message), fields(product_key = %message.product_key, device_name = %message.device_name))]
    pub async fn ingest_envelope(&self, message: &ThingModelMessage) -> DomainResult<()> {
        let device = self
            .resolve_device(&message.product_key, &message.device_name)
            .await?;

        with_deadline(
            "submit",
            self.call_timeout,
            self.producer.submit(&device, message),
        )
        .await?;

        debug!(message_id = ?message.id, "forwarded envelope");
        Ok(())
    }

    /// Simulated property report, sent to the simulation channel only
    #[instrument(skip(self, input), fields(device_key = %input.device_key, product_key = %input.product_key))]
    pub async fn simulate(&self, input: &SimulateInput) -> DomainResult<ThingModelMessage> {
        validate_struct(input)?;

        let device = with_deadline(
            "get_device_by_key",
            self.call_timeout,
            self.device_repository.get_device_by_key(&input.device_key),
        )
        .await?
        .ok_or_else(|| DomainError::DeviceNotFound(input.device_key.clone()))?;

        let params = parse_content(&input.content)?;

        let message = ThingModelMessage {
            id: Some(xid::new().to_string()),
            sys: None,
            method: Some(PROPERTY_POST_METHOD.to_string()),
            params: Some(params),
            time: input.report_time,
            product_key: input.product_key.clone(),
            device_name: device.device_name.clone(),
            device_key: device.device_key.clone(),
        };

        with_deadline(
            "submit_simulated",
            self.call_timeout,
            self.simulated_producer.submit_simulated(&message),
        )
        .await?;

        info!(message_id = ?message.id, device_name = %device.device_name, "simulated property report sent");
        Ok(message)
    }
}
