use async_trait::async_trait;
use bytes::Bytes;
use common::domain::{
    Device, DomainError, DomainResult, SimulatedMessageProducer, ThingModelMessage,
    ThingModelMessageProducer,
};
use common::nats::JetStreamPublisher;
use std::sync::Arc;
use tracing::debug;

/// Make a value safe to use as one NATS subject token
fn subject_token(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// `{base}.{productKey}.{deviceName}`
fn message_subject(base_subject: &str, message: &ThingModelMessage) -> String {
    format!(
        "{}.{}.{}",
        base_subject,
        subject_token(&message.product_key),
        subject_token(&message.device_name)
    )
}

async fn publish_json(
    publisher: &dyn JetStreamPublisher,
    subject: String,
    message: &ThingModelMessage,
) -> DomainResult<()> {
    let payload = serde_json::to_vec(message).map_err(|e| DomainError::RepositoryError(e.into()))?;

    debug!(subject = %subject, payload_size = payload.len(), "publishing thing model message");
    publisher
        .publish(subject, Bytes::from(payload))
        .await
        .map_err(DomainError::RepositoryError)
}

/// Publishes reported property messages for persistence and fan-out
pub struct NatsThingModelMessageProducer {
    publisher: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsThingModelMessageProducer {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        debug!(base_subject = %base_subject, "initialized NatsThingModelMessageProducer");
        Self {
            publisher,
            base_subject,
        }
    }
}

#[async_trait]
impl ThingModelMessageProducer for NatsThingModelMessageProducer {
    async fn submit(&self, device: &Device, message: &ThingModelMessage) -> DomainResult<()> {
        debug!(device_id = device.id, message_id = ?message.id, "submitting message");
        let subject = message_subject(&self.base_subject, message);
        publish_json(self.publisher.as_ref(), subject, message).await
    }
}

/// Publishes simulated messages on a subject real persistence never consumes
pub struct NatsSimulatedMessageProducer {
    publisher: Arc<dyn JetStreamPublisher>,
    base_subject: String,
}

impl NatsSimulatedMessageProducer {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>, base_subject: String) -> Self {
        debug!(base_subject = %base_subject, "initialized NatsSimulatedMessageProducer");
        Self {
            publisher,
            base_subject,
        }
    }
}

#[async_trait]
impl SimulatedMessageProducer for NatsSimulatedMessageProducer {
    async fn submit_simulated(&self, message: &ThingModelMessage) -> DomainResult<()> {
        let subject = message_subject(&self.base_subject, message);
        publish_json(self.publisher.as_ref(), subject, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::nats::MockJetStreamPublisher;

    fn message() -> ThingModelMessage {
        ThingModelMessage {
            id: Some("m-1".to_string()),
            sys: None,
            method: Some("thing.event.property.post".to_string()),
            params: Some(serde_json::json!({"temp": 20})),
            time: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            product_key: "P1".to_string(),
            device_name: "lab.sensor 1".to_string(),
            device_key: "K1".to_string(),
        }
    }

    fn device() -> Device {
        Device {
            id: 42,
            device_key: "K1".to_string(),
            device_name: "lab.sensor 1".to_string(),
            product_id: 10,
            product_key: "P1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_publishes_json_on_device_subject() {
        let mut mock_publisher = MockJetStreamPublisher::new();
        mock_publisher
            .expect_publish()
            .withf(|subject: &String, payload: &Bytes| {
                let body: serde_json::Value = serde_json::from_slice(payload).unwrap();
                subject == "iot.property.P1.lab_sensor_1"
                    && body["params"]["temp"] == 20
                    && body["time"] == 1_700_000_000_000i64
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let producer =
            NatsThingModelMessageProducer::new(Arc::new(mock_publisher), "iot.property".to_string());

        producer.submit(&device(), &message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_simulated_messages_use_their_own_subject() {
        let mut mock_publisher = MockJetStreamPublisher::new();
        mock_publisher
            .expect_publish()
            .withf(|subject: &String, _payload: &Bytes| subject == "iot.simulate.P1.lab_sensor_1")
            .times(1)
            .returning(|_, _| Ok(()));

        let producer =
            NatsSimulatedMessageProducer::new(Arc::new(mock_publisher), "iot.simulate".to_string());

        producer.submit_simulated(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_error_maps_to_repository_error() {
        let mut mock_publisher = MockJetStreamPublisher::new();
        mock_publisher
            .expect_publish()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("NATS publish failed")));

        let producer =
            NatsThingModelMessageProducer::new(Arc::new(mock_publisher), "iot.property".to_string());

        let result = producer.submit(&device(), &message()).await;

        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }
}
