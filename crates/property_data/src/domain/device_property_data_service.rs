use crate::domain::{
    verify_type_mapping, HistoryQueryInput, HistoryQueryService, IngestionService,
    LatestPropertiesInput, LatestPropertyService, SchemaSyncOutcome, SchemaSynchronizer,
    SimulateInput,
};
use common::domain::{
    DeviceRepository, DomainResult, HistoryPage, LatestPropertyValue, LatestPropertyValueCache,
    ProductRepository, PropertyTableStore, SimulatedMessageProducer, ThingModelMessage,
    ThingModelMessageProducer, ThingModelRepository,
};
use std::sync::Arc;
use std::time::Duration;

/// Collaborators the property data services are built from
#[derive(Clone)]
pub struct PropertyDataDependencies {
    pub device_repository: Arc<dyn DeviceRepository>,
    pub product_repository: Arc<dyn ProductRepository>,
    pub thing_model_repository: Arc<dyn ThingModelRepository>,
    pub table_store: Arc<dyn PropertyTableStore>,
    pub cache: Arc<dyn LatestPropertyValueCache>,
    pub producer: Arc<dyn ThingModelMessageProducer>,
    pub simulated_producer: Arc<dyn SimulatedMessageProducer>,
    /// Database that holds the per-device tables
    pub database: String,
    pub call_timeout: Duration,
}

/// Entry point for device property data: schema, ingestion and reads
pub struct DevicePropertyDataService {
    schema_synchronizer: SchemaSynchronizer,
    ingestion: IngestionService,
    latest: LatestPropertyService,
    history: HistoryQueryService,
}

impl DevicePropertyDataService {
    /// Fails if the data type mapping is incomplete
    pub fn new(deps: PropertyDataDependencies) -> DomainResult<Self> {
        verify_type_mapping()?;

        Ok(Self {
            schema_synchronizer: SchemaSynchronizer::new(
                deps.product_repository,
                deps.thing_model_repository.clone(),
                deps.table_store.clone(),
            )
            .with_call_timeout(deps.call_timeout),
            ingestion: IngestionService::new(
                deps.device_repository.clone(),
                deps.producer,
                deps.simulated_producer,
            )
            .with_call_timeout(deps.call_timeout),
            latest: LatestPropertyService::new(
                deps.device_repository.clone(),
                deps.thing_model_repository,
                deps.cache,
            )
            .with_call_timeout(deps.call_timeout),
            history: HistoryQueryService::new(deps.device_repository, deps.table_store, deps.database)
                .with_call_timeout(deps.call_timeout),
        })
    }

    pub async fn synchronize_schema(&self, product_id: i64) -> DomainResult<SchemaSyncOutcome> {
        self.schema_synchronizer.synchronize(product_id).await
    }

    pub async fn ingest(
        &self,
        product_key: &str,
        device_name: &str,
        raw: &[u8],
    ) -> DomainResult<ThingModelMessage> {
        self.ingestion.ingest(product_key, device_name, raw).await
    }

    pub async fn ingest_envelope(&self, message: &ThingModelMessage) -> DomainResult<()> {
        self.ingestion.ingest_envelope(message).await
    }

    pub async fn simulate(&self, input: &SimulateInput) -> DomainResult<ThingModelMessage> {
        self.ingestion.simulate(input).await
    }

    pub async fn latest_properties(
        &self,
        input: &LatestPropertiesInput,
    ) -> DomainResult<Vec<LatestPropertyValue>> {
        self.latest.latest_properties(input).await
    }

    pub async fn history(&self, input: &HistoryQueryInput) -> DomainResult<HistoryPage> {
        self.history.history(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryLatestValueCache;
    use chrono::{TimeZone, Utc};
    use common::domain::{
        DataType, Device, DomainError, MockDeviceRepository, MockProductRepository,
        MockPropertyTableStore, MockSimulatedMessageProducer, MockThingModelMessageProducer,
        MockThingModelRepository, PropertySpec, ThingModel, ThingModelKind,
    };
    use serde_json::json;

    fn test_device() -> Device {
        Device {
            id: 42,
            device_key: "K1".to_string(),
            device_name: "D1".to_string(),
            product_id: 10,
            product_key: "P1".to_string(),
        }
    }

    fn deps(
        devices: MockDeviceRepository,
        thing_models: MockThingModelRepository,
        cache: Arc<dyn LatestPropertyValueCache>,
    ) -> PropertyDataDependencies {
        PropertyDataDependencies {
            device_repository: Arc::new(devices),
            product_repository: Arc::new(MockProductRepository::new()),
            thing_model_repository: Arc::new(thing_models),
            table_store: Arc::new(MockPropertyTableStore::new()),
            cache,
            producer: Arc::new(MockThingModelMessageProducer::new()),
            simulated_producer: Arc::new(MockSimulatedMessageProducer::new()),
            database: "iot".to_string(),
            call_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_latest_properties_reads_through_cache() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .returning(|_| Ok(Some(test_device())));
        let mut thing_models = MockThingModelRepository::new();
        thing_models.expect_list_by_product_key().returning(|_| {
            Ok(vec![
                ThingModel {
                    id: 1,
                    product_id: 10,
                    product_key: "P1".to_string(),
                    identifier: "temp".to_string(),
                    name: "Temperature".to_string(),
                    kind: ThingModelKind::Property,
                    property: Some(PropertySpec {
                        data_type: DataType::Int,
                        length: None,
                    }),
                },
                ThingModel {
                    id: 2,
                    product_id: 10,
                    product_key: "P1".to_string(),
                    identifier: "humidity".to_string(),
                    name: "Humidity".to_string(),
                    kind: ThingModelKind::Property,
                    property: Some(PropertySpec {
                        data_type: DataType::Float,
                        length: None,
                    }),
                },
            ])
        });

        let cache = Arc::new(InMemoryLatestValueCache::new());
        cache
            .put(&LatestPropertyValue {
                device_id: None,
                product_key: "P1".to_string(),
                device_name: "D1".to_string(),
                identifier: "humidity".to_string(),
                thing_model_id: None,
                name: None,
                data_type: None,
                value: Some(json!(55.5)),
                updated_at: Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
            })
            .await
            .unwrap();

        let service = DevicePropertyDataService::new(deps(devices, thing_models, cache)).unwrap();

        let values = service
            .latest_properties(&LatestPropertiesInput {
                device_id: 42,
                identifier: None,
                name: None,
            })
            .await
            .unwrap();

        assert_eq!(values.len(), 2);
        assert!(values[0].is_placeholder());
        assert_eq!(values[1].value, Some(json!(55.5)));
        assert_eq!(values[1].name.as_deref(), Some("Humidity"));
    }

    #[tokio::test]
    async fn test_ingest_unknown_device() {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device_by_product_key_and_name()
            .returning(|_, _| Ok(None));

        let service = DevicePropertyDataService::new(deps(
            devices,
            MockThingModelRepository::new(),
            Arc::new(InMemoryLatestValueCache::new()),
        ))
        .unwrap();

        let result = service.ingest("P1", "D1", br#"{"params":{}}"#).await;

        assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
    }
}
