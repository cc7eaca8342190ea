use common::domain::{
    property_definitions, with_deadline, Device, DeviceRepository, DomainError, DomainResult,
    LatestPropertyValue, LatestPropertyValueCache, PropertyDefinition, ThingModelRepository,
    DEFAULT_CALL_TIMEOUT,
};
use common::garde::validate_struct;
use futures::future::try_join_all;
use garde::Validate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Validate)]
pub struct LatestPropertiesInput {
    #[garde(range(min = 1))]
    pub device_id: i64,
    /// Case-insensitive substring of the identifier only
    #[garde(skip)]
    pub identifier: Option<String>,
    /// Case-insensitive substring of the display name only
    #[garde(skip)]
    pub name: Option<String>,
}

/// Keep definitions whose identifier contains `identifier` and whose display
/// name contains `name`, ignoring case
///
/// Empty or absent filters match everything; when both are set both must match.
pub fn filter_definitions(
    definitions: Vec<PropertyDefinition>,
    identifier: Option<&str>,
    name: Option<&str>,
) -> Vec<PropertyDefinition> {
    let identifier = identifier.map(str::to_lowercase).filter(|f| !f.is_empty());
    let name = name.map(str::to_lowercase).filter(|f| !f.is_empty());
    if identifier.is_none() && name.is_none() {
        return definitions;
    }

    let contains = |value: &str, filter: Option<&str>| {
        filter.map_or(true, |filter| value.to_lowercase().contains(filter))
    };

    definitions
        .into_iter()
        .filter(|definition| {
            contains(&definition.identifier, identifier.as_deref())
                && contains(&definition.name, name.as_deref())
        })
        .collect()
}

/// One row per definition, in definition order
///
/// Cached values are decorated with the definition's metadata; definitions
/// with no cached value get a placeholder.
pub fn merge_latest_values(
    device: &Device,
    definitions: &[PropertyDefinition],
    cached: Vec<Option<LatestPropertyValue>>,
) -> Vec<LatestPropertyValue> {
    definitions
        .iter()
        .zip(cached.into_iter().chain(std::iter::repeat(None)))
        .map(|(definition, cached)| {
            let (value, updated_at) = match cached {
                Some(entry) => (entry.value, entry.updated_at),
                None => (None, None),
            };
            LatestPropertyValue {
                device_id: Some(device.id),
                product_key: device.product_key.clone(),
                device_name: device.device_name.clone(),
                identifier: definition.identifier.clone(),
                thing_model_id: Some(definition.thing_model_id),
                name: Some(definition.name.clone()),
                data_type: Some(definition.data_type),
                value,
                updated_at,
            }
        })
        .collect()
}

/// Current property state of a device: the thing model joined with the cache
pub struct LatestPropertyService {
    device_repository: Arc<dyn DeviceRepository>,
    thing_model_repository: Arc<dyn ThingModelRepository>,
    cache: Arc<dyn LatestPropertyValueCache>,
    call_timeout: Duration,
}

impl LatestPropertyService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        thing_model_repository: Arc<dyn ThingModelRepository>,
        cache: Arc<dyn LatestPropertyValueCache>,
    ) -> Self {
        Self {
            device_repository,
            thing_model_repository,
            cache,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    #[instrument(skip(self, input), fields(device_id = input.device_id))]
    pub async fn latest_properties(
        &self,
        input: &LatestPropertiesInput,
    ) -> DomainResult<Vec<LatestPropertyValue>> {
        validate_struct(input)?;

        let device = with_deadline(
            "get_device",
            self.call_timeout,
            self.device_repository.get_device(input.device_id),
        )
        .await?
        .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.to_string()))?;

        let thing_models = with_deadline(
            "list_thing_models",
            self.call_timeout,
            self.thing_model_repository.list_by_product_key(&device.product_key),
        )
        .await?;

        let definitions = filter_definitions(
            property_definitions(&thing_models),
            input.identifier.as_deref(),
            input.name.as_deref(),
        );

        let cached = try_join_all(definitions.iter().map(|definition| {
            with_deadline(
                "get_latest_value",
                self.call_timeout,
                self.cache
                    .get(&device.product_key, &device.device_name, &definition.identifier),
            )
        }))
        .await?;

        let values = merge_latest_values(&device, &definitions, cached);
        debug!(
            product_key = %device.product_key,
            device_name = %device.device_name,
            property_count = values.len(),
            reported = values.iter().filter(|v| !v.is_placeholder()).count(),
            "resolved latest properties"
        );
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::domain::{
        DataType, MockDeviceRepository, MockLatestPropertyValueCache, MockThingModelRepository,
        PropertySpec, ThingModel, ThingModelKind,
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

    fn model(id: i64, identifier: &str, name: &str, data_type: DataType) -> ThingModel {
        ThingModel {
            id,
            product_id: 10,
            product_key: "P1".to_string(),
            identifier: identifier.to_string(),
            name: name.to_string(),
            kind: ThingModelKind::Property,
            property: Some(PropertySpec {
                data_type,
                length: None,
            }),
        }
    }

    fn cached(identifier: &str, value: serde_json::Value) -> LatestPropertyValue {
        LatestPropertyValue {
            device_id: None,
            product_key: "P1".to_string(),
            device_name: "D1".to_string(),
            identifier: identifier.to_string(),
            thing_model_id: None,
            name: None,
            data_type: None,
            value: Some(value),
            updated_at: Some(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
        }
    }

    fn service(models: Vec<ThingModel>, cache: MockLatestPropertyValueCache) -> LatestPropertyService {
        let mut devices = MockDeviceRepository::new();
        devices
            .expect_get_device()
            .withf(|id: &i64| *id == 42)
            .returning(|_| Ok(Some(test_device())));
        let mut thing_models = MockThingModelRepository::new();
        thing_models
            .expect_list_by_product_key()
            .withf(|key: &str| key == "P1")
            .returning(move |_| Ok(models.clone()));

        LatestPropertyService::new(Arc::new(devices), Arc::new(thing_models), Arc::new(cache))
    }

    fn input(identifier: Option<&str>, name: Option<&str>) -> LatestPropertiesInput {
        LatestPropertiesInput {
            device_id: 42,
            identifier: identifier.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_one_row_per_definition_with_placeholders() {
        let models = vec![
            model(1, "temp", "Temperature", DataType::Int),
            model(2, "humidity", "Humidity", DataType::Float),
            model(3, "label", "Label", DataType::Text),
        ];
        let mut cache = MockLatestPropertyValueCache::new();
        cache
            .expect_get()
            .returning(|_, _, identifier| match identifier {
                "temp" => Ok(Some(cached("temp", json!(21)))),
                _ => Ok(None),
            });

        let values = service(models, cache)
            .latest_properties(&input(None, None))
            .await
            .unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values.iter().filter(|v| v.is_placeholder()).count(), 2);
        let identifiers: Vec<_> = values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["temp", "humidity", "label"]);

        assert_eq!(values[0].value, Some(json!(21)));
        assert_eq!(values[0].thing_model_id, Some(1));
        assert_eq!(values[0].name.as_deref(), Some("Temperature"));

        let placeholder = &values[1];
        assert_eq!(placeholder.device_id, Some(42));
        assert_eq!(placeholder.thing_model_id, Some(2));
        assert_eq!(placeholder.data_type, Some(DataType::Float));
        assert_eq!(placeholder.value, None);
        assert_eq!(placeholder.updated_at, None);
    }

    #[tokio::test]
    async fn test_identifier_filter_is_case_insensitive_substring() {
        let models = vec![
            model(1, "Temperature", "Room temperature", DataType::Double),
            model(2, "humidity", "Humidity", DataType::Float),
            model(3, "tempMax", "Max", DataType::Int),
        ];
        let mut cache = MockLatestPropertyValueCache::new();
        cache.expect_get().times(2).returning(|_, _, _| Ok(None));

        let values = service(models, cache)
            .latest_properties(&input(Some("temp"), None))
            .await
            .unwrap();

        let identifiers: Vec<_> = values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["Temperature", "tempMax"]);
    }

    #[tokio::test]
    async fn test_name_filter_matches_display_name() {
        let models = vec![
            model(1, "t1", "Outdoor sensor", DataType::Double),
            model(2, "t2", "Indoor", DataType::Double),
        ];
        let mut cache = MockLatestPropertyValueCache::new();
        cache.expect_get().times(1).returning(|_, _, _| Ok(None));

        let values = service(models, cache)
            .latest_properties(&input(None, Some("OUTDOOR")))
            .await
            .unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].identifier, "t1");
    }

    #[tokio::test]
    async fn test_events_and_services_are_not_listed() {
        let mut event = model(9, "overheat", "Overheat", DataType::Bool);
        event.kind = ThingModelKind::Event;
        event.property = None;
        let models = vec![model(1, "temp", "Temperature", DataType::Int), event];
        let mut cache = MockLatestPropertyValueCache::new();
        cache.expect_get().times(1).returning(|_, _, _| Ok(None));

        let values = service(models, cache)
            .latest_properties(&input(None, None))
            .await
            .unwrap();

        assert_eq!(values.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let mut devices = MockDeviceRepository::new();
        devices.expect_get_device().returning(|_| Ok(None));
        let mut thing_models = MockThingModelRepository::new();
        thing_models.expect_list_by_product_key().times(0);
        let mut cache = MockLatestPropertyValueCache::new();
        cache.expect_get().times(0);

        let svc = LatestPropertyService::new(Arc::new(devices), Arc::new(thing_models), Arc::new(cache));

        let result = svc.latest_properties(&input(None, None)).await;

        assert!(matches!(result, Err(DomainError::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_cache_error_propagates() {
        let mut cache = MockLatestPropertyValueCache::new();
        cache
            .expect_get()
            .returning(|_, _, _| Err(DomainError::RepositoryError(anyhow::anyhow!("redis down"))));

        let result = service(vec![model(1, "temp", "Temperature", DataType::Int)], cache)
            .latest_properties(&input(None, None))
            .await;

        assert!(matches!(result, Err(DomainError::RepositoryError(_))));
    }

    #[test]
    fn test_identifier_filter_ignores_display_name() {
        let definitions = property_definitions(&[
            model(1, "Temperature", "Temperature", DataType::Double),
            model(2, "humidity", "Humidity (temp compensated)", DataType::Float),
            model(3, "tempMax", "Max", DataType::Int),
        ]);

        let kept = filter_definitions(definitions, Some("temp"), None);

        let identifiers: Vec<_> = kept.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["Temperature", "tempMax"]);
    }

    #[test]
    fn test_name_filter_ignores_identifier() {
        let definitions = property_definitions(&[
            model(1, "outdoor", "Temperature", DataType::Double),
            model(2, "t2", "Outdoor", DataType::Double),
        ]);

        let kept = filter_definitions(definitions, None, Some("outdoor"));

        let identifiers: Vec<_> = kept.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["t2"]);
    }

    #[test]
    fn test_both_filters_must_match() {
        let definitions = property_definitions(&[
            model(1, "temp", "Outdoor", DataType::Double),
            model(2, "humidity", "Indoor", DataType::Float),
            model(3, "tempMax", "Indoor max", DataType::Int),
        ]);

        let kept = filter_definitions(definitions, Some("temp"), Some("outdoor"));

        let identifiers: Vec<_> = kept.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["temp"]);
    }

    #[test]
    fn test_empty_filters_keep_everything() {
        let definitions = property_definitions(&[
            model(1, "a", "A", DataType::Int),
            model(2, "b", "B", DataType::Int),
        ]);

        let kept = filter_definitions(definitions, Some(""), None);

        assert_eq!(kept.len(), 2);
    }
}
