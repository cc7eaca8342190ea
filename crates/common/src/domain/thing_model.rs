use crate::domain::result::{DomainError, DomainResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical data type of a thing-model property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int,
    Float,
    Double,
    Enum,
    Bool,
    Text,
    Date,
    Struct,
    Array,
}

impl DataType {
    /// Every logical type, used for startup exhaustiveness checks
    pub const ALL: [DataType; 9] = [
        DataType::Int,
        DataType::Float,
        DataType::Double,
        DataType::Enum,
        DataType::Bool,
        DataType::Text,
        DataType::Date,
        DataType::Struct,
        DataType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Enum => "enum",
            DataType::Bool => "bool",
            DataType::Text => "text",
            DataType::Date => "date",
            DataType::Struct => "struct",
            DataType::Array => "array",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| DomainError::ValidationError(format!("Unknown data type: {}", s)))
    }
}

/// Kind of thing-model entry; only properties are persisted as columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThingModelKind {
    Property,
    Service,
    Event,
}

impl ThingModelKind {
    /// Stored discriminant in the thing-model table
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ThingModelKind::Property),
            2 => Some(ThingModelKind::Service),
            3 => Some(ThingModelKind::Event),
            _ => None,
        }
    }
}

/// Type information for a property entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    pub data_type: DataType,
    /// Maximum length, only meaningful for text
    pub length: Option<u32>,
}

/// One entry of a product's thing model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingModel {
    pub id: i64,
    pub product_id: i64,
    pub product_key: String,
    pub identifier: String,
    pub name: String,
    pub kind: ThingModelKind,
    pub property: Option<PropertySpec>,
}

/// A thing-model entry of kind property, flattened for schema and read paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub thing_model_id: i64,
    pub identifier: String,
    pub name: String,
    pub data_type: DataType,
    pub length: Option<u32>,
}

/// Keep property entries only, in thing-model order
pub fn property_definitions(thing_models: &[ThingModel]) -> Vec<PropertyDefinition> {
    thing_models
        .iter()
        .filter(|model| model.kind == ThingModelKind::Property)
        .filter_map(|model| {
            model.property.as_ref().map(|spec| PropertyDefinition {
                thing_model_id: model.id,
                identifier: model.identifier.clone(),
                name: model.name.clone(),
                data_type: spec.data_type,
                length: spec.length,
            })
        })
        .collect()
}

/// Read API over thing-model definitions; CRUD lives elsewhere
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThingModelRepository: Send + Sync {
    /// Active thing-model entries of a product, by product id
    async fn list_by_product_id(&self, product_id: i64) -> DomainResult<Vec<ThingModel>>;

    /// Active thing-model entries of a product, by product key
    async fn list_by_product_key(&self, product_key: &str) -> DomainResult<Vec<ThingModel>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: i64, identifier: &str, kind: ThingModelKind, data_type: Option<DataType>) -> ThingModel {
        ThingModel {
            id,
            product_id: 1,
            product_key: "P1".to_string(),
            identifier: identifier.to_string(),
            name: identifier.to_string(),
            kind,
            property: data_type.map(|data_type| PropertySpec {
                data_type,
                length: None,
            }),
        }
    }

    #[test]
    fn test_data_type_round_trips_through_wire_string() {
        for data_type in DataType::ALL {
            assert_eq!(data_type.as_str().parse::<DataType>().unwrap(), data_type);
        }
    }

    #[test]
    fn test_unknown_data_type_is_rejected() {
        let result = "decimal".parse::<DataType>();
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_property_definitions_skip_events_and_services() {
        let models = vec![
            model(1, "temp", ThingModelKind::Property, Some(DataType::Int)),
            model(2, "alarm", ThingModelKind::Event, None),
            model(3, "reboot", ThingModelKind::Service, None),
            model(4, "humidity", ThingModelKind::Property, Some(DataType::Float)),
        ];

        let definitions = property_definitions(&models);

        let identifiers: Vec<&str> = definitions.iter().map(|d| d.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["temp", "humidity"]);
        assert_eq!(definitions[0].thing_model_id, 1);
        assert_eq!(definitions[1].data_type, DataType::Float);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ThingModelKind::from_code(1), Some(ThingModelKind::Property));
        assert_eq!(ThingModelKind::from_code(3), Some(ThingModelKind::Event));
        assert_eq!(ThingModelKind::from_code(9), None);
    }
}
