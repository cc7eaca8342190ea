use common::domain::{DataType, DomainError, DomainResult, StorageType};
use std::collections::HashSet;
use tracing::debug;

/// Storage column type for a thing-model data type
///
/// Enum and bool are stored as TINYINT; struct and array are stored as their
/// serialized JSON text in NCHAR.
pub fn storage_type_for(data_type: DataType) -> StorageType {
    match data_type {
        DataType::Int => StorageType::Int,
        DataType::Float => StorageType::Float,
        DataType::Double => StorageType::Double,
        DataType::Enum => StorageType::TinyInt,
        DataType::Bool => StorageType::TinyInt,
        DataType::Text => StorageType::NChar,
        DataType::Date => StorageType::Timestamp,
        DataType::Struct => StorageType::NChar,
        DataType::Array => StorageType::NChar,
    }
}

/// Startup check that `DataType::ALL` enumerates every logical type exactly once
/// and each one maps to a storage type.
pub fn verify_type_mapping() -> DomainResult<()> {
    let mut seen = HashSet::new();
    for data_type in DataType::ALL {
        if !seen.insert(data_type) {
            return Err(DomainError::ValidationError(format!(
                "data type {} listed twice",
                data_type
            )));
        }
        let storage_type = storage_type_for(data_type);
        if storage_type.as_str().is_empty() {
            return Err(DomainError::ValidationError(format!(
                "data type {} has no storage type",
                data_type
            )));
        }
        debug!(data_type = %data_type, storage_type = %storage_type, "type mapping");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_data_type_maps_to_a_storage_type() {
        for data_type in DataType::ALL {
            assert!(!storage_type_for(data_type).as_str().is_empty());
        }
        assert!(verify_type_mapping().is_ok());
    }

    #[test]
    fn test_mapping_table() {
        assert_eq!(storage_type_for(DataType::Int), StorageType::Int);
        assert_eq!(storage_type_for(DataType::Float), StorageType::Float);
        assert_eq!(storage_type_for(DataType::Double), StorageType::Double);
        assert_eq!(storage_type_for(DataType::Enum), StorageType::TinyInt);
        assert_eq!(storage_type_for(DataType::Bool), StorageType::TinyInt);
        assert_eq!(storage_type_for(DataType::Text), StorageType::NChar);
        assert_eq!(storage_type_for(DataType::Date), StorageType::Timestamp);
        assert_eq!(storage_type_for(DataType::Struct), StorageType::NChar);
        assert_eq!(storage_type_for(DataType::Array), StorageType::NChar);
    }
}
