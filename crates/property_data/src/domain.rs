mod column_naming;
mod device_property_data_service;
mod history_query_service;
mod ingestion_service;
mod latest_property_service;
mod product_locks;
mod schema_synchronizer;
mod type_mapper;

pub use column_naming::*;
pub use device_property_data_service::*;
pub use history_query_service::*;
pub use ingestion_service::*;
pub use latest_property_service::*;
pub use product_locks::*;
pub use schema_synchronizer::*;
pub use type_mapper::*;
