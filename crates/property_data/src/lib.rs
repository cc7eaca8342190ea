pub mod cache;
pub mod clickhouse;
pub mod config;
pub mod domain;
pub mod nats;
pub mod property_data;

pub use cache::*;
pub use self::clickhouse::*;
pub use self::config::*;
pub use domain::*;
pub use nats::*;
pub use property_data::*;
