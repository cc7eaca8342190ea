pub mod clickhouse;
pub mod domain;
pub mod garde;
pub mod nats;
pub mod postgres;
pub mod redis;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockLatestPropertyValueCache;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockProductRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockPropertyTableStore;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockSimulatedMessageProducer;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockThingModelMessageProducer;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockThingModelRepository;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamPublisher;
