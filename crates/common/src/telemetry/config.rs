use opentelemetry_sdk::{logs::LoggerProvider, trace::TracerProvider as SdkTracerProvider};

/// `service.name` resource attribute reported by the property data services
pub const DEFAULT_SERVICE_NAME: &str = "iot-property-data";

/// Local OTLP gRPC collector
pub const DEFAULT_OTEL_ENDPOINT: &str = "http://localhost:4317";

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// OTLP gRPC endpoint receiving traces and logs
    pub otel_endpoint: String,
    /// Off: JSON logs on stdout only
    pub otel_enabled: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            otel_endpoint: DEFAULT_OTEL_ENDPOINT.to_string(),
            otel_enabled: false,
            log_level: "info".to_string(),
        }
    }
}

/// Exporters to flush on shutdown; only present when OTel export is enabled
pub struct TelemetryProviders {
    pub tracer_provider: SdkTracerProvider,
    pub logger_provider: LoggerProvider,
}
