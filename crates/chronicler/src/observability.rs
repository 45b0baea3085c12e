//! Tracing and OpenTelemetry setup for the chronicler binary.

use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use opentelemetry_stdout::SpanExporter;
use std::env;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Configuration for logging and span export.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name for telemetry attribution
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "debug")
    pub log_level: String,
    /// Enable JSON-formatted logs for structured logging
    pub json_logs: bool,
    /// Export finished spans to stdout
    pub export_spans: bool,
}

impl ObservabilityConfig {
    /// Create a new configuration with the given service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: false,
            export_spans: false,
        }
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Enable the stdout span exporter.
    pub fn with_export_spans(mut self, enabled: bool) -> Self {
        self.export_spans = enabled;
        self
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

/// Initialize logging with the default configuration.
///
/// # Errors
///
/// Returns an error if the log filter is invalid or a subscriber is
/// already installed.
pub fn init_observability() -> Result<(), Box<dyn std::error::Error>> {
    init_observability_with_config(ObservabilityConfig::default())
}

/// Initialize logging, and span export when enabled.
///
/// Sets up:
/// - An `EnvFilter` from `RUST_LOG`, falling back to the configured level
/// - A text or JSON fmt layer on stderr
/// - An OpenTelemetry bridge exporting spans to stdout, if requested
///
/// # Errors
///
/// Returns an error if the log filter is invalid or a subscriber is
/// already installed.
pub fn init_observability_with_config(
    config: ObservabilityConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let otel_layer = if config.export_spans {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attributes(vec![KeyValue::new(
                "service.version",
                config.service_version.clone(),
            )])
            .build();

        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_resource(resource)
            .build();
        global::set_tracer_provider(provider.clone());

        let tracer = provider.tracer(config.service_name.clone());
        let _ = TRACER_PROVIDER.set(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush and shut down the span exporter, if one was installed.
pub fn shutdown_observability() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        eprintln!("Failed to shut down tracer provider: {}", e);
    }
}
