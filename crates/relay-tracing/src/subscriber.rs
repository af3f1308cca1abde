//! Global subscriber installation.

use anyhow::Result;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::TracingConfig;

/// Flushes exported spans when dropped. Hold it until the server exits.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
}

impl TracingGuard {
    /// Whether spans are being exported over OTLP.
    pub fn exporting(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown tracer provider: {e}");
            }
        }
    }
}

/// Install the global subscriber.
///
/// Logs always go to stderr. With `otlp_endpoint` set, spans are exported
/// over OTLP/gRPC as well; if the exporter cannot be built the relay still
/// starts with logging only.
pub fn init_tracing(config: &TracingConfig) -> TracingGuard {
    let (provider, export_error) = match config.otlp_endpoint.as_deref() {
        None => (None, None),
        Some(endpoint) => match build_provider(config, endpoint) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        },
    };

    let tracer = provider
        .as_ref()
        .map(|provider| provider.tracer(config.service_name.clone()));
    install(config, tracer);

    match (&config.otlp_endpoint, export_error) {
        (Some(endpoint), Some(e)) => tracing::warn!(
            error = %e,
            endpoint = %endpoint,
            "OTLP exporter failed to initialize, logging to stderr only"
        ),
        (Some(endpoint), None) => tracing::info!(
            endpoint = %endpoint,
            service = %config.service_name,
            "OTLP span export enabled"
        ),
        (None, _) => {}
    }

    TracingGuard { provider }
}

fn build_provider(config: &TracingConfig, endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder_empty()
                .with_service_name(config.service_name.clone())
                .build(),
        )
        .build())
}

fn install(config: &TracingConfig, tracer: Option<SdkTracer>) {
    tracing_subscriber::registry()
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .with(stderr_layer(config))
        .with(env_filter(&config.log_level))
        .init();
}

fn stderr_layer<S>(config: &TracingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.json_logs {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Parse `directives`, falling back to `info` when they are malformed.
fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Invalid log_level {directives:?} ({e}), using \"info\"");
        EnvFilter::new("info")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_keeps_valid_directives() {
        let filter = env_filter("warn,cors_relay::debug_trace=info").to_string();
        assert!(filter.contains("cors_relay::debug_trace=info"), "{filter}");
        assert!(filter.contains("warn"), "{filter}");
    }

    #[test]
    fn test_env_filter_falls_back_to_info() {
        let filter = env_filter("cors_relay=loudest").to_string();
        assert_eq!(filter, "info");
    }
}
