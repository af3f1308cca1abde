//! The `[tracing]` configuration section.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// Reported as `service.name` on exported spans.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP/gRPC collector, e.g. "http://collector:4317". Unset disables export.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// `EnvFilter` directives, e.g. "info" or "cors_relay=debug,warn".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write log lines as JSON objects instead of text.
    #[serde(default)]
    pub json_logs: bool,
}

fn default_service_name() -> String {
    "cors-relay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}
