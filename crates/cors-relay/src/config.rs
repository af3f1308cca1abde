//! Configuration types and loading logic.

use std::time::Duration;

use anyhow::{ensure, Context};
use axum::http::HeaderValue;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use relay_tracing::TracingConfig;
use serde::{Deserialize, Serialize};

use crate::relay::DEBUG_TRACE_TARGET;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest inbound envelope accepted, in bytes.
    #[serde(default = "default_max_envelope_bytes")]
    pub max_envelope_bytes: usize,
}

/// Relay behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    /// Log every outbound request line and header before dispatch.
    #[serde(default)]
    pub debug: bool,

    /// `user:pass` sent as Basic auth on every outbound request.
    #[serde(default)]
    pub auth: Option<String>,

    /// Largest chunk written to the caller while streaming a response body.
    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,
}

/// Outbound HTTP client settings. Unset means the client has no timeout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

/// Values given on the command line. `None` leaves the file/env value alone.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    pub server: ServerOverrides,
    pub relay: RelayOverrides,
}

#[derive(Debug, Default, Serialize)]
pub struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Serialize)]
pub struct RelayOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_envelope_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_copy_buffer_size() -> usize {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            max_envelope_bytes: default_max_envelope_bytes(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            debug: false,
            auth: None,
            copy_buffer_size: default_copy_buffer_size(),
        }
    }
}

impl ServerConfig {
    /// `address:port` as handed to the listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl UpstreamConfig {
    /// Build the shared outbound client.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }
}

impl RelayConfig {
    /// Tracing settings with the debug-trace target forced on when
    /// `relay.debug` is set, whatever `tracing.log_level` says.
    pub fn tracing_config(&self) -> TracingConfig {
        let mut tracing = self.tracing.clone();
        if self.relay.debug {
            let directive = format!("{DEBUG_TRACE_TARGET}=info");
            tracing.log_level = if tracing.log_level.trim().is_empty() {
                directive
            } else {
                format!("{},{directive}", tracing.log_level)
            };
        }
        tracing
    }

    /// Load configuration from an optional TOML file, environment variables,
    /// and command-line flags.
    ///
    /// Priority (highest to lowest):
    /// 1. Command-line flags
    /// 2. Environment variables (RELAY_ prefix, __ for nesting)
    /// 3. TOML config file (skipped if missing)
    /// 4. Defaults
    pub fn load(config_path: &str, cli: &CliOverrides) -> anyhow::Result<Self> {
        Self::figment(config_path, cli)
            .extract()
            .with_context(|| format!("invalid configuration (file: {config_path})"))
    }

    fn figment(config_path: &str, cli: &CliOverrides) -> Figment {
        Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("RELAY_").split("__"))
            .merge(Serialized::defaults(cli))
    }
}

/// Read-only settings every relay call consults.
///
/// Built once before the listener starts and shared behind an `Arc`; nothing
/// mutates it afterward.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub debug: bool,
    /// Ready-to-send `Authorization` value; replaces any caller-supplied one.
    pub authorization: Option<HeaderValue>,
    pub copy_buffer_size: usize,
    pub max_envelope_bytes: usize,
}

impl RelayContext {
    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        ensure!(
            config.relay.copy_buffer_size > 0,
            "relay.copy_buffer_size must be greater than zero"
        );

        let authorization = config
            .relay
            .auth
            .as_deref()
            .filter(|credentials| !credentials.is_empty())
            .map(basic_authorization)
            .transpose()?;

        Ok(Self {
            debug: config.relay.debug,
            authorization,
            copy_buffer_size: config.relay.copy_buffer_size,
            max_envelope_bytes: config.server.max_envelope_bytes,
        })
    }
}

/// `Basic <base64(user:pass)>`, marked sensitive so it is never logged.
pub fn basic_authorization(credentials: &str) -> anyhow::Result<HeaderValue> {
    let encoded = BASE64_STANDARD.encode(credentials.as_bytes());
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .context("auth credentials do not form a valid header value")?;
    value.set_sensitive(true);
    Ok(value)
}
