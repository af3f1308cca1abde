//! cors-relay: performs HTTP requests described by a JSON envelope on behalf of
//! browser code and returns the response with permissive CORS headers.

mod body;
mod config;
mod cors;
mod envelope;
mod error;
mod relay;
mod server;

use clap::Parser;

use config::{CliOverrides, RelayConfig, RelayContext, RelayOverrides, ServerOverrides};
use server::AppState;

/// Relay JSON-described HTTP requests for browsers, adding CORS headers.
#[derive(Parser, Debug)]
#[command(name = "cors-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML config file (optional; missing file means defaults)
    #[arg(long, env = "RELAY_CONFIG", default_value = "cors-relay.toml")]
    config: String,

    /// The address the server will bind to
    #[arg(long)]
    address: Option<String>,

    /// The port the server will bind to
    #[arg(long)]
    port: Option<u16>,

    /// Log every outbound request line and its headers
    #[arg(long)]
    debug: bool,

    /// Send Basic auth on every outbound request, in user:pass form
    #[arg(long)]
    auth: Option<String>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            server: ServerOverrides {
                address: self.address.clone(),
                port: self.port,
            },
            relay: RelayOverrides {
                debug: self.debug.then_some(true),
                auth: self.auth.clone(),
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(&cli.config, &cli.overrides())?;

    // The tonic gRPC exporter needs a reactor context, so the runtime comes first.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = relay_tracing::init_tracing(&config.tracing_config());

        tracing::info!(
            config_path = %cli.config,
            listen_address = %config.server.listen_address(),
            debug = config.relay.debug,
            static_auth = config.relay.auth.is_some(),
            upstream_timeout_secs = ?config.upstream.timeout_secs,
            otlp = tracing_guard.exporting(),
            "Starting cors-relay"
        );

        run(config).await
    })
}

async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let context = RelayContext::from_config(&config)?;
    let client = config.upstream.build_client()?;

    if config.upstream.timeout_secs.is_none() {
        tracing::warn!("No upstream timeout configured; slow upstreams hold connections open");
    }

    let state = AppState { client, context };
    server::run(state, &config.server.listen_address()).await
}
