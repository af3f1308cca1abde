//! Axum HTTP server: method dispatch, listener, graceful shutdown.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RelayContext;
use crate::cors;
use crate::envelope;
use crate::error::Error;
use crate::relay;

/// Body of the `400` sent for anything but `POST` and `OPTIONS`.
pub const INVALID_METHOD_BODY: &str = "Invalid request method";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub context: RelayContext,
}

/// Build the router. Every path is served by the same handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handle_relay))
        .fallback(handle_relay)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState, listen_addr: &str) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(address = %listen_addr, "cors-relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("cors-relay shut down gracefully");
    Ok(())
}

/// Dispatch on the inbound method.
///
/// - `POST`: decode the envelope and relay it
/// - `OPTIONS`: preflight answer, CORS headers only
/// - anything else: `400` without CORS headers
async fn handle_relay(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let method = request.method().clone();
    match method {
        Method::POST => handle_post(&state, request).await,
        Method::OPTIONS => preflight(request.headers()),
        _ => (StatusCode::BAD_REQUEST, INVALID_METHOD_BODY).into_response(),
    }
}

async fn handle_post(state: &AppState, request: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = relay_tracing::relay_request_span!(&request_id, request.method());
    let (parts, body) = request.into_parts();

    async {
        match decode_and_relay(state, &parts.headers, body, &request_id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Relay failed");
                failure(&parts.headers, &e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn decode_and_relay(
    state: &AppState,
    inbound_headers: &HeaderMap,
    body: Body,
    request_id: &str,
) -> Result<Response, Error> {
    let envelope = envelope::read_envelope(body, state.context.max_envelope_bytes).await?;
    tracing::Span::current().record("target_url", envelope.url.as_str());

    let response = relay::relay(
        &state.client,
        &state.context,
        envelope,
        inbound_headers,
        request_id,
    )
    .await?;
    Ok(response)
}

fn preflight(inbound_headers: &HeaderMap) -> Response {
    let mut response = StatusCode::OK.into_response();
    cors::apply(inbound_headers, response.headers_mut());
    response
}

/// `500` with the error text as a plain-text body, plus CORS headers.
fn failure(inbound_headers: &HeaderMap, error: &Error) -> Response {
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response();
    cors::apply(inbound_headers, response.headers_mut());
    response
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("Shutdown signal received, draining connections...");
}
