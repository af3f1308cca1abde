//! Turning an [`Envelope`] into a real outbound request and relaying the
//! upstream response.
//!
//! The method is used exactly as given and the URL goes unchanged to the
//! client's parser, which lowercases scheme and host and resolves dot
//! segments. There is no destination allow-list: anyone who can reach the
//! relay can make it fetch any URL the relay host can reach. Deploy it only
//! where that is acceptable.

use std::time::Instant;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use axum::response::Response;
use tracing::Instrument;

use crate::body::BoundedChunks;
use crate::config::RelayContext;
use crate::cors;
use crate::envelope::Envelope;
use crate::error::RelayError;

/// Log target of the per-request debug trace.
pub const DEBUG_TRACE_TARGET: &str = "cors_relay::debug_trace";

/// Build the outbound request described by `envelope`.
///
/// Every envelope header is set once, replacing any client default. A
/// configured static `Authorization` replaces whatever the caller sent.
/// `content-length` and `transfer-encoding` are skipped: the client frames
/// the request from the body it actually sends.
pub fn build_request(
    client: &reqwest::Client,
    context: &RelayContext,
    envelope: Envelope,
) -> Result<reqwest::Request, RelayError> {
    let method = if envelope.method.is_empty() {
        Method::GET
    } else {
        Method::from_bytes(envelope.method.as_bytes())
            .map_err(|_| RelayError::InvalidMethod(envelope.method.clone()))?
    };

    let mut headers = HeaderMap::with_capacity(envelope.headers.len() + 1);
    for (name, value) in &envelope.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::InvalidHeaderName(name.clone()))?;
        if header_name == CONTENT_LENGTH || header_name == TRANSFER_ENCODING {
            continue;
        }
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| RelayError::InvalidHeaderValue(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    if let Some(ref authorization) = context.authorization {
        headers.insert(AUTHORIZATION, authorization.clone());
    }

    client
        .request(method, envelope.url.as_str())
        .headers(headers)
        .body(envelope.body)
        .build()
        .map_err(RelayError::Build)
}

/// Human-readable request line plus one tab-indented line per header.
pub fn debug_trace(request: &reqwest::Request) -> String {
    let mut trace = format!("{}: {}", request.method(), request.url());
    for (name, value) in request.headers() {
        trace.push_str("\n\t");
        trace.push_str(name.as_str());
        trace.push_str(": ");
        trace.push_str(&String::from_utf8_lossy(value.as_bytes()));
    }
    trace
}

/// Execute `envelope` and return the caller-facing response.
///
/// On success the response carries the upstream status, the first value of
/// each upstream header, the CORS headers, and the upstream body streamed
/// through in chunks of at most `copy_buffer_size` bytes.
pub async fn relay(
    client: &reqwest::Client,
    context: &RelayContext,
    envelope: Envelope,
    inbound_headers: &HeaderMap,
    request_id: &str,
) -> Result<Response, RelayError> {
    let request = build_request(client, context, envelope)?;

    if context.debug {
        tracing::info!(target: DEBUG_TRACE_TARGET, "{}", debug_trace(&request));
    }

    let method = request.method().clone();
    let host = request.url().host_str().unwrap_or_default().to_string();
    let span = relay_tracing::upstream_span!(request_id, &method, &host);
    let start = Instant::now();

    let upstream = client
        .execute(request)
        .instrument(span.clone())
        .await
        .map_err(RelayError::upstream)?;

    let status = upstream.status();
    let latency = start.elapsed().as_millis() as u64;
    span.record("status", status.as_u16());
    span.record("latency_ms", latency);
    tracing::info!(
        parent: &span,
        status = status.as_u16(),
        latency_ms = latency,
        "Upstream responded"
    );

    let mut headers = first_values(upstream.headers(), method == Method::HEAD);
    cors::apply(inbound_headers, &mut headers);

    let body = BoundedChunks::new(upstream.bytes_stream(), context.copy_buffer_size, span);
    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Copy `upstream` keeping only the first value of each header.
///
/// `transfer-encoding` is dropped since framing belongs to the caller's
/// connection, and so is `content-length` for `HEAD` where no body follows.
fn first_values(upstream: &HeaderMap, head: bool) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.keys_len() + 3);
    for name in upstream.keys() {
        if name == TRANSFER_ENCODING || (head && name == CONTENT_LENGTH) {
            continue;
        }
        if let Some(value) = upstream.get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers
}
