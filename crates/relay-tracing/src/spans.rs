//! Span builder helpers for relay instrumentation.

/// Create a tracing span for one inbound call.
///
/// Usage: `let span = relay_request_span!(request_id, method);`
///
/// `target_url` is recorded once the envelope has been decoded.
#[macro_export]
macro_rules! relay_request_span {
    ($request_id:expr, $method:expr) => {
        tracing::info_span!(
            "relay_request",
            request_id = %$request_id,
            inbound_method = %$method,
            target_url = tracing::field::Empty,
        )
    };
}

/// Create a tracing span for the outbound call to the upstream host.
///
/// `status` and `latency_ms` are recorded when the response head arrives,
/// `bytes_relayed` when the body stream ends.
#[macro_export]
macro_rules! upstream_span {
    ($request_id:expr, $method:expr, $host:expr) => {
        tracing::info_span!(
            "upstream",
            request_id = %$request_id,
            method = %$method,
            host = %$host,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            bytes_relayed = tracing::field::Empty,
        )
    };
}
