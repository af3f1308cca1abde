//! Permissive CORS headers stamped onto relay responses.

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD,
};
use axum::http::{HeaderMap, HeaderValue};

/// Value of `Access-Control-Allow-Headers`.
pub const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept";

/// Set the three CORS headers on `response`, replacing any existing values.
///
/// `Access-Control-Request-Method` echoes the inbound request's own header,
/// or is set to an empty value when the inbound request had none.
pub fn apply(inbound: &HeaderMap, response: &mut HeaderMap) {
    response.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    let requested = inbound
        .get(ACCESS_CONTROL_REQUEST_METHOD)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));
    response.insert(ACCESS_CONTROL_REQUEST_METHOD, requested);
}
