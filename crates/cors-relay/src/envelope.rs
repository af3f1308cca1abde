//! The JSON envelope a browser posts to describe the request it wants made.
//!
//! ```json
//! { "url": "https://api.example.com/v1/items", "method": "PUT",
//!   "headers": { "Content-Type": "application/json" }, "body": "{\"id\":1}" }
//! ```

use std::collections::HashMap;

use axum::body::Body;
use serde::{Deserialize, Deserializer};

use crate::error::DecodeError;

/// Decoded description of one outbound request.
///
/// Keys are matched in lowercase, capitalized, or all-caps form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Envelope {
    /// Absolute URL, handed to the HTTP client's URL parser.
    #[serde(alias = "Url", alias = "URL")]
    pub url: String,

    /// Method token, passed to the HTTP client as-is.
    #[serde(alias = "Method", alias = "METHOD")]
    pub method: String,

    /// One value per header name.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        alias = "Headers",
        alias = "HEADERS"
    )]
    pub headers: HashMap<String, String>,

    /// Raw outbound body. Empty means no content.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        alias = "Body",
        alias = "BODY"
    )]
    pub body: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode the first JSON document in `bytes` as an [`Envelope`].
///
/// Anything after the first document is ignored.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Envelope>()
        .next()
        .ok_or(DecodeError::Empty)?
        .map_err(DecodeError::from)
}

/// Read an inbound body (at most `limit` bytes) and decode it.
pub async fn read_envelope(body: Body, limit: usize) -> Result<Envelope, DecodeError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(DecodeError::Read)?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_envelope() {
        let json = r#"{
            "url": "https://example.com/a?b=c",
            "method": "PUT",
            "headers": {"Content-Type": "text/plain", "X-Trace": "1"},
            "body": "hello"
        }"#;
        let envelope = decode(json.as_bytes()).unwrap();

        assert_eq!(envelope.url, "https://example.com/a?b=c");
        assert_eq!(envelope.method, "PUT");
        assert_eq!(envelope.headers.len(), 2);
        assert_eq!(envelope.headers["Content-Type"], "text/plain");
        assert_eq!(envelope.body, "hello");
    }

    #[test]
    fn test_headers_and_body_optional() {
        let envelope = decode(br#"{"url": "http://x/", "method": "GET"}"#).unwrap();
        assert!(envelope.headers.is_empty());
        assert!(envelope.body.is_empty());

        let envelope =
            decode(br#"{"url": "http://x/", "method": "GET", "headers": null, "body": null}"#)
                .unwrap();
        assert!(envelope.headers.is_empty());
        assert!(envelope.body.is_empty());
    }

    #[test]
    fn test_capitalized_keys() {
        let envelope = decode(
            br#"{"Url": "http://x/", "Method": "POST", "Headers": {"A": "1"}, "Body": "b"}"#,
        )
        .unwrap();
        assert_eq!(envelope.url, "http://x/");
        assert_eq!(envelope.method, "POST");
        assert_eq!(envelope.headers["A"], "1");
        assert_eq!(envelope.body, "b");

        let envelope = decode(br#"{"URL": "http://y/", "METHOD": "GET", "BODY": null}"#).unwrap();
        assert_eq!(envelope.url, "http://y/");
        assert_eq!(envelope.method, "GET");
        assert!(envelope.body.is_empty());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let envelope =
            decode(br#"{"url": "http://x/", "method": "GET", "timeout": 5}"#).unwrap();
        assert_eq!(envelope.method, "GET");
    }

    #[test]
    fn test_trailing_data_ignored() {
        let envelope = decode(br#"{"url": "http://x/", "method": "GET"} garbage"#).unwrap();
        assert_eq!(envelope.url, "http://x/");
    }

    #[test]
    fn test_empty_body_rejected() {
        assert!(matches!(decode(b""), Err(DecodeError::Empty)));
        assert!(matches!(decode(b"  \n"), Err(DecodeError::Empty)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(decode(b"{\"url\": "), Err(DecodeError::Json(_))));
        assert!(matches!(decode(b"not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        // missing url
        assert!(matches!(
            decode(br#"{"method": "GET"}"#),
            Err(DecodeError::Json(_))
        ));
        // multi-value header
        assert!(matches!(
            decode(br#"{"url": "http://x/", "method": "GET", "headers": {"A": ["1", "2"]}}"#),
            Err(DecodeError::Json(_))
        ));
        // not an object
        assert!(matches!(decode(b"[1, 2]"), Err(DecodeError::Json(_))));
    }

    #[tokio::test]
    async fn test_read_envelope_enforces_limit() {
        let json = r#"{"url": "http://x/", "method": "POST", "body": "0123456789"}"#;

        let envelope = read_envelope(Body::from(json), 1024).await.unwrap();
        assert_eq!(envelope.body, "0123456789");

        let err = read_envelope(Body::from(json), 16).await.unwrap_err();
        assert!(matches!(err, DecodeError::Read(_)));
    }
}
