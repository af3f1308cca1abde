//! Error types for the two failure kinds a relay call can hit.
//!
//! Both kinds surface to the caller the same way: CORS headers, `500`, and the
//! `Display` text below as a plain-text body.

use thiserror::Error;

/// The inbound envelope could not be read or decoded. No outbound call is made.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    #[error("empty request envelope")]
    Empty,

    #[error("invalid request envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// Building or executing the outbound request failed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("invalid value for header {0:?}")]
    InvalidHeaderValue(String),

    #[error("invalid request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("{message}")]
    Upstream {
        message: String,
        #[source]
        source: reqwest::Error,
    },
}

impl RelayError {
    /// Wrap a dispatch failure. The message is the error followed by each of
    /// its sources, `: `-separated.
    pub fn upstream(source: reqwest::Error) -> Self {
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(&source);
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = std::error::Error::source(err);
        }
        Self::Upstream { message, source }
    }
}

/// Anything that turns a relay call into a `500`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_text_carries_parser_message() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err = Error::from(DecodeError::from(json_err));
        let text = err.to_string();
        assert!(text.starts_with("invalid request envelope: "), "{text}");
        assert!(text.contains("line 1"), "{text}");
    }

    #[test]
    fn test_relay_error_is_transparent() {
        let err = Error::from(RelayError::InvalidMethod("GE T".to_string()));
        assert_eq!(err.to_string(), r#"invalid method "GE T""#);
    }
}
