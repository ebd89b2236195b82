//! Captured HTTP responses.
//!
//! A [`CapturedResponse`] is the unit stored in cache stores and returned by
//! every strategy: status, headers, and body, fully owned so it can be
//! persisted and replayed byte-for-byte.

use serde::{Deserialize, Serialize};

/// Status line of the synthesized offline fallback.
pub const OFFLINE_STATUS: u16 = 503;

/// Body of the synthesized offline fallback.
pub const OFFLINE_BODY: &[u8] = b"Offline";

/// A captured HTTP response, suitable for storage and replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers as (name, value) pairs, in wire order.
    pub headers: Vec<(String, String)>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl CapturedResponse {
    /// Build a response with a status, content type, and body.
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    /// The synthesized fallback returned when every other option is exhausted.
    pub fn offline() -> Self {
        Self::new(OFFLINE_STATUS, "text/plain", OFFLINE_BODY)
    }

    /// Whether the status is in the 2xx success range.
    ///
    /// Only successful responses are committed to a store; anything else is
    /// passed through to the caller uncached.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
