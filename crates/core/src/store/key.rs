//! Request identity for cache keying.

use sha2::{Digest, Sha256};

/// Identity of a request as seen by the cache: method plus full URL.
///
/// Two requests with the same identity hit the same entry; headers and body
/// never participate in keying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    /// Key for a GET of `url`, the common case for the gateway.
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".to_string(), url: url.into() }
    }

    /// Build a key from an explicit method and URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { method: method.into().to_uppercase(), url: url.into() }
    }

    /// Stable hex digest used as the storage key column.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}
