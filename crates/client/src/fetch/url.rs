//! URL construction and origin scoping.
//!
//! The gateway caches first-party assets only: a request is in scope exactly
//! when its target origin (scheme, host, port) matches the configured
//! upstream. Everything else is left to plain network handling.

use sojourn_core::Error;
use url::Url;

/// Resolve a path-and-query against the upstream origin.
///
/// `path` must be absolute (start with `/`); the query string is preserved.
pub fn request_url(upstream: &Url, path: &str) -> Result<Url, Error> {
    if !path.starts_with('/') {
        return Err(Error::InvalidUrl(format!("path must be absolute: {path}")));
    }
    upstream
        .join(path)
        .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
}

/// Whether two URLs share an origin (scheme, host, port).
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}
