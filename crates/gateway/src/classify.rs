//! Asset classification.
//!
//! Each in-scope request is classified exactly once, from its URL path and
//! declared destination. Classification is pure and heuristic (path shape,
//! not content): it decides which strategy runs and which store is written.

use url::Url;

/// Path segments that mark a request as a static asset.
const STATIC_PATH_MARKERS: &[&str] = &["/assets/", "/icons/", "/images/"];

/// File extensions that mark a request as a static asset.
const STATIC_EXTENSIONS: &[&str] = &["css", "js", "json", "png", "jpg", "jpeg", "svg", "woff", "woff2"];

/// What the requester intends to do with the response.
///
/// The serving layer derives this from request headers (`Sec-Fetch-Dest`,
/// falling back to `Accept`); it is the analogue of the browser's
/// `request.destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Top-level HTML navigation.
    Document,
    /// Subresource or data request.
    Other,
}

/// Strategy class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    /// Cache-first, static store.
    Static,
    /// Network-first, dynamic store.
    Document,
    /// Stale-while-revalidate, dynamic store.
    Other,
}

/// Classify a request. Static markers win over destination: `/manifest.json`
/// is static even when requested as part of a navigation.
pub fn classify(url: &Url, destination: Destination) -> AssetClass {
    if is_static_asset(url) {
        AssetClass::Static
    } else if destination == Destination::Document {
        AssetClass::Document
    } else {
        AssetClass::Other
    }
}

fn is_static_asset(url: &Url) -> bool {
    let path = url.path();
    if STATIC_PATH_MARKERS.iter().any(|marker| path.contains(marker)) {
        return true;
    }
    match path.rsplit_once('.') {
        Some((_, ext)) => STATIC_EXTENSIONS.contains(&ext),
        None => false,
    }
}
