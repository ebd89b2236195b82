//! SQLite-backed named cache stores.
//!
//! This module provides the persistence layer for captured responses using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Named, versioned stores holding request-identity -> response entries
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Wholesale store deletion for activation cleanup

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::StoreDb;
pub use key::RequestKey;

/// The store names a given build serves from.
///
/// Two live stores exist per build: one for static assets seeded at install
/// and populated by cache-first, one for dynamic content populated by
/// network-first and stale-while-revalidate. Any other store name found on
/// disk is stale (an older build, or the legacy combined store) and is
/// deleted during activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreNames {
    pub static_assets: String,
    pub dynamic_assets: String,
}

impl StoreNames {
    /// Derive the current store names from a prefix and build version.
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            static_assets: format!("{prefix}-static-v{version}"),
            dynamic_assets: format!("{prefix}-dynamic-v{version}"),
        }
    }

    /// Whether `name` is one of the two current stores.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_assets || name == self.dynamic_assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_names_format() {
        let names = StoreNames::new("sojourn", "1.0.0");
        assert_eq!(names.static_assets, "sojourn-static-v1.0.0");
        assert_eq!(names.dynamic_assets, "sojourn-dynamic-v1.0.0");
    }

    #[test]
    fn test_is_current() {
        let names = StoreNames::new("sojourn", "1.0.0");
        assert!(names.is_current("sojourn-static-v1.0.0"));
        assert!(names.is_current("sojourn-dynamic-v1.0.0"));
        assert!(!names.is_current("sojourn-static-v0.9.0"));
        assert!(!names.is_current("sojourn-v1.0.0"));
    }
}
