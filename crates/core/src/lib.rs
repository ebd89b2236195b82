//! Core types and shared functionality for the sojourn offline gateway.
//!
//! This crate provides:
//! - Named, versioned cache stores with a SQLite backend
//! - Captured-response and request-identity types
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod response;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use response::CapturedResponse;
pub use store::{RequestKey, StoreDb, StoreNames};
