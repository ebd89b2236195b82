//! Upstream HTTP client for the sojourn offline gateway.
//!
//! This crate provides the network side of the gateway: a [`Fetch`] trait the
//! strategies are written against, and an [`UpstreamClient`] implementation
//! backed by reqwest.

pub mod fetch;

pub use fetch::{Fetch, FetchConfig, UpstreamClient};
pub use fetch::url::{request_url, same_origin};
