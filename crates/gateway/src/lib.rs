//! Offline cache gateway for the sojourn guest app.
//!
//! Intercepts every first-party request, answers it from named cache stores,
//! the network, or a synthesized offline fallback, and opportunistically
//! refreshes the stores. Which path a request takes is decided once, by pure
//! classification, and executed by one of three strategies:
//!
//! - cache-first for static assets
//! - network-first for document navigations
//! - stale-while-revalidate for everything else

pub mod classify;
pub mod events;
pub mod gateway;
pub mod lifecycle;
pub mod server;
pub mod strategy;

pub use classify::{AssetClass, Destination};
pub use gateway::{Gateway, GatewayRequest, LifecycleState};
