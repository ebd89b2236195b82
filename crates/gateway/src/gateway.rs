//! The gateway: wiring, scoping, and dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use sojourn_client::{Fetch, same_origin};
use sojourn_core::{CapturedResponse, Error, StoreDb, StoreNames};
use url::Url;

use crate::classify::{AssetClass, Destination, classify};
use crate::{lifecycle, strategy};

/// Lifecycle states, driven by the hosting runtime's startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Installing = 0,
    /// Install finished; the waiting period is skipped and activation follows
    /// immediately.
    Installed = 1,
    Activating = 2,
    Active = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Installing,
            1 => Self::Installed,
            2 => Self::Activating,
            _ => Self::Active,
        }
    }
}

/// A request as seen by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
}

impl GatewayRequest {
    pub fn get(url: Url, destination: Destination) -> Self {
        Self { method: "GET".to_string(), url, destination }
    }
}

/// Offline cache gateway.
///
/// Owns the stores, the upstream fetcher, and the first-party scope. One
/// instance serves all concurrent requests; the stores are the only shared
/// mutable state and are last-write-wins per key.
pub struct Gateway {
    db: StoreDb,
    names: StoreNames,
    fetcher: Arc<dyn Fetch>,
    upstream: Url,
    seed_manifest: Vec<String>,
    state: AtomicU8,
}

impl Gateway {
    pub fn new(
        db: StoreDb, names: StoreNames, fetcher: Arc<dyn Fetch>, upstream: Url, seed_manifest: Vec<String>,
    ) -> Self {
        Self { db, names, fetcher, upstream, seed_manifest, state: AtomicU8::new(LifecycleState::Installing as u8) }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Run the install step: seed the static store, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` on any seed failure; the gateway stays
    /// in `Installing` and must not be activated.
    pub async fn install(&self) -> Result<(), Error> {
        self.set_state(LifecycleState::Installing);
        lifecycle::install(&self.db, &self.names, &self.fetcher, &self.upstream, &self.seed_manifest).await?;
        self.set_state(LifecycleState::Installed);
        Ok(())
    }

    /// Run the activate step: purge stale stores, then claim request handling.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.set_state(LifecycleState::Activating);
        let deleted = lifecycle::activate(&self.db, &self.names).await?;
        self.set_state(LifecycleState::Active);
        Ok(deleted)
    }

    /// Handle one request.
    ///
    /// Returns None when the gateway declines: foreign-origin targets, or any
    /// request arriving before activation. The caller then applies default
    /// network handling. In-scope requests always get a response.
    pub async fn handle_fetch(&self, req: &GatewayRequest) -> Option<CapturedResponse> {
        if self.state() != LifecycleState::Active {
            tracing::debug!(url = %req.url, "not active yet, declining");
            return None;
        }
        if !same_origin(&req.url, &self.upstream) {
            tracing::debug!(url = %req.url, "foreign origin, declining");
            return None;
        }

        let class = classify(&req.url, req.destination);
        tracing::debug!(url = %req.url, ?class, "dispatching");
        let resp = match class {
            AssetClass::Static => {
                strategy::cache_first(&self.db, &self.names, &self.fetcher, &req.method, &req.url).await
            }
            AssetClass::Document => {
                strategy::network_first(&self.db, &self.names, &self.fetcher, &req.method, &req.url).await
            }
            AssetClass::Other => {
                strategy::stale_while_revalidate(&self.db, &self.names, &self.fetcher, &req.method, &req.url).await
            }
        };
        Some(resp)
    }

    /// Forward a request straight to the network, bypassing the stores.
    ///
    /// # Errors
    ///
    /// Returns transport errors as-is; there is no offline fallback outside
    /// the gateway's scope.
    pub async fn passthrough(&self, method: &str, url: &Url) -> Result<CapturedResponse, Error> {
        self.fetcher.fetch(method, url).await
    }
}
