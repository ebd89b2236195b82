//! Install and activate steps.
//!
//! Install seeds the static store from the seed manifest, all-or-nothing: a
//! single failed or non-success fetch aborts the step with no partial commit.
//! Activate purges every store that does not belong to the current build,
//! which covers both older versions and the legacy combined store.

use std::sync::Arc;

use sojourn_client::{Fetch, request_url};
use sojourn_core::{Error, RequestKey, StoreDb, StoreNames};
use url::Url;

/// Prefetch the seed manifest into the static store.
///
/// # Errors
///
/// Returns `Error::InstallFailed` when any seed path cannot be fetched with a
/// success status; in that case nothing is written.
pub async fn install(
    db: &StoreDb, names: &StoreNames, fetcher: &Arc<dyn Fetch>, upstream: &Url, seed_manifest: &[String],
) -> Result<(), Error> {
    tracing::info!(seeds = seed_manifest.len(), "installing: caching static assets");

    let mut seeded = Vec::with_capacity(seed_manifest.len());
    for path in seed_manifest {
        let url = request_url(upstream, path)?;
        let resp = fetcher
            .fetch("GET", &url)
            .await
            .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
        if !resp.is_success() {
            return Err(Error::InstallFailed(format!("{path}: status {}", resp.status)));
        }
        seeded.push((RequestKey::get(url.as_str()), resp));
    }

    // Commit in one transaction, and only after every seed fetch succeeded.
    db.put_many(&names.static_assets, &seeded).await?;

    tracing::info!(store = %names.static_assets, "installed: static assets cached");
    Ok(())
}

/// Delete every store not belonging to the current build.
///
/// Returns the names of the deleted stores.
pub async fn activate(db: &StoreDb, names: &StoreNames) -> Result<Vec<String>, Error> {
    tracing::info!("activating: purging stale stores");

    let mut deleted = Vec::new();
    for name in db.store_names().await? {
        if !names.is_current(&name) {
            db.delete_store(&name).await?;
            tracing::info!(store = %name, "deleted stale store");
            deleted.push(name);
        }
    }

    tracing::info!("activated");
    Ok(deleted)
}
