//! The three caching strategies.
//!
//! Every strategy performs at most one network attempt and always returns a
//! response: internal failures (transport, storage) degrade to the cached
//! fallback chain and finally to the synthesized 503 Offline response, never
//! to an error the serving layer has to handle.

use std::sync::Arc;

use sojourn_client::Fetch;
use sojourn_core::{CapturedResponse, Error, RequestKey, StoreDb, StoreNames};
use url::Url;

/// Path of the cached document served when a navigation has no better match.
const ROOT_DOCUMENT: &str = "/index.html";

/// Cache-first: serve any matching entry; otherwise fetch and, when the
/// response is successful, persist it to the static store.
pub async fn cache_first(
    db: &StoreDb, names: &StoreNames, fetcher: &Arc<dyn Fetch>, method: &str, url: &Url,
) -> CapturedResponse {
    match cache_first_inner(db, names, fetcher, method, url).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(%url, error = %e, "cache-first failed, serving offline fallback");
            CapturedResponse::offline()
        }
    }
}

async fn cache_first_inner(
    db: &StoreDb, names: &StoreNames, fetcher: &Arc<dyn Fetch>, method: &str, url: &Url,
) -> Result<CapturedResponse, Error> {
    let key = RequestKey::new(method, url.as_str());

    if let Some(hit) = db.match_any(&key).await? {
        tracing::debug!(%url, "cache-first hit");
        return Ok(hit);
    }

    let resp = fetcher.fetch(method, url).await?;
    if resp.is_success() {
        db.put(&names.static_assets, &key, &resp).await?;
    }
    Ok(resp)
}

/// Network-first: attempt the network, persisting successful responses to the
/// dynamic store. On failure fall back to any cached entry, then the cached
/// root document, then 503.
pub async fn network_first(
    db: &StoreDb, names: &StoreNames, fetcher: &Arc<dyn Fetch>, method: &str, url: &Url,
) -> CapturedResponse {
    let key = RequestKey::new(method, url.as_str());

    match network_fetch_and_store(db, &names.dynamic_assets, fetcher, &key, method, url).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::debug!(%url, error = %e, "network failed, trying stores");
            document_fallback(db, &key, url).await
        }
    }
}

async fn network_fetch_and_store(
    db: &StoreDb, store: &str, fetcher: &Arc<dyn Fetch>, key: &RequestKey, method: &str, url: &Url,
) -> Result<CapturedResponse, Error> {
    let resp = fetcher.fetch(method, url).await?;
    if resp.is_success() {
        db.put(store, key, &resp).await?;
    }
    Ok(resp)
}

/// Fallback chain for failed navigations: exact match, root document, 503.
async fn document_fallback(db: &StoreDb, key: &RequestKey, url: &Url) -> CapturedResponse {
    match db.match_any(key).await {
        Ok(Some(hit)) => return hit,
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(%url, error = %e, "store lookup failed during fallback");
            return CapturedResponse::offline();
        }
    }

    let root = match url.join(ROOT_DOCUMENT) {
        Ok(root) => root,
        Err(_) => return CapturedResponse::offline(),
    };
    let root_key = RequestKey::get(root.as_str());
    match db.match_any(&root_key).await {
        Ok(Some(hit)) => {
            tracing::debug!(%url, "serving cached root document");
            hit
        }
        _ => CapturedResponse::offline(),
    }
}

/// Stale-while-revalidate: serve the dynamic-store entry immediately when
/// present, refreshing it with a fire-and-forget fetch; otherwise wait on the
/// network. The revalidation's outcome never affects the returned value.
pub async fn stale_while_revalidate(
    db: &StoreDb, names: &StoreNames, fetcher: &Arc<dyn Fetch>, method: &str, url: &Url,
) -> CapturedResponse {
    let key = RequestKey::new(method, url.as_str());
    let store = names.dynamic_assets.clone();

    let cached = match db.get(&store, &key).await {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!(%url, error = %e, "store lookup failed, falling through to network");
            None
        }
    };

    if let Some(hit) = cached {
        tracing::debug!(%url, "serving stale entry, revalidating in background");
        tokio::spawn(revalidate(db.clone(), store, Arc::clone(fetcher), key));
        return hit;
    }

    match fetcher.fetch(method, url).await {
        Ok(resp) => {
            if resp.is_success()
                && let Err(e) = db.put(&store, &key, &resp).await
            {
                tracing::debug!(%url, error = %e, "failed to store revalidated response");
            }
            resp
        }
        Err(e) => {
            tracing::debug!(%url, error = %e, "network failed with no stale entry");
            // A concurrent handler may have landed an entry in the interim.
            match db.get(&store, &key).await {
                Ok(Some(stale)) => stale,
                _ => CapturedResponse::offline(),
            }
        }
    }
}

/// Background refresh of a dynamic-store entry. Failures are logged and
/// swallowed.
async fn revalidate(db: StoreDb, store: String, fetcher: Arc<dyn Fetch>, key: RequestKey) {
    let url = match Url::parse(&key.url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(url = %key.url, error = %e, "revalidation skipped");
            return;
        }
    };
    match fetcher.fetch(&key.method, &url).await {
        Ok(resp) if resp.is_success() => {
            if let Err(e) = db.put(&store, &key, &resp).await {
                tracing::debug!(%url, error = %e, "revalidation store update failed");
            }
        }
        Ok(resp) => tracing::debug!(%url, status = resp.status, "revalidation returned non-success"),
        Err(e) => tracing::debug!(%url, error = %e, "revalidation fetch failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted fetcher: responds from a URL map, counting calls; with no
    /// entry for a URL it behaves as an unreachable network.
    struct ScriptedFetch {
        responses: Mutex<HashMap<String, CapturedResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetch {
        fn new() -> Arc<Self> {
            Arc::new(Self { responses: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) })
        }

        fn script(self: &Arc<Self>, url: &str, resp: CapturedResponse) {
            self.responses.lock().unwrap().insert(url.to_string(), resp);
        }

        fn unscript(self: &Arc<Self>, url: &str) {
            self.responses.lock().unwrap().remove(url);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn fetch(&self, _method: &str, url: &Url) -> Result<CapturedResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| Error::Transport(format!("unreachable: {url}")))
        }
    }

    fn names() -> StoreNames {
        StoreNames::new("sojourn", "1.0.0")
    }

    fn url(path: &str) -> Url {
        Url::parse("http://app.local:3000").unwrap().join(path).unwrap()
    }

    fn ok_response(body: &str) -> CapturedResponse {
        CapturedResponse::new(200, "text/html", body)
    }

    async fn poll_entry(db: &StoreDb, store: &str, key: &RequestKey) -> Option<CapturedResponse> {
        for _ in 0..50 {
            if let Some(entry) = db.get(store, key).await.unwrap() {
                return Some(entry);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_cache_first_serves_hit_without_network() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/icons/icon-192x192.png");
        let key = RequestKey::get(target.as_str());
        db.put(&names().static_assets, &key, &ok_response("png")).await.unwrap();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = cache_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.body, b"png");
        assert_eq!(fetch.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_miss_fetches_and_stores() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/icons/icon-192x192.png");
        fetch.script(target.as_str(), ok_response("png"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = cache_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"png");
        let key = RequestKey::get(target.as_str());
        let stored = db.get(&names().static_assets, &key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"png");
    }

    #[tokio::test]
    async fn test_cache_first_non_success_not_stored() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/icons/missing.png");
        fetch.script(target.as_str(), CapturedResponse::new(404, "text/plain", "nope"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = cache_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.status, 404);
        let key = RequestKey::get(target.as_str());
        assert!(db.get(&names().static_assets, &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_first_total_failure_is_offline() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/assets/app.js");

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = cache_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp, CapturedResponse::offline());
    }

    #[tokio::test]
    async fn test_cache_first_idempotent() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/assets/app.js");
        fetch.script(target.as_str(), ok_response("bundle"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let first = cache_first(&db, &names(), &fetcher, "GET", &target).await;
        fetch.unscript(target.as_str());
        let second = cache_first(&db, &names(), &fetcher, "GET", &target).await;
        let third = cache_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(first.body, second.body);
        assert_eq!(second, third);
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test]
    async fn test_network_first_success_stores_dynamic() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/checkin");
        fetch.script(target.as_str(), ok_response("<html>checkin"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = network_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.body, b"<html>checkin");
        let key = RequestKey::get(target.as_str());
        assert!(db.get(&names().dynamic_assets, &key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_network_first_failure_serves_cached_entry() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/checkin");
        let key = RequestKey::get(target.as_str());
        db.put(&names().dynamic_assets, &key, &ok_response("cached page")).await.unwrap();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = network_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.body, b"cached page");
    }

    #[tokio::test]
    async fn test_network_first_failure_falls_back_to_root_document() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let root_key = RequestKey::get(url("/index.html").as_str());
        db.put(&names().static_assets, &root_key, &ok_response("shell")).await.unwrap();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = network_first(&db, &names(), &fetcher, "GET", &url("/")).await;

        assert_eq!(resp.body, b"shell");
    }

    #[tokio::test]
    async fn test_network_first_exhausted_is_offline() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = network_first(&db, &names(), &fetcher, "GET", &url("/anywhere")).await;

        assert_eq!(resp, CapturedResponse::offline());
    }

    #[tokio::test]
    async fn test_network_first_precedence_exact_over_root() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/checkin");
        db.put(&names().dynamic_assets, &RequestKey::get(target.as_str()), &ok_response("exact"))
            .await
            .unwrap();
        db.put(&names().static_assets, &RequestKey::get(url("/index.html").as_str()), &ok_response("shell"))
            .await
            .unwrap();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = network_first(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.body, b"exact");
    }

    #[tokio::test]
    async fn test_swr_serves_stale_and_revalidates() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/api/weather");
        let key = RequestKey::get(target.as_str());
        db.put(&names().dynamic_assets, &key, &ok_response("stale")).await.unwrap();
        fetch.script(target.as_str(), ok_response("fresh"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = stale_while_revalidate(&db, &names(), &fetcher, "GET", &target).await;

        // Stale entry comes back immediately.
        assert_eq!(resp.body, b"stale");

        // The background fetch lands the fresh copy.
        for _ in 0..50 {
            let entry = db.get(&names().dynamic_assets, &key).await.unwrap().unwrap();
            if entry.body == b"fresh" {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("revalidation never updated the dynamic store");
    }

    #[tokio::test]
    async fn test_swr_no_entry_waits_on_network() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/api/weather");
        fetch.script(target.as_str(), ok_response("fresh"));

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = stale_while_revalidate(&db, &names(), &fetcher, "GET", &target).await;

        assert_eq!(resp.body, b"fresh");
        let key = RequestKey::get(target.as_str());
        assert!(poll_entry(&db, &names().dynamic_assets, &key).await.is_some());
    }

    #[tokio::test]
    async fn test_swr_no_entry_network_down_is_offline() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = stale_while_revalidate(&db, &names(), &fetcher, "GET", &url("/api/weather")).await;

        assert_eq!(resp, CapturedResponse::offline());
    }

    #[tokio::test]
    async fn test_swr_failed_revalidation_leaves_entry_intact() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let fetch = ScriptedFetch::new();
        let target = url("/api/weather");
        let key = RequestKey::get(target.as_str());
        db.put(&names().dynamic_assets, &key, &ok_response("stale")).await.unwrap();

        let fetcher: Arc<dyn Fetch> = fetch.clone();
        let resp = stale_while_revalidate(&db, &names(), &fetcher, "GET", &target).await;
        assert_eq!(resp.body, b"stale");

        // Give the revalidation task time to fail.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let entry = db.get(&names().dynamic_assets, &key).await.unwrap().unwrap();
        assert_eq!(entry.body, b"stale");

        // Repeating against the unchanged store is byte-identical.
        let again = stale_while_revalidate(&db, &names(), &fetcher, "GET", &target).await;
        assert_eq!(again, resp);
    }
}
