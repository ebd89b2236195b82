//! HTTP serving surface.
//!
//! Every request that is not a `/_sw/*` control call goes through the
//! gateway's fetch pipeline. When the gateway declines (foreign origin, not
//! yet active) the request is passed straight to the network, mirroring
//! default browser handling.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::Response,
    routing::post,
};
use url::Url;

use crate::classify::Destination;
use crate::events;
use crate::gateway::{Gateway, GatewayRequest};
use sojourn_core::CapturedResponse;

/// Headers never replayed from a captured response; the serving layer owns
/// framing.
const SKIP_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// Build the gateway router.
pub fn router(gateway: Arc<Gateway>, upstream: Url) -> Router {
    let state = ServerState { gateway, upstream };
    Router::new()
        .route("/_sw/push", post(push))
        .route("/_sw/notification-click", post(notification_click))
        .route("/_sw/sync", post(sync))
        .fallback(proxy)
        .with_state(state)
}

#[derive(Clone)]
struct ServerState {
    gateway: Arc<Gateway>,
    upstream: Url,
}

async fn proxy(State(state): State<ServerState>, req: Request) -> Response {
    let method = req.method().as_str().to_string();
    let destination = destination_of(&req);

    let target = match target_url(&state.upstream, &req) {
        Ok(target) => target,
        Err(reason) => {
            tracing::debug!(%reason, "rejecting unmappable request");
            return plain_response(StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    let gw_req = GatewayRequest { method: method.clone(), url: target.clone(), destination };
    if let Some(resp) = state.gateway.handle_fetch(&gw_req).await {
        return into_response(resp);
    }

    // Declined: default network handling, no caching, no offline fallback.
    match state.gateway.passthrough(&method, &target).await {
        Ok(resp) => into_response(resp),
        Err(e) => {
            tracing::debug!(url = %target, error = %e, "passthrough failed");
            plain_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
        }
    }
}

async fn push(body: Bytes) -> StatusCode {
    events::handle_push(&body);
    StatusCode::ACCEPTED
}

async fn notification_click(body: Bytes) -> StatusCode {
    let action = String::from_utf8_lossy(&body);
    events::handle_notification_click(action.trim());
    StatusCode::ACCEPTED
}

async fn sync(body: Bytes) -> StatusCode {
    let tag = String::from_utf8_lossy(&body);
    events::handle_sync(tag.trim()).await;
    StatusCode::ACCEPTED
}

/// Resolve the request's target URL.
///
/// Absolute-form URIs (proxy style) are taken as-is, letting the gateway
/// apply its origin scoping; origin-form paths resolve against the upstream.
fn target_url(upstream: &Url, req: &Request) -> Result<Url, String> {
    let uri = req.uri();
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string()).map_err(|e| e.to_string());
    }
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    upstream.join(path_and_query).map_err(|e| e.to_string())
}

/// Derive the request destination from fetch-metadata headers, falling back
/// to content negotiation.
fn destination_of(req: &Request) -> Destination {
    if let Some(dest) = req.headers().get("sec-fetch-dest")
        && dest.as_bytes() == b"document"
    {
        return Destination::Document;
    }
    if req.headers().get("sec-fetch-dest").is_none()
        && let Some(accept) = req.headers().get(header::ACCEPT)
        && accept.to_str().is_ok_and(|v| v.contains("text/html"))
    {
        return Destination::Document;
    }
    Destination::Other
}

fn into_response(captured: CapturedResponse) -> Response {
    let status = StatusCode::from_u16(captured.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in &captured.headers {
            if SKIP_HEADERS.contains(&name.to_lowercase().as_str()) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                headers.insert(name, value);
            }
        }
    }
    builder
        .body(Body::from(captured.body))
        .unwrap_or_else(|_| plain_response(StatusCode::BAD_GATEWAY, "Bad Gateway"))
}

fn plain_response(status: StatusCode, body: &'static str) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body))
        .unwrap_or_default()
}
