//! Best-effort auxiliary events.
//!
//! Push notifications, notification clicks, and the background-sync hook
//! carry no correctness contract: malformed payloads and unknown tags are
//! logged and swallowed, and nothing here can affect request handling.

use serde::Deserialize;

/// A push payload as delivered by the push service.
#[derive(Debug, Deserialize)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Handle a push payload by surfacing it as a notification.
///
/// Returns whether a notification was shown.
pub fn handle_push(payload: &[u8]) -> bool {
    match serde_json::from_slice::<PushPayload>(payload) {
        Ok(push) => {
            tracing::info!(title = %push.title, body = push.body.as_deref().unwrap_or(""), "push notification");
            true
        }
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed push payload");
            false
        }
    }
}

/// Handle a notification action.
///
/// The `open` action asks for the application window; anything else only
/// dismisses. Returns whether an open was requested.
pub fn handle_notification_click(action: &str) -> bool {
    if action == "open" {
        tracing::info!("notification action: opening application window");
        true
    } else {
        tracing::debug!(action, "notification dismissed");
        false
    }
}

/// Background-sync hook. Placeholder: the recognized tag runs no real work
/// yet.
///
/// TODO: sync queued check-in submissions once the app records them.
pub async fn handle_sync(tag: &str) -> bool {
    if tag == "background-sync" {
        tracing::info!("background sync completed");
        true
    } else {
        tracing::debug!(tag, "ignoring unknown sync tag");
        false
    }
}
