//! HTTP route handlers.
//!
//! All handlers are thin - parsing lives in `push::upnp`, routing in
//! `push::DeviceRegistry`.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{connect_info::ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::error::{CoreError, CoreResult, ErrorCode};
use crate::protocol_constants::{APP_NAME, MAX_NOTIFY_BODY_SIZE, SERVICE_ID, UPNP_CALLBACK_PATH};
use crate::push::{upnp, DispatchOutcome};

// ─────────────────────────────────────────────────────────────────────────────
// GENA Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Validates GENA NOTIFY headers per UPnP spec.
///
/// Returns `(sid, seq)`. SEQ is informational and defaults to `"?"`.
fn validate_gena_headers(headers: &HeaderMap) -> CoreResult<(String, String)> {
    let nt = headers.get("NT").and_then(|v| v.to_str().ok());
    if nt != Some("upnp:event") {
        log::warn!("[UPnP] NOTIFY missing or invalid NT header: {:?}", nt);
        return Err(CoreError::InvalidRequest(
            "Missing or invalid NT header".into(),
        ));
    }

    let nts = headers.get("NTS").and_then(|v| v.to_str().ok());
    if nts != Some("upnp:propchange") {
        log::warn!("[UPnP] NOTIFY missing or invalid NTS header: {:?}", nts);
        return Err(CoreError::InvalidRequest(
            "Missing or invalid NTS header".into(),
        ));
    }

    let sid = match headers.get("SID").and_then(|v| v.to_str().ok()) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            log::warn!("[UPnP] NOTIFY missing SID header");
            return Err(CoreError::InvalidRequest("Missing SID header".into()));
        }
    };

    let seq = headers
        .get("SEQ")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("?")
        .to_string();

    Ok((sid, seq))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(UPNP_CALLBACK_PATH, any(handle_upnp_notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "name": APP_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "devices": state.registry.len(),
        "subscriptions": state.subscriptions.len(),
    }))
}

/// Receives a UPnP event for a subscribed device.
///
/// Unknown SIDs are answered with 412 so the device drops the stale
/// subscription. Bodies that fail to parse are logged and acknowledged.
async fn handle_upnp_notify(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> CoreResult<impl IntoResponse> {
    let (parts, body) = req.into_parts();

    if parts.method.as_str() != "NOTIFY" {
        return Err(CoreError::InvalidRequest(format!(
            "Expected NOTIFY method, got {}",
            parts.method
        )));
    }

    let (sid, seq) = validate_gena_headers(&parts.headers)?;

    let body_bytes: Bytes = axum::body::to_bytes(body, MAX_NOTIFY_BODY_SIZE)
        .await
        .map_err(|e| {
            log::warn!("[UPnP] Failed to read NOTIFY body: {}", e);
            CoreError::InvalidRequest("Failed to read body".into())
        })?;

    let Some(device_id) = state.subscriptions.device_for_sid(&sid) else {
        log::debug!("[UPnP] NOTIFY for unknown SID {} from {}", sid, remote_addr);
        return Ok(StatusCode::PRECONDITION_FAILED);
    };

    let mut event = match upnp::notify_event(&device_id, &String::from_utf8_lossy(&body_bytes)) {
        Ok(event) => event,
        Err(e) => {
            log::warn!(
                "[UPnP] Dropping NOTIFY for {} (SEQ: {}): {} [{}]",
                device_id,
                seq,
                e,
                e.code()
            );
            return Ok(StatusCode::OK);
        }
    };
    event.sender = Some(remote_addr);

    let properties = event.properties.len();
    match state.registry.dispatch(&device_id, event) {
        DispatchOutcome::Delivered => log::debug!(
            "[UPnP] NOTIFY for {} (SEQ: {}) - {} property set(s)",
            device_id,
            seq,
            properties
        ),
        outcome => log::debug!(
            "[UPnP] NOTIFY for {} (SEQ: {}) not delivered: {:?}",
            device_id,
            seq,
            outcome
        ),
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use reqwest::Method;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::context::NetworkContext;
    use crate::push::subscription::Subscription;
    use crate::push::{DeviceRegistry, PushEvent, SubscriptionStore};
    use crate::yamaha::test_fixtures::{UPNP_NOTIFY_LAST_CHANGE, UPNP_NOTIFY_RENDERING};

    struct Harness {
        base: String,
        inbox: mpsc::Receiver<PushEvent>,
        cancel: CancellationToken,
    }

    async fn start() -> Harness {
        let registry = Arc::new(DeviceRegistry::new());
        let store = Arc::new(SubscriptionStore::new());
        let (tx, inbox) = mpsc::channel(8);
        registry.register("living-room", tx);
        store.insert(
            "uuid:sub-1",
            Subscription {
                device_id: "living-room".into(),
                event_url: "http://10.0.0.9/event".into(),
                timeout_secs: 300,
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let state = AppState::new(registry, store, NetworkContext::for_test());
        let cancel = CancellationToken::new();
        tokio::spawn(crate::api::serve_events(listener, state, cancel.clone()));

        Harness {
            base,
            inbox,
            cancel,
        }
    }

    fn notify(base: &str, sid: &str, body: &'static str) -> reqwest::RequestBuilder {
        reqwest::Client::new()
            .request(
                Method::from_bytes(b"NOTIFY").unwrap(),
                format!("{}{}", base, UPNP_CALLBACK_PATH),
            )
            .header("NT", "upnp:event")
            .header("NTS", "upnp:propchange")
            .header("SID", sid)
            .header("SEQ", "0")
            .body(body)
    }

    #[test]
    fn gena_headers_require_nt_nts_and_sid() {
        let mut headers = HeaderMap::new();
        headers.insert("NT", "upnp:event".parse().unwrap());
        headers.insert("NTS", "upnp:propchange".parse().unwrap());
        assert!(validate_gena_headers(&headers).is_err());

        headers.insert("SID", "uuid:abc".parse().unwrap());
        let (sid, seq) = validate_gena_headers(&headers).unwrap();
        assert_eq!(sid, "uuid:abc");
        assert_eq!(seq, "?");

        headers.insert("NTS", "upnp:other".parse().unwrap());
        assert!(validate_gena_headers(&headers).is_err());
    }

    #[tokio::test]
    async fn notify_is_dispatched_to_the_subscribed_device() {
        let mut h = start().await;

        let response = notify(&h.base, "uuid:sub-1", UPNP_NOTIFY_LAST_CHANGE)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let event = tokio::time::timeout(Duration::from_secs(2), h.inbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.device_id, "living-room");
        assert!(event.flags.play_info_updated);
        assert!(event.sender.is_some());
        h.cancel.cancel();
    }

    #[tokio::test]
    async fn unknown_sid_is_rejected_without_dispatch() {
        let mut h = start().await;

        let response = notify(&h.base, "uuid:stale", UPNP_NOTIFY_RENDERING)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::PRECONDITION_FAILED);
        assert!(h.inbox.try_recv().is_err());
        h.cancel.cancel();
    }

    #[tokio::test]
    async fn malformed_body_is_acknowledged_and_dropped() {
        let mut h = start().await;

        let response = notify(&h.base, "uuid:sub-1", "<e:propertyset><unclosed>")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(h.inbox.try_recv().is_err());
        h.cancel.cancel();
    }

    #[tokio::test]
    async fn non_notify_methods_are_bad_requests() {
        let h = start().await;

        let response = reqwest::Client::new()
            .get(format!("{}{}", h.base, UPNP_CALLBACK_PATH))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "invalid_request");
        h.cancel.cancel();
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let h = start().await;

        let body: serde_json::Value = reqwest::get(format!("{}/health", h.base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_ID);
        assert_eq!(body["devices"], 1);
        assert_eq!(body["subscriptions"], 1);
        h.cancel.cancel();
    }
}
