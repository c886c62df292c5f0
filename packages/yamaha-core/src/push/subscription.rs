//! UPnP event subscriptions.
//!
//! [`SubscriptionStore`] is the SID -> device map the NOTIFY endpoint reads.
//! [`UpnpSubscriber`] performs SUBSCRIBE / renewal / UNSUBSCRIBE and keeps
//! one renewal task per subscription, cancelled with the device.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::{Client, Method};
use tokio_util::sync::CancellationToken;

use super::{PushError, PushResult};
use crate::protocol_constants::{
    HTTP_TIMEOUT_SECS, UPNP_MIN_RENEWAL_SECS, UPNP_RENEWAL_MARGIN_SECS,
    UPNP_SUBSCRIPTION_TIMEOUT_SECS,
};
use crate::runtime::{TaskSpawner, TokioSpawner};

/// An active subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub device_id: String,
    pub event_url: String,
    pub timeout_secs: u64,
}

/// SID -> subscription.
#[derive(Default)]
pub struct SubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl SubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sid: &str, subscription: Subscription) {
        self.subscriptions
            .write()
            .insert(sid.to_string(), subscription);
    }

    pub fn remove(&self, sid: &str) -> Option<Subscription> {
        self.subscriptions.write().remove(sid)
    }

    /// Device a NOTIFY with this SID belongs to.
    #[must_use]
    pub fn device_for_sid(&self, sid: &str) -> Option<String> {
        self.subscriptions
            .read()
            .get(sid)
            .map(|s| s.device_id.clone())
    }

    /// SIDs and event URLs held for `device_id`.
    #[must_use]
    pub fn for_device(&self, device_id: &str) -> Vec<(String, String)> {
        self.subscriptions
            .read()
            .iter()
            .filter(|(_, s)| s.device_id == device_id)
            .map(|(sid, s)| (sid.clone(), s.event_url.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

/// Seconds to wait before renewing a subscription granted for `timeout_secs`.
#[must_use]
pub fn renewal_delay_secs(timeout_secs: u64) -> u64 {
    timeout_secs
        .saturating_sub(UPNP_RENEWAL_MARGIN_SECS)
        .max(UPNP_MIN_RENEWAL_SECS)
}

/// Parses a `TIMEOUT: Second-N` header value.
fn parse_timeout(value: Option<&str>) -> u64 {
    value
        .and_then(|v| v.strip_prefix("Second-"))
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(UPNP_SUBSCRIPTION_TIMEOUT_SECS)
}

fn subscribe_method() -> Method {
    // SAFETY: "SUBSCRIBE" is a valid HTTP method name
    Method::from_bytes(b"SUBSCRIBE").expect("SUBSCRIBE is a valid method")
}

fn unsubscribe_method() -> Method {
    // SAFETY: "UNSUBSCRIBE" is a valid HTTP method name
    Method::from_bytes(b"UNSUBSCRIBE").expect("UNSUBSCRIBE is a valid method")
}

/// Manages UPnP subscriptions for all devices.
pub struct UpnpSubscriber {
    http: Client,
    store: Arc<SubscriptionStore>,
    callback_url: String,
    spawner: TokioSpawner,
    cancel: CancellationToken,
    device_tokens: DashMap<String, CancellationToken>,
}

impl UpnpSubscriber {
    /// `cancel` is the parent of every renewal task.
    #[must_use]
    pub fn new(
        http: Client,
        store: Arc<SubscriptionStore>,
        callback_url: String,
        spawner: TokioSpawner,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            http,
            store,
            callback_url,
            spawner,
            cancel,
            device_tokens: DashMap::new(),
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SubscriptionStore> {
        &self.store
    }

    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    async fn send_subscribe(&self, event_url: &str) -> PushResult<(String, u64)> {
        let response = self
            .http
            .request(subscribe_method(), event_url)
            .header("CALLBACK", format!("<{}>", self.callback_url))
            .header("NT", "upnp:event")
            .header("TIMEOUT", format!("Second-{}", UPNP_SUBSCRIPTION_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::SubscriptionFailed(response.status().as_u16()));
        }

        let sid = response
            .headers()
            .get("SID")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(PushError::MissingSid)?;
        let timeout = parse_timeout(response.headers().get("TIMEOUT").and_then(|v| v.to_str().ok()));
        Ok((sid, timeout))
    }

    async fn send_renew(&self, event_url: &str, sid: &str) -> PushResult<u64> {
        let response = self
            .http
            .request(subscribe_method(), event_url)
            .header("SID", sid)
            .header("TIMEOUT", format!("Second-{}", UPNP_SUBSCRIPTION_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::SubscriptionFailed(response.status().as_u16()));
        }
        Ok(parse_timeout(
            response.headers().get("TIMEOUT").and_then(|v| v.to_str().ok()),
        ))
    }

    fn device_token(&self, device_id: &str) -> CancellationToken {
        self.device_tokens
            .entry(device_id.to_string())
            .or_insert_with(|| self.cancel.child_token())
            .clone()
    }

    /// Subscribes `device_id` to `event_url` and schedules renewals.
    pub async fn subscribe(self: &Arc<Self>, device_id: &str, event_url: &str) -> PushResult<String> {
        let (sid, timeout_secs) = self.send_subscribe(event_url).await?;
        self.store.insert(
            &sid,
            Subscription {
                device_id: device_id.to_string(),
                event_url: event_url.to_string(),
                timeout_secs,
            },
        );
        log::info!(
            "[UPnP] Subscribed {} to {} (SID {}, {}s)",
            device_id,
            event_url,
            sid,
            timeout_secs
        );

        let this = Arc::clone(self);
        let token = self.device_token(device_id);
        let device_id = device_id.to_string();
        let event_url = event_url.to_string();
        let first_sid = sid.clone();
        self.spawner.spawn(async move {
            this.renewal_loop(device_id, event_url, first_sid, timeout_secs, token)
                .await;
        });

        Ok(sid)
    }

    async fn renewal_loop(
        &self,
        device_id: String,
        event_url: String,
        mut sid: String,
        mut timeout_secs: u64,
        token: CancellationToken,
    ) {
        loop {
            let delay = Duration::from_secs(renewal_delay_secs(timeout_secs));
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            match self.send_renew(&event_url, &sid).await {
                Ok(granted) => {
                    log::debug!("[UPnP] Renewed {} for {}s", sid, granted);
                    timeout_secs = granted;
                }
                Err(e) => {
                    log::warn!("[UPnP] Renewal of {} failed ({}), resubscribing", sid, e);
                    self.store.remove(&sid);
                    match self.send_subscribe(&event_url).await {
                        Ok((new_sid, granted)) => {
                            sid = new_sid;
                            timeout_secs = granted;
                            self.store.insert(
                                &sid,
                                Subscription {
                                    device_id: device_id.clone(),
                                    event_url: event_url.clone(),
                                    timeout_secs,
                                },
                            );
                        }
                        Err(e) => {
                            log::warn!(
                                "[UPnP] Resubscribe of {} to {} failed: {}",
                                device_id,
                                event_url,
                                e
                            );
                            // Retry at the minimum interval.
                            timeout_secs = 0;
                        }
                    }
                }
            }
        }
    }

    /// Cancels renewals and unsubscribes every SID of `device_id`.
    pub async fn unsubscribe_device(&self, device_id: &str) {
        if let Some((_, token)) = self.device_tokens.remove(device_id) {
            token.cancel();
        }

        for (sid, event_url) in self.store.for_device(device_id) {
            self.store.remove(&sid);
            let result = self
                .http
                .request(unsubscribe_method(), &event_url)
                .header("SID", &sid)
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .send()
                .await;
            match result {
                Ok(r) if r.status().is_success() => {
                    log::info!("[UPnP] Unsubscribed {} ({})", device_id, sid);
                }
                Ok(r) => log::debug!("[UPnP] UNSUBSCRIBE {} returned {}", sid, r.status()),
                Err(e) => log::debug!("[UPnP] UNSUBSCRIBE {} failed: {}", sid, e),
            }
        }
    }
}
