//! Push events from devices.
//!
//! Two ingress paths feed the same [`PushEvent`] type:
//!
//! - `unicast` - JSON datagrams MusicCast devices send to the `X-AppPort`
//!   registered by the extended client
//! - `upnp` - GENA NOTIFY bodies, received by the HTTP endpoint in `api`
//!
//! Both resolve the sending device through the shared [`DeviceRegistry`] and
//! forward into that device's reconciler inbox.

pub mod event;
pub mod registry;
pub mod subscription;
pub mod unicast;
pub mod upnp;

use thiserror::Error;

use crate::yamaha::xml::XmlError;

pub use event::{PushEvent, PushFlags, ZoneUpdate};
pub use registry::{DeviceRegistry, DispatchOutcome};
pub use subscription::{SubscriptionStore, UpnpSubscriber};
pub use unicast::UnicastListener;

/// Errors from push ingress and UPnP subscriptions.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Failed to bind push listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Invalid unicast payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid NOTIFY body: {0}")]
    Xml(#[from] XmlError),

    #[error("Unicast event has no device_id")]
    MissingDeviceId,

    #[error("Subscription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Subscription rejected with status {0}")]
    SubscriptionFailed(u16),

    #[error("Subscription response has no SID")]
    MissingSid,
}

pub type PushResult<T> = Result<T, PushError>;
