//! Normalized push event.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::yamaha::types::DeviceState;

/// What a push event says changed on the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushFlags {
    pub status_updated: bool,
    pub play_info_updated: bool,
    pub preset_info_updated: bool,
    pub signal_info_updated: bool,
    pub recent_info_updated: bool,
}

impl PushFlags {
    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: PushFlags) {
        self.status_updated |= other.status_updated;
        self.play_info_updated |= other.play_info_updated;
        self.preset_info_updated |= other.preset_info_updated;
        self.signal_info_updated |= other.signal_info_updated;
        self.recent_info_updated |= other.recent_info_updated;
    }

    /// Whether the event calls for a full state fetch.
    #[must_use]
    pub fn needs_poll(&self) -> bool {
        self.status_updated || self.play_info_updated
    }
}

/// Inline values a device pushed for one zone.
///
/// `state` is sparse; `volume` stays raw in `state.volume_raw` because only
/// the reconciler knows the device's ceiling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneUpdate {
    pub zone: String,
    pub state: DeviceState,
}

/// One decoded push notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushEvent {
    /// Network id (unicast `device_id`) or registry device id (UPnP SID lookup).
    pub device_id: String,
    pub sender: Option<SocketAddr>,
    pub zone_updates: Vec<ZoneUpdate>,
    pub flags: PushFlags,
    /// UPnP property maps, one per `InstanceID` or property set.
    pub properties: Vec<BTreeMap<String, String>>,
}

impl PushEvent {
    /// Inline update for `zone`, if the event carries one.
    #[must_use]
    pub fn zone_update(&self, zone: &str) -> Option<&DeviceState> {
        self.zone_updates
            .iter()
            .find(|u| u.zone == zone)
            .map(|u| &u.state)
    }
}
