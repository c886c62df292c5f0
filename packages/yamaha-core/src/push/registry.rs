//! Dispatch registry shared by the push listeners and the device manager.

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::event::PushEvent;

/// Result of forwarding one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// No device registered under the id.
    Unknown,
    /// The device inbox is full; the event was dropped.
    Full,
    /// The device task has exited.
    Closed,
}

/// Maps device ids (and network id aliases) to reconciler inboxes.
///
/// Registration and removal are safe from any task. Removing a device drops
/// its aliases too, so no event reaches it afterwards.
#[derive(Default)]
pub struct DeviceRegistry {
    inboxes: DashMap<String, mpsc::Sender<PushEvent>>,
    /// network id -> device id
    aliases: DashMap<String, String>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, device_id: &str, inbox: mpsc::Sender<PushEvent>) {
        self.inboxes.insert(device_id.to_string(), inbox);
        log::debug!("[Registry] Registered {}", device_id);
    }

    /// Routes events stamped with `network_id` to `device_id`.
    pub fn alias(&self, network_id: &str, device_id: &str) {
        self.aliases
            .insert(network_id.to_string(), device_id.to_string());
        log::debug!("[Registry] {} is known as {}", device_id, network_id);
    }

    pub fn deregister(&self, device_id: &str) {
        self.inboxes.remove(device_id);
        self.aliases.retain(|_, id| id != device_id);
        log::debug!("[Registry] Deregistered {}", device_id);
    }

    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.inboxes.contains_key(device_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// Forwards to the device registered under `device_id`.
    pub fn dispatch(&self, device_id: &str, event: PushEvent) -> DispatchOutcome {
        // Clone the sender so no map guard is held across try_send.
        let Some(inbox) = self.inboxes.get(device_id).map(|s| s.clone()) else {
            return DispatchOutcome::Unknown;
        };
        match inbox.try_send(event) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("[Registry] Inbox of {} is full, dropping event", device_id);
                DispatchOutcome::Full
            }
            Err(mpsc::error::TrySendError::Closed(_)) => DispatchOutcome::Closed,
        }
    }

    /// Forwards to the device aliased as `network_id`, or registered under it.
    pub fn dispatch_network(&self, network_id: &str, event: PushEvent) -> DispatchOutcome {
        let device_id = self
            .aliases
            .get(network_id)
            .map(|id| id.clone())
            .unwrap_or_else(|| network_id.to_string());
        self.dispatch(&device_id, event)
    }
}
