//! Host platform abstraction and its stock implementations.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;

use super::{CapabilityValue, Trigger};
use crate::yamaha::transport::ClientError;

/// Everything the core asks of the host.
///
/// Calls are synchronous and must not block; implementations that forward to
/// an async transport should queue.
pub trait HostPlatform: Send + Sync {
    fn emit_capability_change(&self, device_id: &str, capability: &str, value: CapabilityValue);

    fn emit_trigger(&self, device_id: &str, trigger: &Trigger);

    fn get_setting(&self, device_id: &str, key: &str) -> Option<Value>;

    fn set_setting(&self, device_id: &str, key: &str, value: Value);

    fn report_available(&self, device_id: &str);

    fn report_unavailable(&self, device_id: &str, reason: &str);

    /// Errors that are neither transient nor expected.
    fn report_error(&self, device_id: &str, error: &ClientError);
}

/// Discards everything; settings are always absent.
pub struct NoopPlatform;

impl HostPlatform for NoopPlatform {
    fn emit_capability_change(&self, _: &str, _: &str, _: CapabilityValue) {}

    fn emit_trigger(&self, _: &str, _: &Trigger) {}

    fn get_setting(&self, _: &str, _: &str) -> Option<Value> {
        None
    }

    fn set_setting(&self, _: &str, _: &str, _: Value) {}

    fn report_available(&self, _: &str) {}

    fn report_unavailable(&self, _: &str, _: &str) {}

    fn report_error(&self, _: &str, _: &ClientError) {}
}

/// Logs host events and keeps settings in memory.
///
/// Used by the headless server, which has no host of its own.
#[derive(Default)]
pub struct LoggingPlatform {
    settings: DashMap<String, HashMap<String, Value>>,
}

impl LoggingPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the settings of one device.
    pub fn seed(&self, device_id: &str, settings: HashMap<String, Value>) {
        self.settings.insert(device_id.to_string(), settings);
    }

    /// Current settings of one device.
    #[must_use]
    pub fn settings_of(&self, device_id: &str) -> HashMap<String, Value> {
        self.settings
            .get(device_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl HostPlatform for LoggingPlatform {
    fn emit_capability_change(&self, device_id: &str, capability: &str, value: CapabilityValue) {
        tracing::info!(device = device_id, capability, ?value, "capability_change");
    }

    fn emit_trigger(&self, device_id: &str, trigger: &Trigger) {
        tracing::info!(device = device_id, trigger = trigger.name(), payload = %trigger.payload(), "trigger");
    }

    fn get_setting(&self, device_id: &str, key: &str) -> Option<Value> {
        self.settings.get(device_id)?.get(key).cloned()
    }

    fn set_setting(&self, device_id: &str, key: &str, value: Value) {
        tracing::debug!(device = device_id, key, %value, "set_setting");
        self.settings
            .entry(device_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn report_available(&self, device_id: &str) {
        tracing::info!(device = device_id, "available");
    }

    fn report_unavailable(&self, device_id: &str, reason: &str) {
        tracing::warn!(device = device_id, reason, "unavailable");
    }

    fn report_error(&self, device_id: &str, error: &ClientError) {
        tracing::error!(device = device_id, %error, kind = ?error.kind(), "device_error");
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn logging_platform_keeps_settings_per_device() {
        let platform = LoggingPlatform::new();
        platform.seed("a", HashMap::from([("zone".to_string(), json!("main"))]));
        platform.set_setting("a", "urlBase", json!("http://10.0.0.2/"));
        platform.set_setting("b", "zone", json!("Main_Zone"));

        assert_eq!(platform.get_setting("a", "zone"), Some(json!("main")));
        assert_eq!(platform.get_setting("a", "urlBase"), Some(json!("http://10.0.0.2/")));
        assert_eq!(platform.get_setting("b", "zone"), Some(json!("Main_Zone")));
        assert_eq!(platform.get_setting("c", "zone"), None);
        assert_eq!(platform.settings_of("a").len(), 2);
    }

    #[test]
    fn noop_platform_has_no_settings() {
        NoopPlatform.set_setting("a", "zone", json!("main"));
        assert_eq!(NoopPlatform.get_setting("a", "zone"), None);
    }
}
