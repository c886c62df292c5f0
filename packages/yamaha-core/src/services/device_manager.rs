//! Device manager service.
//!
//! Owns the set of running [`DeviceMonitor`]s. Adding a device resolves its
//! connection settings, migrates its capability set, registers its push inbox
//! and subscribes to its UPnP event URLs. Removal undoes all of it in the order
//! that keeps events away from a device that is going away.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::capabilities;
use super::device_monitor::{DeviceHandle, DeviceMonitor, MAX_VOLUME_SETTING};
use super::{ServiceError, ServiceResult};
use crate::events::HostPlatform;
use crate::protocol_constants::{DEFAULT_UPDATE_INTERVAL_SECS, DEVICE_INBOX_CAPACITY};
use crate::push::{DeviceRegistry, UpnpSubscriber};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::yamaha::discovery::PairingCandidate;
use crate::yamaha::traits::ProtocolClient;
use crate::yamaha::types::{ConnectionEndpoint, Protocol};

/// Connection settings of one device, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    pub protocol: Protocol,
    pub url_base: String,
    pub control_path: String,
    pub zone: String,
    pub event_urls: Vec<String>,
    pub max_volume: Option<u32>,
}

fn text_setting(platform: &dyn HostPlatform, device_id: &str, key: &str) -> Option<String> {
    platform
        .get_setting(device_id, key)
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|s| !s.is_empty())
}

impl DeviceSettings {
    /// Settings key of the control path for `protocol`.
    #[must_use]
    pub fn control_path_key(protocol: Protocol) -> &'static str {
        match protocol {
            Protocol::Legacy => "controlURL",
            Protocol::Extended => "serviceUrl",
        }
    }

    /// Reads the settings of `device_id`.
    ///
    /// A missing `urlBase` is derived from `ipAddress`; missing control path
    /// and zone fall back to the protocol defaults. Derived values are written
    /// back.
    pub fn resolve(
        platform: &dyn HostPlatform,
        device_id: &str,
        protocol: Protocol,
    ) -> ServiceResult<Self> {
        let url_base = match text_setting(platform, device_id, "urlBase") {
            Some(url_base) => url_base,
            None => {
                let ip = text_setting(platform, device_id, "ipAddress")
                    .or_else(|| text_setting(platform, device_id, "ipaddress"))
                    .ok_or(ServiceError::MissingSetting("ipAddress"))?;
                let url_base = format!("http://{}/", ip);
                platform.set_setting(device_id, "urlBase", json!(url_base));
                url_base
            }
        };

        let path_key = Self::control_path_key(protocol);
        let control_path = text_setting(platform, device_id, path_key).unwrap_or_else(|| {
            let path = protocol.default_control_path().to_string();
            platform.set_setting(device_id, path_key, json!(path));
            path
        });

        let zone = text_setting(platform, device_id, "zone").unwrap_or_else(|| {
            let zone = protocol.default_zone().to_string();
            platform.set_setting(device_id, "zone", json!(zone));
            zone
        });

        let event_urls = match platform.get_setting(device_id, "eventUrls") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        };

        let max_volume = platform
            .get_setting(device_id, MAX_VOLUME_SETTING)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok());

        Ok(Self {
            protocol,
            url_base,
            control_path,
            zone,
            event_urls,
            max_volume,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> ConnectionEndpoint {
        ConnectionEndpoint::new(self.protocol, self.url_base.clone())
            .with_control_path(self.control_path.clone())
            .with_zone(self.zone.clone())
    }
}

/// Runs one monitor per paired device.
pub struct DeviceManager {
    http: Client,
    platform: Arc<dyn HostPlatform>,
    registry: Arc<DeviceRegistry>,
    subscriber: Option<Arc<UpnpSubscriber>>,
    push_channel: Option<(String, u16)>,
    default_interval_secs: u64,
    spawner: TokioSpawner,
    cancel: CancellationToken,
    devices: DashMap<String, DeviceHandle>,
}

impl DeviceManager {
    /// `cancel` is the parent token of every monitor.
    pub fn new(
        http: Client,
        platform: Arc<dyn HostPlatform>,
        registry: Arc<DeviceRegistry>,
        spawner: TokioSpawner,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            http,
            platform,
            registry,
            subscriber: None,
            push_channel: None,
            default_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            spawner,
            cancel,
            devices: DashMap::new(),
        }
    }

    /// Registers extended devices for unicast events under `name` on `port`.
    #[must_use]
    pub fn with_push_channel(mut self, name: impl Into<String>, port: u16) -> Self {
        self.push_channel = Some((name.into(), port));
        self
    }

    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Arc<UpnpSubscriber>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Poll interval for devices without an `updateInterval` setting.
    #[must_use]
    pub fn with_default_interval(mut self, secs: u64) -> Self {
        self.default_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn platform(&self) -> &Arc<dyn HostPlatform> {
        &self.platform
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn device(&self, device_id: &str) -> Option<DeviceHandle> {
        self.devices.get(device_id).map(|h| h.clone())
    }

    #[must_use]
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Stores the pairing record of `candidate` and starts monitoring it.
    pub fn pair(&self, candidate: &PairingCandidate) -> ServiceResult<DeviceHandle> {
        let record = candidate.to_pairing_record();
        if let Ok(Value::Object(settings)) = serde_json::to_value(&record.settings) {
            for (key, value) in settings {
                self.platform.set_setting(&record.id, &key, value);
            }
        }
        log::info!("[DeviceManager] Paired {} ({})", record.name, record.id);
        self.add_device(&record.id, candidate.protocol)
    }

    /// Builds a client from the device's settings and starts monitoring it.
    pub fn add_device(&self, device_id: &str, protocol: Protocol) -> ServiceResult<DeviceHandle> {
        if self.devices.contains_key(device_id) {
            return Err(ServiceError::DeviceExists(device_id.to_string()));
        }

        let settings = DeviceSettings::resolve(&*self.platform, device_id, protocol)?;
        let mut endpoint = settings.endpoint();
        if protocol == Protocol::Extended {
            if let Some((name, port)) = &self.push_channel {
                endpoint = endpoint.with_push_channel(name.clone(), *port);
            }
        }

        let client = crate::yamaha::connect(
            self.http.clone(),
            protocol,
            &endpoint,
            settings.max_volume,
        );
        let handle = self.attach(device_id, client)?;
        self.subscribe_events(device_id, settings.event_urls);
        Ok(handle)
    }

    /// Starts monitoring `device_id` through an existing client.
    pub fn attach(
        &self,
        device_id: &str,
        client: Arc<dyn ProtocolClient>,
    ) -> ServiceResult<DeviceHandle> {
        let Entry::Vacant(slot) = self.devices.entry(device_id.to_string()) else {
            return Err(ServiceError::DeviceExists(device_id.to_string()));
        };

        let protocol = client.protocol();
        capabilities::migrate(&*self.platform, device_id, protocol);

        let (inbox_tx, inbox_rx) = mpsc::channel(DEVICE_INBOX_CAPACITY);
        let monitor = DeviceMonitor::new(
            device_id,
            client,
            Arc::clone(&self.platform),
            Arc::clone(&self.registry),
            self.default_interval_secs,
        );
        self.registry.register(device_id, inbox_tx);
        let handle = monitor.spawn(inbox_rx, &self.spawner, self.cancel.child_token());
        slot.insert(handle.clone());

        log::info!("[DeviceManager] Added {} ({})", device_id, protocol);
        Ok(handle)
    }

    fn subscribe_events(&self, device_id: &str, event_urls: Vec<String>) {
        let Some(subscriber) = &self.subscriber else {
            return;
        };
        for event_url in event_urls {
            let subscriber = Arc::clone(subscriber);
            let device_id = device_id.to_string();
            self.spawner.spawn(async move {
                if let Err(e) = subscriber.subscribe(&device_id, &event_url).await {
                    log::warn!(
                        "[DeviceManager] Subscribing {} to {} failed: {}",
                        device_id,
                        event_url,
                        e
                    );
                }
            });
        }
    }

    /// Stops monitoring `device_id`.
    ///
    /// Deregisters first so no event reaches the device, then stops its
    /// monitor, then drops its UPnP subscriptions.
    pub async fn remove_device(&self, device_id: &str) -> ServiceResult<()> {
        let (_, handle) = self
            .devices
            .remove(device_id)
            .ok_or_else(|| ServiceError::DeviceNotFound(device_id.to_string()))?;

        self.registry.deregister(device_id);
        handle.stop();
        if let Some(subscriber) = &self.subscriber {
            subscriber.unsubscribe_device(device_id).await;
        }

        log::info!("[DeviceManager] Removed {}", device_id);
        Ok(())
    }

    /// Removes every device.
    pub async fn shutdown(&self) {
        for device_id in self.device_ids() {
            if let Err(e) = self.remove_device(&device_id).await {
                log::debug!("[DeviceManager] {} already gone: {}", device_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingPlatform;
    use crate::events::LoggingPlatform;
    use crate::push::{DispatchOutcome, PushEvent};
    use crate::services::capabilities::SCHEMA_VERSION_SETTING;
    use crate::services::test_support::{state, ScriptedClient, Step};
    use crate::protocol_constants::CAPABILITY_SCHEMA_VERSION;
    use std::time::Duration;

    fn manager(platform: Arc<dyn HostPlatform>) -> DeviceManager {
        DeviceManager::new(
            Client::new(),
            platform,
            Arc::new(DeviceRegistry::new()),
            TokioSpawner::current(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn settings_derive_url_base_and_write_back_defaults() {
        let platform = LoggingPlatform::new();
        platform.set_setting("av", "ipAddress", json!("192.168.1.8"));

        let settings = DeviceSettings::resolve(&platform, "av", Protocol::Legacy).unwrap();
        assert_eq!(settings.url_base, "http://192.168.1.8/");
        assert_eq!(settings.control_path, "/YamahaRemoteControl/ctrl");
        assert_eq!(settings.zone, "Main_Zone");
        assert_eq!(
            platform.get_setting("av", "urlBase"),
            Some(json!("http://192.168.1.8/"))
        );
        assert_eq!(
            platform.get_setting("av", "controlURL"),
            Some(json!("/YamahaRemoteControl/ctrl"))
        );
    }

    #[test]
    fn settings_keep_stored_values() {
        let platform = LoggingPlatform::new();
        platform.set_setting("mc", "urlBase", json!("http://10.0.0.5:80/"));
        platform.set_setting("mc", "zone", json!("zone2"));
        platform.set_setting("mc", "maxVolume", json!(60));
        platform.set_setting("mc", "eventUrls", json!(["http://10.0.0.5:49154/AVTransport/event"]));

        let settings = DeviceSettings::resolve(&platform, "mc", Protocol::Extended).unwrap();
        assert_eq!(settings.url_base, "http://10.0.0.5:80/");
        assert_eq!(settings.control_path, "/YamahaExtendedControl/v1/");
        assert_eq!(settings.zone, "zone2");
        assert_eq!(settings.max_volume, Some(60));
        assert_eq!(settings.event_urls.len(), 1);
        assert_eq!(platform.get_setting("mc", "ipAddress"), None);
    }

    #[test]
    fn settings_without_address_are_rejected() {
        let platform = LoggingPlatform::new();
        assert!(matches!(
            DeviceSettings::resolve(&platform, "x", Protocol::Legacy),
            Err(ServiceError::MissingSetting("ipAddress"))
        ));
    }

    #[tokio::test]
    async fn attach_registers_and_remove_deregisters() {
        let platform = Arc::new(RecordingPlatform::default());
        let manager = manager(Arc::clone(&platform) as Arc<dyn HostPlatform>);
        let client = Arc::new(ScriptedClient::new(
            Protocol::Legacy,
            vec![Step::State(state(true, false, "HDMI1"))],
        ));

        let handle = manager.attach("av", client.clone()).unwrap();
        assert!(manager.registry().contains("av"));
        assert!(matches!(
            manager.attach("av", client.clone()),
            Err(ServiceError::DeviceExists(_))
        ));
        assert_eq!(
            platform.get_setting("av", SCHEMA_VERSION_SETTING),
            Some(json!(CAPABILITY_SCHEMA_VERSION))
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.calls().contains(&"get_state".to_string()));

        manager.remove_device("av").await.unwrap();
        assert!(handle.is_stopped());
        assert!(manager.is_empty());
        assert_eq!(
            manager.registry().dispatch("av", PushEvent::default()),
            DispatchOutcome::Unknown
        );
        assert!(matches!(
            manager.remove_device("av").await,
            Err(ServiceError::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn removal_drops_a_poll_in_flight() {
        let platform = Arc::new(RecordingPlatform::default());
        let manager = manager(Arc::clone(&platform) as Arc<dyn HostPlatform>);
        let client = Arc::new(
            ScriptedClient::new(
                Protocol::Legacy,
                vec![Step::State(state(true, false, "HDMI1"))],
            )
            .with_delay(Duration::from_millis(200)),
        );

        manager.attach("av", client.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(client.calls(), vec!["get_state"]);

        manager.remove_device("av").await.unwrap();
        platform.take();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(platform.take().is_empty());
        assert_eq!(client.calls(), vec!["get_state"]);
    }

    #[tokio::test]
    async fn pairing_stores_settings_and_starts_monitor() {
        let platform = Arc::new(LoggingPlatform::new());
        let manager = manager(Arc::clone(&platform) as Arc<dyn HostPlatform>)
            .with_push_channel("yamaha-bridge", 41100);
        let candidate = PairingCandidate {
            id: "5f9ec1b3".into(),
            name: "Kitchen - WX-030".into(),
            protocol: Protocol::Extended,
            address: "127.0.0.1".into(),
            endpoint: ConnectionEndpoint::new(Protocol::Extended, "http://127.0.0.1:1/"),
            protocol_version: None,
            model_name: Some("WX-030".into()),
            event_urls: Vec::new(),
        };

        let handle = manager.pair(&candidate).unwrap();
        assert_eq!(handle.device_id(), "5f9ec1b3");
        assert!(handle.capabilities().contains("speaker_shuffle"));
        assert_eq!(
            platform.get_setting("5f9ec1b3", "serviceUrl"),
            Some(json!("/YamahaExtendedControl/v1/"))
        );
        assert_eq!(manager.device_ids(), vec!["5f9ec1b3"]);

        manager.shutdown().await;
        assert!(manager.is_empty());
        assert!(handle.is_stopped());
    }
}
