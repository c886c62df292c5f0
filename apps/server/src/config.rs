//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use yamaha_core::Protocol;

/// One device the server monitors from startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Device id used in logs and as the settings key.
    pub id: String,

    /// `receiver` (XML protocol) or `musiccast` (Extended Control).
    pub protocol: Protocol,

    /// Host settings, e.g. `ipAddress`, `zone`, `updateInterval`.
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// UDP port for MusicCast unicast events (0 disables them).
    /// Override: `YAMAHA_UNICAST_PORT`
    pub unicast_port: u16,

    /// TCP port for UPnP NOTIFY callbacks (0 picks a free port).
    /// Override: `YAMAHA_EVENT_PORT`
    pub event_port: u16,

    /// IP address devices should send events to.
    /// If not specified, auto-detection will be attempted.
    /// Override: `YAMAHA_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Name registered with MusicCast devices (defaults to the hostname).
    pub push_channel_name: Option<String>,

    /// Subscribe to UPnP events.
    pub upnp_events: bool,

    /// Poll interval for devices without an `updateInterval` setting.
    /// Override: `YAMAHA_UPDATE_INTERVAL`
    pub update_interval_secs: u64,

    /// Devices to monitor.
    pub devices: Vec<DeviceConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = yamaha_core::Config::default();
        Self {
            unicast_port: core.unicast_port,
            event_port: core.event_port,
            advertise_ip: None,
            push_channel_name: None,
            upnp_events: core.upnp_events,
            update_interval_secs: core.default_update_interval_secs,
            devices: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.check_devices()?;
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("YAMAHA_UNICAST_PORT") {
            if let Ok(port) = val.parse() {
                self.unicast_port = port;
            }
        }

        if let Ok(val) = std::env::var("YAMAHA_EVENT_PORT") {
            if let Ok(port) = val.parse() {
                self.event_port = port;
            }
        }

        if let Ok(val) = std::env::var("YAMAHA_ADVERTISE_IP") {
            if let Ok(ip) = val.parse() {
                self.advertise_ip = Some(ip);
            }
        }

        if let Ok(val) = std::env::var("YAMAHA_UPDATE_INTERVAL") {
            if let Ok(interval) = val.parse() {
                self.update_interval_secs = interval;
            }
        }
    }

    fn check_devices(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for device in &self.devices {
            if !seen.insert(device.id.as_str()) {
                anyhow::bail!("Device id {} is listed twice", device.id);
            }
        }
        Ok(())
    }

    /// Converts to yamaha-core's Config type.
    pub fn to_core_config(&self) -> yamaha_core::Config {
        yamaha_core::Config {
            unicast_port: self.unicast_port,
            event_port: self.event_port,
            advertise_ip: self.advertise_ip,
            push_channel_name: self.push_channel_name.clone(),
            upnp_events: self.upnp_events,
            default_update_interval_secs: self.update_interval_secs,
            ..Default::default()
        }
    }
}
