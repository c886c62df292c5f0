//! Core configuration types.
//!
//! [`Config`] is the runtime configuration of the bridge: push ingress ports,
//! the name devices are told to send events for, polling defaults and SSDP
//! tuning. Hosts build it (the server from YAML) and hand it to
//! [`bootstrap_services`](crate::bootstrap::bootstrap_services).

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    APP_NAME, DEFAULT_UPDATE_INTERVAL_SECS, HTTP_TIMEOUT_SECS, MINIMUM_UPDATE_INTERVAL_MS,
};
use crate::yamaha::discovery::SsdpConfig;

/// Configuration for the Yamaha bridge.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    // Push ingress
    /// UDP port MusicCast devices send unicast events to (0 = disabled).
    pub unicast_port: u16,

    /// TCP port of the UPnP NOTIFY server (0 = auto-allocate).
    pub event_port: u16,

    /// Address devices should call back to. Detected when unset.
    pub advertise_ip: Option<IpAddr>,

    /// Name registered with MusicCast devices through `X-AppName`.
    /// Defaults to the machine hostname.
    pub push_channel_name: Option<String>,

    /// Subscribe to UPnP events for devices that advertise event URLs.
    pub upnp_events: bool,

    // Polling
    /// Poll interval for devices without an `updateInterval` setting (seconds).
    pub default_update_interval_secs: u64,

    /// Timeout applied to every device request (seconds).
    pub http_timeout_secs: u64,

    // Discovery
    /// Number of M-SEARCH packets to send per interface.
    pub ssdp_send_count: u64,

    /// Delay between M-SEARCH packets (milliseconds).
    pub ssdp_retry_delay_ms: u64,

    /// How long to collect SSDP responses (milliseconds).
    pub discovery_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unicast_port: 41100,
            event_port: 41101,
            advertise_ip: None,
            push_channel_name: None,
            upnp_events: true,
            default_update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            ssdp_send_count: 3,
            ssdp_retry_delay_ms: 800,
            discovery_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.http_timeout_secs == 0 {
            return Err("http_timeout_secs must be >= 1".to_string());
        }
        if self.ssdp_send_count == 0 {
            return Err("ssdp_send_count must be >= 1".to_string());
        }
        if self.default_update_interval_secs * 1000 < MINIMUM_UPDATE_INTERVAL_MS {
            log::warn!(
                "[Config] default_update_interval_secs={} is below the {}ms floor and will be clamped",
                self.default_update_interval_secs,
                MINIMUM_UPDATE_INTERVAL_MS
            );
        }
        if let Some(name) = &self.push_channel_name {
            if name.trim().is_empty() {
                return Err("push_channel_name must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Push channel name, falling back to the hostname and then the app name.
    #[must_use]
    pub fn resolved_push_channel_name(&self) -> String {
        if let Some(name) = &self.push_channel_name {
            return name.clone();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| APP_NAME.to_string())
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn ssdp_config(&self) -> SsdpConfig {
        SsdpConfig {
            send_count: self.ssdp_send_count,
            retry_delay: Duration::from_millis(self.ssdp_retry_delay_ms),
            discovery_timeout: Duration::from_millis(self.discovery_timeout_ms),
            ..SsdpConfig::default()
        }
    }
}
