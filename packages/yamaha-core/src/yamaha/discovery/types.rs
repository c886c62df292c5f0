//! Shared types for device discovery and pairing.

use serde::Serialize;
use thiserror::Error;

use crate::yamaha::types::{ConnectionEndpoint, Protocol};

/// Errors that stop a whole discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind a UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// One SSDP response, before its description is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    /// Device UUID taken from the USN header.
    pub id: String,
    /// Address the response came from.
    pub address: String,
    /// Description document URL (LOCATION header).
    pub location: String,
}

/// Why a discovered device was not offered for pairing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("description fetch failed: {0}")]
    Fetch(String),

    #[error("description is not valid XML: {0}")]
    Parse(String),

    #[error("modelDescription is {found:?}, expected {expected}")]
    WrongModel {
        expected: &'static str,
        found: Option<String>,
    },

    #[error("description has no yamaha:X_device element")]
    MissingVendorExtension,

    #[error("yamaha:X_device has no yamaha:X_URLBase")]
    MissingUrlBase,

    #[error("yamaha:X_device has no yamaha:X_serviceList")]
    MissingServiceList,

    #[error("no service of type {spec_type}")]
    ServiceNotFound { spec_type: &'static str },
}

impl Rejection {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch_failed",
            Self::Parse(_) => "parse_failed",
            Self::WrongModel { .. } => "wrong_model",
            Self::MissingVendorExtension => "missing_vendor_extension",
            Self::MissingUrlBase => "missing_url_base",
            Self::MissingServiceList => "missing_service_list",
            Self::ServiceNotFound { .. } => "service_not_found",
        }
    }
}

/// A device that can be paired.
#[derive(Debug, Clone, PartialEq)]
pub struct PairingCandidate {
    pub id: String,
    pub name: String,
    pub protocol: Protocol,
    pub address: String,
    pub endpoint: ConnectionEndpoint,
    /// `X_yxcVersion` of extended devices.
    pub protocol_version: Option<String>,
    pub model_name: Option<String>,
    /// Absolute UPnP event subscription URLs from the standard service list.
    pub event_urls: Vec<String>,
}

impl PairingCandidate {
    /// Record in the shape the host stores for a paired device.
    #[must_use]
    pub fn to_pairing_record(&self) -> PairingRecord {
        let (service_url, control_url) = match self.protocol {
            Protocol::Extended => (Some(self.endpoint.control_path.clone()), None),
            Protocol::Legacy => (None, Some(self.endpoint.control_path.clone())),
        };

        PairingRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            data: PairingData {
                id: self.id.clone(),
                driver: self.protocol.driver_id(),
            },
            settings: PairingSettings {
                url_base: self.endpoint.url_base.clone(),
                service_url,
                control_url,
                zone: self.endpoint.zone.clone(),
                ip_address: self.address.clone(),
                event_urls: self.event_urls.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairingRecord {
    pub id: String,
    pub name: String,
    pub data: PairingData,
    pub settings: PairingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairingData {
    pub id: String,
    pub driver: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairingSettings {
    #[serde(rename = "urlBase")]
    pub url_base: String,
    #[serde(rename = "serviceUrl", skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(rename = "controlURL", skip_serializing_if = "Option::is_none")]
    pub control_url: Option<String>,
    pub zone: String,
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(rename = "eventUrls", skip_serializing_if = "Vec::is_empty")]
    pub event_urls: Vec<String>,
}

/// Strips the `uuid:` prefix and any `::urn:...` suffix of a UDN or USN.
#[must_use]
pub fn normalize_uuid(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("uuid:"))
        .map_or(raw, |_| &raw[5..]);
    raw.split("::").next().unwrap_or(raw).to_string()
}

/// Virtual interface prefixes to filter out during discovery.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
#[must_use]
pub fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}
