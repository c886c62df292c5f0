//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the Yamaha control protocols, UPnP and GENA.
//! Changing them breaks compatibility with real receivers.

// ─────────────────────────────────────────────────────────────────────────────
// Legacy Remote Control (XML over HTTP POST)
// ─────────────────────────────────────────────────────────────────────────────

/// Default control path appended to the device URL base.
pub const LEGACY_CONTROL_PATH: &str = "/YamahaRemoteControl/ctrl";

/// Service type advertised in the device description for the legacy protocol.
pub const LEGACY_SERVICE_TYPE: &str = "urn:schemas-yamaha-com:service:X_YamahaRemoteControl:1";

/// Zone used when no zone has been configured.
pub const LEGACY_DEFAULT_ZONE: &str = "Main_Zone";

/// Root element of every legacy request and response document.
pub const LEGACY_ROOT_ELEMENT: &str = "YAMAHA_AV";

/// Raw volume units covering the full 0..100 percentile range.
pub const LEGACY_VOLUME_SPAN: i32 = 970;

/// Raw volume offset (the device minimum is -805, i.e. -80.5 dB).
pub const LEGACY_VOLUME_OFFSET: i32 = 805;

/// Raw volume step accepted by the device (0.5 dB).
pub const LEGACY_VOLUME_STEP: i32 = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Extended Control (JSON over HTTP GET)
// ─────────────────────────────────────────────────────────────────────────────

/// Default service path appended to the device URL base.
pub const EXTENDED_SERVICE_PATH: &str = "/YamahaExtendedControl/v1/";

/// Service type advertised in the device description for the extended protocol.
pub const EXTENDED_SERVICE_TYPE: &str = "urn:schemas-yamaha-com:service:X_YamahaExtendedControl:1";

/// Zone used when no zone has been configured.
pub const EXTENDED_DEFAULT_ZONE: &str = "main";

/// Prefix of the `X-AppName` header that registers a unicast event listener.
pub const EXTENDED_APP_NAME_PREFIX: &str = "MusicCast/";

/// Maximum size of a single unicast event datagram.
pub const MAX_UNICAST_DATAGRAM_SIZE: usize = 8192;

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

/// SSDP search target. Both protocol families answer as media renderers.
pub const SSDP_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";

/// `modelDescription` value identifying an extended (MusicCast) device.
pub const MODEL_DESCRIPTION_EXTENDED: &str = "MusicCast";

/// `modelDescription` value identifying a legacy AV receiver.
pub const MODEL_DESCRIPTION_LEGACY: &str = "AV Receiver";

// ─────────────────────────────────────────────────────────────────────────────
// UPnP eventing (GENA)
// ─────────────────────────────────────────────────────────────────────────────

/// Subscription timeout requested from the device (seconds).
pub const UPNP_SUBSCRIPTION_TIMEOUT_SECS: u64 = 300;

/// Renewal happens this many seconds before the granted timeout expires.
pub const UPNP_RENEWAL_MARGIN_SECS: u64 = 30;

/// Lower bound for the renewal delay (seconds).
pub const UPNP_MIN_RENEWAL_SECS: u64 = 30;

/// Maximum accepted NOTIFY body size (bytes).
pub const MAX_NOTIFY_BODY_SIZE: usize = 256 * 1024;

/// Path the NOTIFY callback is served on.
pub const UPNP_CALLBACK_PATH: &str = "/upnp/event";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for device HTTP requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation
// ─────────────────────────────────────────────────────────────────────────────

/// Lower bound for the configured polling interval (milliseconds).
pub const MINIMUM_UPDATE_INTERVAL_MS: u64 = 5000;

/// Polling interval while a device is unavailable (milliseconds).
pub const UNAVAILABLE_UPDATE_INTERVAL_MS: u64 = 60_000;

/// Polling interval used when the host has no setting for a device (seconds).
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 10;

/// Capacity of each device's push and command inboxes.
pub const DEVICE_INBOX_CAPACITY: usize = 32;

/// Current capability schema version written to device settings.
pub const CAPABILITY_SCHEMA_VERSION: u64 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used in logs and push channel registration.
pub const APP_NAME: &str = "Yamaha Bridge";

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "yamaha-bridge";
