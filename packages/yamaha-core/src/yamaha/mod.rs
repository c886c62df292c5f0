//! Yamaha device protocols.
//!
//! - `legacy` - XML Remote Control protocol of AV receivers
//! - `extended` - JSON Extended Control protocol of MusicCast devices
//! - `traits` - protocol-neutral client traits
//! - `types` - state snapshots and endpoints shared by both clients
//! - `enums` - validated inputs, surround programs and zones
//! - `xml` - element tree used by the legacy client and discovery
//! - `transport` - client error taxonomy and URL helpers
//! - `discovery` - SSDP search and pairing

pub mod discovery;
pub mod enums;
pub mod extended;
pub mod legacy;
pub(crate) mod retry;
pub mod traits;
pub mod transport;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_fixtures;

use std::sync::Arc;

use reqwest::Client;

pub use enums::EnumRegistry;
pub use extended::ExtendedClient;
pub use legacy::LegacyClient;
pub use traits::{DeviceControl, DeviceStatus, PlaybackControl, ProtocolClient, ZoneControl};
pub use transport::{ClientError, ClientResult, ErrorKind};
pub use types::{
    ConnectionEndpoint, DeviceInfo, DeviceState, PlayInfo, PlaybackAction, Protocol, RepeatMode,
    SoundOption, SoundSettings,
};

/// Builds the client for `protocol`.
#[must_use]
pub fn connect(
    http: Client,
    protocol: Protocol,
    endpoint: &ConnectionEndpoint,
    max_volume: Option<u32>,
) -> Arc<dyn ProtocolClient> {
    match protocol {
        Protocol::Legacy => Arc::new(LegacyClient::new(http, endpoint)),
        Protocol::Extended => {
            Arc::new(ExtendedClient::new(http, endpoint).with_max_volume(max_volume))
        }
    }
}
