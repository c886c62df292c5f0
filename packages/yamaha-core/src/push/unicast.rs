//! UDP listener for MusicCast unicast events.
//!
//! Devices send one JSON object per datagram to the port announced in
//! `X-AppPort`. Zone sections (`main`, `zone2`, ...) may carry inline values;
//! feature sections (`system`, `netusb`, ...) only carry `*_updated` flags.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use serde::Deserialize;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::event::{PushEvent, PushFlags, ZoneUpdate};
use super::registry::{DeviceRegistry, DispatchOutcome};
use super::{PushError, PushResult};
use crate::protocol_constants::MAX_UNICAST_DATAGRAM_SIZE;
use crate::yamaha::enums::EnumRegistry;
use crate::yamaha::types::DeviceState;

/// Section for one zone.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ZoneSection {
    pub power: Option<String>,
    pub input: Option<String>,
    pub volume: Option<u32>,
    pub mute: Option<bool>,
    pub status_updated: bool,
    pub signal_info_updated: bool,
}

/// Section for a non-zone feature (`system`, `tuner`, `netusb`, ...).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FeatureSection {
    pub status_updated: bool,
    pub play_info_updated: bool,
    pub preset_info_updated: bool,
    pub recent_info_updated: bool,
    pub play_time: Option<i64>,
}

impl FeatureSection {
    fn flags(&self) -> PushFlags {
        PushFlags {
            status_updated: self.status_updated,
            play_info_updated: self.play_info_updated,
            preset_info_updated: self.preset_info_updated,
            recent_info_updated: self.recent_info_updated,
            signal_info_updated: false,
        }
    }
}

/// One unicast datagram.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UnicastEvent {
    pub device_id: Option<String>,
    pub main: Option<ZoneSection>,
    pub zone2: Option<ZoneSection>,
    pub zone3: Option<ZoneSection>,
    pub zone4: Option<ZoneSection>,
    pub system: Option<FeatureSection>,
    pub tuner: Option<FeatureSection>,
    pub netusb: Option<FeatureSection>,
    pub cd: Option<FeatureSection>,
    pub dist: Option<FeatureSection>,
    pub clock: Option<FeatureSection>,
}

impl UnicastEvent {
    fn zones(&self) -> impl Iterator<Item = (&'static str, &ZoneSection)> {
        [
            ("main", &self.main),
            ("zone2", &self.zone2),
            ("zone3", &self.zone3),
            ("zone4", &self.zone4),
        ]
        .into_iter()
        .filter_map(|(name, section)| section.as_ref().map(|s| (name, s)))
    }

    fn features(&self) -> impl Iterator<Item = &FeatureSection> {
        [
            &self.system,
            &self.tuner,
            &self.netusb,
            &self.cd,
            &self.dist,
            &self.clock,
        ]
        .into_iter()
        .flatten()
    }

    /// Normalizes into a [`PushEvent`]; fails without a `device_id`.
    pub fn into_push_event(self, sender: Option<SocketAddr>) -> PushResult<PushEvent> {
        let mut flags = PushFlags::default();
        let mut zone_updates = Vec::new();

        for (zone, section) in self.zones() {
            flags.merge(PushFlags {
                status_updated: section.status_updated,
                signal_info_updated: section.signal_info_updated,
                ..Default::default()
            });
            zone_updates.push(ZoneUpdate {
                zone: zone.to_string(),
                state: DeviceState {
                    power: section.power.as_deref().map(|p| p == "on"),
                    input: section
                        .input
                        .clone()
                        .filter(|i| EnumRegistry::EXTENDED.is_valid_input(i)),
                    volume_raw: section.volume,
                    muted: section.mute,
                    ..Default::default()
                },
            });
        }
        for feature in self.features() {
            flags.merge(feature.flags());
        }

        let device_id = self
            .device_id
            .filter(|id| !id.is_empty())
            .ok_or(PushError::MissingDeviceId)?;

        Ok(PushEvent {
            device_id,
            sender,
            zone_updates,
            flags,
            properties: Vec::new(),
        })
    }
}

/// Decodes one datagram.
pub fn decode_datagram(payload: &[u8], sender: Option<SocketAddr>) -> PushResult<PushEvent> {
    let event: UnicastEvent = serde_json::from_slice(payload)?;
    event.into_push_event(sender)
}

/// Decodes a datagram and forwards it through `registry`.
///
/// Never fails; bad payloads are logged and dropped.
pub fn handle_datagram(registry: &DeviceRegistry, payload: &[u8], sender: SocketAddr) {
    match decode_datagram(payload, Some(sender)) {
        Ok(event) => {
            let network_id = event.device_id.clone();
            match registry.dispatch_network(&network_id, event) {
                DispatchOutcome::Delivered => {
                    log::trace!("[Unicast] Event from {} for {}", sender, network_id);
                }
                DispatchOutcome::Unknown => {
                    log::debug!("[Unicast] Ignoring event for unknown device {}", network_id);
                }
                other => {
                    log::debug!("[Unicast] Event for {} not delivered: {:?}", network_id, other);
                }
            }
        }
        Err(e) => {
            log::warn!("[Unicast] Dropping datagram from {}: {}", sender, e);
        }
    }
}

/// UDP socket that receives unicast events for every registered device.
pub struct UnicastListener {
    socket: UdpSocket,
    registry: Arc<DeviceRegistry>,
}

impl UnicastListener {
    /// Binds `0.0.0.0:port`; port 0 picks an ephemeral port.
    pub fn bind(port: u16, registry: Arc<DeviceRegistry>) -> PushResult<Self> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(PushError::Bind)?;
        if let Err(e) = socket.set_reuse_address(true) {
            log::warn!("[Unicast] Failed to set SO_REUSEADDR: {}", e);
        }
        socket.set_nonblocking(true).map_err(PushError::Bind)?;
        socket.bind(&addr.into()).map_err(PushError::Bind)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = UdpSocket::from_std(std_socket).map_err(PushError::Bind)?;
        Ok(Self { socket, registry })
    }

    pub fn local_addr(&self) -> PushResult<SocketAddr> {
        self.socket.local_addr().map_err(PushError::Bind)
    }

    /// Receives until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut buf = vec![0u8; MAX_UNICAST_DATAGRAM_SIZE];
        log::info!(
            "[Unicast] Listening on {}",
            self.socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_default()
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, sender)) => handle_datagram(&self.registry, &buf[..len], sender),
                    Err(e) => log::warn!("[Unicast] Receive error: {}", e),
                },
            }
        }

        log::info!("[Unicast] Listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yamaha::test_fixtures::{UNICAST_PLAY_INFO_EVENT, UNICAST_ZONE_EVENT};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn zone_event_carries_inline_values() {
        let event = decode_datagram(UNICAST_ZONE_EVENT.as_bytes(), None).unwrap();
        assert_eq!(event.device_id, "00A0DED3A1B2");
        assert!(event.flags.status_updated);
        assert!(!event.flags.play_info_updated);

        let main = event.zone_update("main").unwrap();
        assert_eq!(main.power, Some(true));
        assert_eq!(main.input.as_deref(), Some("spotify"));
        assert_eq!(main.volume_raw, Some(40));
        assert_eq!(main.muted, Some(false));
        assert_eq!(main.volume, None);
    }

    #[test]
    fn feature_event_only_sets_flags() {
        let event = decode_datagram(UNICAST_PLAY_INFO_EVENT.as_bytes(), None).unwrap();
        assert!(event.flags.play_info_updated);
        assert!(event.zone_updates.is_empty());
    }

    #[test]
    fn event_without_input_is_sparse() {
        let event = decode_datagram(
            br#"{"device_id":"x","zone2":{"volume":12}}"#,
            None,
        )
        .unwrap();
        let zone2 = event.zone_update("zone2").unwrap();
        assert_eq!(zone2.input, None);
        assert_eq!(zone2.power, None);
        assert_eq!(zone2.volume_raw, Some(12));
    }

    #[test]
    fn unknown_inline_input_is_dropped() {
        let event = decode_datagram(
            br#"{"device_id":"x","main":{"input":"laserdisc","mute":true}}"#,
            None,
        )
        .unwrap();
        let main = event.zone_update("main").unwrap();
        assert_eq!(main.input, None);
        assert_eq!(main.muted, Some(true));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(matches!(
            decode_datagram(b"not json", None),
            Err(PushError::Json(_))
        ));
        assert!(matches!(
            decode_datagram(br#"{"main":{"power":"on"}}"#, None),
            Err(PushError::MissingDeviceId)
        ));
    }

    #[tokio::test]
    async fn listener_survives_bad_input_and_dispatches() {
        let registry = Arc::new(DeviceRegistry::new());
        let (tx, mut rx) = mpsc::channel(4);
        registry.register("kitchen", tx);
        registry.alias("00A0DED3A1B2", "kitchen");

        let listener = UnicastListener::bind(0, Arc::clone(&registry)).unwrap();
        let port = listener.local_addr().unwrap().port();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listener.run(cancel.clone()));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = ("127.0.0.1", port);
        sender.send_to(b"{{garbage", target).await.unwrap();
        sender
            .send_to(br#"{"device_id":"someone-else","main":{}}"#, target)
            .await
            .unwrap();
        sender
            .send_to(UNICAST_ZONE_EVENT.as_bytes(), target)
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.device_id, "00A0DED3A1B2");
        assert!(event.sender.is_some());

        cancel.cancel();
        task.await.unwrap();
    }
}
