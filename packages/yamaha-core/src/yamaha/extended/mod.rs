//! Client for the JSON Extended Control protocol (MusicCast).
//!
//! Requests are plain GETs to `<urlBase>/<servicePath>/<zone>/<action>`.
//! When a push channel is configured, every request carries `X-AppName` and
//! `X-AppPort` so the device sends unicast events to this process.

mod response;

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::protocol_constants::{
    EXTENDED_APP_NAME_PREFIX, EXTENDED_DEFAULT_ZONE, HTTP_TIMEOUT_SECS,
};
use crate::yamaha::enums::EnumRegistry;
use crate::yamaha::traits::{DeviceControl, DeviceStatus, PlaybackControl, ZoneControl};
use crate::yamaha::transport::{join_url, ClientError, ClientResult};
use crate::yamaha::types::{
    ConnectionEndpoint, DeviceInfo, DeviceState, PlayInfo, PlaybackAction, Protocol, RepeatMode,
};

use response::{
    decode, Ack, FeaturesResponse, NameTextResponse, PlayInfoResponse, StatusResponse,
};

/// Zone that serves playback for `input`.
///
/// Network sources play through `netusb`, the disc player through `cd`,
/// everything else through `main`.
#[must_use]
pub fn playback_zone_for_input(input: &str) -> &'static str {
    match input {
        "server" | "net_radio" | "pandora" | "spotify" | "airplay" | "napster" | "juke"
        | "qobuz" | "tidal" | "deezer" | "mc_link" | "bluetooth" => "netusb",
        "cd" => "cd",
        _ => "main",
    }
}

/// Converts a raw volume to a 0..100 percentile of `max_volume`.
#[must_use]
pub fn raw_to_percentile(raw: u32, max_volume: u32) -> Option<f64> {
    if max_volume == 0 {
        return None;
    }
    let percentile = (f64::from(raw) / (f64::from(max_volume) / 100.0)).round();
    Some(percentile.clamp(0.0, 100.0))
}

/// Converts a 0..100 percentile to a raw volume of `max_volume`.
#[must_use]
pub fn percentile_to_raw(percentile: f64, max_volume: u32) -> u32 {
    let percentile = if percentile.is_finite() {
        percentile.clamp(0.0, 100.0)
    } else {
        0.0
    };
    (percentile / 100.0 * f64::from(max_volume)).round() as u32
}

/// Extended control client for one device zone.
pub struct ExtendedClient {
    http: Client,
    url_base: String,
    service_path: String,
    zone: RwLock<String>,
    push_channel: Option<(String, u16)>,
    max_volume: RwLock<Option<u32>>,
    selected_input: RwLock<Option<String>>,
    registry: EnumRegistry,
}

impl ExtendedClient {
    #[must_use]
    pub fn new(http: Client, endpoint: &ConnectionEndpoint) -> Self {
        let zone = if endpoint.zone.is_empty() {
            EXTENDED_DEFAULT_ZONE.to_string()
        } else {
            endpoint.zone.clone()
        };
        let push_channel = match (&endpoint.push_channel_name, endpoint.push_channel_port) {
            (Some(name), Some(port)) if !name.is_empty() => Some((name.clone(), port)),
            _ => None,
        };

        Self {
            http,
            url_base: endpoint.url_base.trim_matches('/').to_string(),
            service_path: endpoint.control_path.trim_matches('/').to_string(),
            zone: RwLock::new(zone),
            push_channel,
            max_volume: RwLock::new(None),
            selected_input: RwLock::new(None),
            registry: EnumRegistry::EXTENDED,
        }
    }

    /// Seeds the raw volume ceiling, e.g. from persisted settings.
    #[must_use]
    pub fn with_max_volume(self, max_volume: Option<u32>) -> Self {
        *self.max_volume.write() = max_volume.filter(|m| *m > 0);
        self
    }

    /// Raw volume ceiling last reported by the device.
    #[must_use]
    pub fn max_volume(&self) -> Option<u32> {
        *self.max_volume.read()
    }

    #[must_use]
    pub fn action_url(&self, zone: &str, action: &str) -> String {
        join_url(&self.url_base, &[&self.service_path, zone, action])
    }

    async fn request<T: DeserializeOwned>(
        &self,
        zone: &str,
        action: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let url = self.action_url(zone, action);
        let mut req = self
            .http
            .get(&url)
            .query(query)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS));

        if let Some((name, port)) = &self.push_channel {
            req = req
                .header("X-AppName", format!("{}{}", EXTENDED_APP_NAME_PREFIX, name))
                .header("X-AppPort", port.to_string());
        }

        log::debug!("[Extended] GET {} {:?}", url, query);

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let value: Value = res.json().await?;
        decode(value).map_err(|e| {
            log::warn!("[Extended] {} {} failed: {}", zone, action, e);
            e
        })
    }

    async fn command(&self, zone: &str, action: &str, query: &[(&str, String)]) -> ClientResult<()> {
        self.request::<Ack>(zone, action, query).await.map(|_| ())
    }

    /// Records a reported ceiling, replacing the cached one when it differs.
    fn observe_max_volume(&self, reported: Option<u32>) -> Option<u32> {
        let mut cached = self.max_volume.write();
        if let Some(max) = reported.filter(|m| *m > 0) {
            if *cached != Some(max) {
                log::debug!("[Extended] max_volume {:?} -> {}", *cached, max);
                *cached = Some(max);
            }
        }
        *cached
    }

    async fn require_max_volume(&self) -> ClientResult<u32> {
        if let Some(max) = self.max_volume() {
            return Ok(max);
        }
        self.get_state()
            .await?
            .max_volume_raw
            .ok_or(ClientError::Unsupported("volume conversion without max_volume"))
    }

    /// Zone serving playback for the selected input; fetches state when unknown.
    pub async fn current_playback_zone(&self) -> ClientResult<&'static str> {
        let cached = self.selected_input.read().clone();
        let input = match cached {
            Some(input) => Some(input),
            None => {
                self.get_state().await?;
                self.selected_input.read().clone()
            }
        };
        Ok(input.as_deref().map_or("main", playback_zone_for_input))
    }

    pub async fn get_device_info(&self) -> ClientResult<DeviceInfo> {
        let info: DeviceInfo = self.request("system", "getDeviceInfo", &[]).await?;
        log::debug!(
            "[Extended] Device info: model={:?} system_version={:?} api_version={:?}",
            info.model_name,
            info.system_version,
            info.api_version
        );
        Ok(info)
    }

    /// Zone ids the device supports.
    pub async fn get_features(&self) -> ClientResult<Vec<String>> {
        let features: FeaturesResponse = self.request("system", "getFeatures", &[]).await?;
        Ok(features.zone.into_iter().map(|z| z.id).collect())
    }

    /// Name set on the device (`system/getNameText?id=main`).
    pub async fn get_name(&self) -> ClientResult<Option<String>> {
        let name: NameTextResponse = self
            .request("system", "getNameText", &[("id", "main".to_string())])
            .await?;
        Ok(name.text.filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl DeviceStatus for ExtendedClient {
    /// Reads `main/getStatus`, like the legacy client reads `Main_Zone`.
    async fn get_state(&self) -> ClientResult<DeviceState> {
        let status: StatusResponse = self
            .request(EXTENDED_DEFAULT_ZONE, "getStatus", &[])
            .await?;
        let max_volume = self.observe_max_volume(status.max_volume);

        if let Some(input) = &status.input {
            *self.selected_input.write() = Some(input.clone());
        }

        Ok(DeviceState {
            power: status.power.as_deref().map(|p| p == "on"),
            volume: status
                .volume
                .zip(max_volume)
                .and_then(|(raw, max)| raw_to_percentile(raw, max)),
            muted: status.mute,
            input: status
                .input
                .filter(|i| self.registry.is_valid_input(i)),
            surround_program: status
                .sound_program
                .filter(|p| self.registry.is_valid_surround_program(p)),
            volume_raw: status.volume,
            max_volume_raw: max_volume,
            ..Default::default()
        })
    }

    async fn get_play_info(&self) -> ClientResult<PlayInfo> {
        let zone = self.current_playback_zone().await?;
        let res: PlayInfoResponse = self.request(zone, "getPlayInfo", &[]).await?;
        let playback = res.playback.as_deref().unwrap_or_default();
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        Ok(PlayInfo {
            available: true,
            input: res.input,
            playing: playback == "play",
            paused: playback == "pause",
            stopped: playback == "stop",
            shuffle: res.shuffle.as_deref().is_some_and(|s| s != "off"),
            repeat: res
                .repeat
                .as_deref()
                .map(RepeatMode::from_wire)
                .unwrap_or_default(),
            play_time: res.play_time,
            total_time: res.total_time,
            artist: non_empty(res.artist),
            album: non_empty(res.album),
            track: non_empty(res.track),
            album_art_url: non_empty(res.albumart_url)
                .map(|path| format!("{}{}", self.url_base, path)),
        })
    }
}

#[async_trait]
impl DeviceControl for ExtendedClient {
    async fn set_power(&self, on: bool) -> ClientResult<()> {
        let power = if on { "on" } else { "standby" };
        self.command(&self.zone(), "setPower", &[("power", power.to_string())])
            .await
    }

    async fn set_volume(&self, percentile: f64) -> ClientResult<()> {
        let max = self.require_max_volume().await?;
        let raw = percentile_to_raw(percentile, max);
        self.command(&self.zone(), "setVolume", &[("volume", raw.to_string())])
            .await
    }

    async fn set_muted(&self, muted: bool) -> ClientResult<()> {
        self.command(&self.zone(), "setMute", &[("enable", muted.to_string())])
            .await
    }

    async fn set_input(&self, input: &str) -> ClientResult<()> {
        self.registry.validate_input(input)?;
        self.command(&self.zone(), "setInput", &[("input", input.to_string())])
            .await?;
        *self.selected_input.write() = Some(input.to_string());
        Ok(())
    }

    async fn set_surround_program(&self, program: &str) -> ClientResult<()> {
        self.registry.validate_surround_program(program)?;
        self.command(
            &self.zone(),
            "setSoundProgram",
            &[("program", program.to_string())],
        )
        .await
    }

    async fn volume_step(&self, up: bool, step: u32) -> ClientResult<()> {
        let direction = if up { "up" } else { "down" };
        self.command(
            &self.zone(),
            "setVolume",
            &[("volume", direction.to_string()), ("step", step.to_string())],
        )
        .await
    }
}

#[async_trait]
impl PlaybackControl for ExtendedClient {
    async fn playback(&self, action: PlaybackAction) -> ClientResult<()> {
        let value = match action {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
            PlaybackAction::Stop => "stop",
            PlaybackAction::Next => "next",
            PlaybackAction::Previous => "previous",
        };
        let zone = self.current_playback_zone().await?;
        self.command(zone, "setPlayback", &[("playback", value.to_string())])
            .await
    }
}

#[async_trait]
impl ZoneControl for ExtendedClient {
    fn protocol(&self) -> Protocol {
        Protocol::Extended
    }

    fn zone(&self) -> String {
        self.zone.read().clone()
    }

    async fn set_zone(&self, zone: &str) -> ClientResult<()> {
        let zones = self.get_features().await?;
        if !zones.iter().any(|z| z == zone) {
            return Err(ClientError::InvalidZone(zone.to_string()));
        }
        *self.zone.write() = zone.to_string();
        log::info!("[Extended] Control zone set to {}", zone);
        Ok(())
    }

    async fn device_name(&self) -> ClientResult<Option<String>> {
        self.get_name().await
    }

    async fn network_id(&self) -> ClientResult<Option<String>> {
        Ok(self.get_device_info().await?.device_id)
    }
}
