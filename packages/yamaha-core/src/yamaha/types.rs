//! Domain types shared by both protocol clients.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    EXTENDED_DEFAULT_ZONE, EXTENDED_SERVICE_PATH, LEGACY_CONTROL_PATH, LEGACY_DEFAULT_ZONE,
};

/// Which wire protocol a device speaks.
///
/// Serialized with the driver identifiers used in pairing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// XML Remote Control protocol of older AV receivers.
    #[serde(rename = "receiver")]
    Legacy,
    /// JSON Extended Control protocol of MusicCast devices.
    #[serde(rename = "musiccast")]
    Extended,
}

impl Protocol {
    #[must_use]
    pub fn driver_id(&self) -> &'static str {
        match self {
            Self::Legacy => "receiver",
            Self::Extended => "musiccast",
        }
    }

    #[must_use]
    pub fn default_zone(&self) -> &'static str {
        match self {
            Self::Legacy => LEGACY_DEFAULT_ZONE,
            Self::Extended => EXTENDED_DEFAULT_ZONE,
        }
    }

    /// Control path (legacy) or service path (extended) used when none is configured.
    #[must_use]
    pub fn default_control_path(&self) -> &'static str {
        match self {
            Self::Legacy => LEGACY_CONTROL_PATH,
            Self::Extended => EXTENDED_SERVICE_PATH,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.driver_id())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receiver" | "legacy" => Ok(Self::Legacy),
            "musiccast" | "extended" => Ok(Self::Extended),
            other => Err(format!("unknown protocol '{}'", other)),
        }
    }
}

/// Sound settings only legacy receivers report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SoundSettings {
    pub surround_straight: Option<bool>,
    pub surround_enhancer: Option<bool>,
    pub direct: Option<bool>,
    pub extra_bass: Option<bool>,
    pub adaptive_drc: Option<bool>,
}

/// Snapshot of a device's controllable state.
///
/// Every field is `None` when the device did not report it. Push events
/// produce sparse snapshots; [`merge`](Self::merge) folds them in without
/// treating absence as a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    pub power: Option<bool>,
    /// 0..100 percentile, whatever the wire encoding.
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    pub input: Option<String>,
    pub input_title: Option<String>,
    pub surround_program: Option<String>,
    /// Raw volume as reported by extended devices.
    pub volume_raw: Option<u32>,
    /// Device-specific raw volume ceiling (extended only).
    pub max_volume_raw: Option<u32>,
    pub subwoofer_trim: Option<String>,
    pub display_scale: Option<String>,
    pub sound: SoundSettings,
}

impl DeviceState {
    /// Overwrites fields that are present in `update`.
    pub fn merge(&mut self, update: &DeviceState) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(value) = src {
                *dst = Some(value.clone());
            }
        }

        take(&mut self.power, &update.power);
        take(&mut self.volume, &update.volume);
        take(&mut self.muted, &update.muted);
        take(&mut self.input, &update.input);
        take(&mut self.input_title, &update.input_title);
        take(&mut self.surround_program, &update.surround_program);
        take(&mut self.volume_raw, &update.volume_raw);
        take(&mut self.max_volume_raw, &update.max_volume_raw);
        take(&mut self.subwoofer_trim, &update.subwoofer_trim);
        take(&mut self.display_scale, &update.display_scale);
        take(&mut self.sound.surround_straight, &update.sound.surround_straight);
        take(&mut self.sound.surround_enhancer, &update.sound.surround_enhancer);
        take(&mut self.sound.direct, &update.sound.direct);
        take(&mut self.sound.extra_bass, &update.sound.extra_bass);
        take(&mut self.sound.adaptive_drc, &update.sound.adaptive_drc);
    }
}

/// Repeat mode of the current playback source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    /// Parses the wire value; unknown values are treated as off.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "one" => Self::One,
            "all" => Self::All,
            _ => Self::Off,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }
}

/// Now-playing information. Rebuilt from scratch on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayInfo {
    /// Legacy `Feature_Availability == Ready`; true for extended devices.
    pub available: bool,
    pub input: Option<String>,
    pub playing: bool,
    pub paused: bool,
    pub stopped: bool,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub play_time: Option<i64>,
    pub total_time: Option<i64>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<String>,
    pub album_art_url: Option<String>,
}

/// Where and how to reach a device.
///
/// Immutable after construction except for the zone, which the clients keep
/// behind their own lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEndpoint {
    pub url_base: String,
    /// Legacy control path or extended service path.
    pub control_path: String,
    pub zone: String,
    pub push_channel_name: Option<String>,
    pub push_channel_port: Option<u16>,
}

impl ConnectionEndpoint {
    /// Endpoint with the protocol's default path and zone.
    #[must_use]
    pub fn new(protocol: Protocol, url_base: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
            control_path: protocol.default_control_path().to_string(),
            zone: protocol.default_zone().to_string(),
            push_channel_name: None,
            push_channel_port: None,
        }
    }

    #[must_use]
    pub fn with_control_path(mut self, path: impl Into<String>) -> Self {
        self.control_path = path.into();
        self
    }

    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = zone.into();
        self
    }

    /// Registers for unicast events on `port` under `name`.
    #[must_use]
    pub fn with_push_channel(mut self, name: impl Into<String>, port: u16) -> Self {
        self.push_channel_name = Some(name.into());
        self.push_channel_port = Some(port);
        self
    }
}

/// Legacy sound toggles that map to a single PUT each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundOption {
    SurroundStraight,
    SurroundEnhancer,
    Direct,
    ExtraBass,
    AdaptiveDrc,
}

impl SoundOption {
    pub const ALL: [SoundOption; 5] = [
        Self::SurroundStraight,
        Self::SurroundEnhancer,
        Self::Direct,
        Self::ExtraBass,
        Self::AdaptiveDrc,
    ];

    /// Capability id this option is exposed under.
    #[must_use]
    pub fn capability(&self) -> &'static str {
        match self {
            Self::SurroundStraight => "surround_straight",
            Self::SurroundEnhancer => "surround_enhancer",
            Self::Direct => "sound_direct",
            Self::ExtraBass => "sound_extra_bass",
            Self::AdaptiveDrc => "sound_adaptive_drc",
        }
    }

    #[must_use]
    pub fn from_capability(capability: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.capability() == capability)
    }

    /// Current value of this option in a state snapshot.
    #[must_use]
    pub fn read(&self, sound: &SoundSettings) -> Option<bool> {
        match self {
            Self::SurroundStraight => sound.surround_straight,
            Self::SurroundEnhancer => sound.surround_enhancer,
            Self::Direct => sound.direct,
            Self::ExtraBass => sound.extra_bass,
            Self::AdaptiveDrc => sound.adaptive_drc,
        }
    }
}

/// Transport commands for the active playback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
}

/// Identity reported by an extended device.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub model_name: Option<String>,
    /// Network id that unicast events carry.
    pub device_id: Option<String>,
    pub system_id: Option<String>,
    pub system_version: Option<f64>,
    pub api_version: Option<f64>,
}
