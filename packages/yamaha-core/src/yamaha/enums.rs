//! Validated value sets for inputs, surround programs and zones.
//!
//! Each protocol dialect has its own vocabulary. The legacy protocol uses
//! display-style names (`NET RADIO`, `Hall in Munich`), the extended protocol
//! uses lowercase API identifiers (`net_radio`, `munich`).

use super::transport::{ClientError, ClientResult};
use super::types::Protocol;

/// Inputs accepted by `Input_Sel` on legacy receivers.
pub const LEGACY_INPUTS: &[&str] = &[
    "HDMI1", "HDMI2", "HDMI3", "HDMI4", "HDMI5", "HDMI6", "HDMI7", "HDMI8", "AV1", "AV2", "AV3",
    "AV4", "AV5", "AV6", "AUDIO1", "AUDIO2", "AUDIO3", "TUNER", "V-AUX", "SERVER", "NET RADIO",
    "USB", "Spotify", "AirPlay",
];

/// DSP programs accepted by `Sound_Program` on legacy receivers.
pub const LEGACY_SURROUND_PROGRAMS: &[&str] = &[
    "Action Game",
    "Roleplaying Game",
    "Music Video",
    "Standard",
    "Spectacle",
    "Sci-Fi",
    "Adventure",
    "Drama",
    "Hall in Munich",
    "Hall in Vienna",
    "Chamber",
    "Cellar Club",
    "Church in Royaumont",
    "The Roxy Theatre",
    "The Bottom Line",
    "Sports",
    "Enhanced",
    "Mono Movie",
    "2ch Stereo",
    "5ch Stereo",
    "7ch Stereo",
    "9ch Stereo",
    "Surround Decoder",
];

/// Controllable zones on legacy receivers.
pub const LEGACY_ZONES: &[&str] = &["Main_Zone", "Zone_2", "Zone_3", "Zone_4"];

/// Input identifiers of the extended control API.
pub const EXTENDED_INPUTS: &[&str] = &[
    "cd", "tuner", "multi_ch", "phono", "hdmi1", "hdmi2", "hdmi3", "hdmi4", "hdmi5", "hdmi6",
    "hdmi7", "hdmi8", "hdmi", "av1", "av2", "av3", "av4", "av5", "av6", "av7", "v_aux", "aux1",
    "aux2", "aux", "audio1", "audio2", "audio3", "audio4", "audio_cd", "audio", "optical1",
    "optical2", "optical", "coaxial1", "coaxial2", "coaxial", "digital1", "digital2", "digital",
    "line1", "line2", "line3", "line_cd", "analog", "tv", "bd_dvd", "usb_dac", "usb",
    "bluetooth", "server", "net_radio", "rhapsody", "napster", "pandora", "siriusxm", "spotify",
    "juke", "airplay", "radiko", "qobuz", "tidal", "deezer", "mc_link", "main_sync", "none",
];

/// Sound program identifiers of the extended control API.
pub const EXTENDED_SOUND_PROGRAMS: &[&str] = &[
    "munich_a",
    "munich_b",
    "munich",
    "frankfurt",
    "stuttgart",
    "vienna",
    "amsterdam",
    "usa_a",
    "usa_b",
    "tokyo",
    "freiburg",
    "royaumont",
    "chamber",
    "concert",
    "village_gate",
    "village_vanguard",
    "warehouse_loft",
    "cellar_club",
    "jazz_club",
    "roxy_theatre",
    "bottom_line",
    "arena",
    "sports",
    "action_game",
    "roleplaying_game",
    "game",
    "music_video",
    "music",
    "recital_opera",
    "pavilion",
    "disco",
    "standard",
    "spectacle",
    "sci-fi",
    "adventure",
    "drama",
    "talk_show",
    "tv_program",
    "mono_movie",
    "movie",
    "enhanced",
    "2ch_stereo",
    "5ch_stereo",
    "7ch_stereo",
    "9ch_stereo",
    "11ch_stereo",
    "stereo",
    "surr_decoder",
    "my_surround",
    "target",
    "straight",
    "off",
];

/// Zone identifiers of the extended control API.
///
/// Devices only support a subset; `setZone` checks against the features
/// the device reports.
pub const EXTENDED_ZONES: &[&str] = &["main", "zone2", "zone3", "zone4"];

/// Vocabulary of one protocol dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumRegistry {
    inputs: &'static [&'static str],
    surround_programs: &'static [&'static str],
    zones: &'static [&'static str],
}

impl EnumRegistry {
    pub const LEGACY: Self = Self {
        inputs: LEGACY_INPUTS,
        surround_programs: LEGACY_SURROUND_PROGRAMS,
        zones: LEGACY_ZONES,
    };

    pub const EXTENDED: Self = Self {
        inputs: EXTENDED_INPUTS,
        surround_programs: EXTENDED_SOUND_PROGRAMS,
        zones: EXTENDED_ZONES,
    };

    #[must_use]
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Legacy => Self::LEGACY,
            Protocol::Extended => Self::EXTENDED,
        }
    }

    #[must_use]
    pub fn inputs(&self) -> &'static [&'static str] {
        self.inputs
    }

    #[must_use]
    pub fn surround_programs(&self) -> &'static [&'static str] {
        self.surround_programs
    }

    #[must_use]
    pub fn zones(&self) -> &'static [&'static str] {
        self.zones
    }

    #[must_use]
    pub fn is_valid_input(&self, input: &str) -> bool {
        self.inputs.contains(&input)
    }

    #[must_use]
    pub fn is_valid_surround_program(&self, program: &str) -> bool {
        self.surround_programs.contains(&program)
    }

    #[must_use]
    pub fn is_valid_zone(&self, zone: &str) -> bool {
        self.zones.contains(&zone)
    }

    pub fn validate_input(&self, input: &str) -> ClientResult<()> {
        if self.is_valid_input(input) {
            Ok(())
        } else {
            Err(ClientError::InvalidInput(input.to_string()))
        }
    }

    pub fn validate_surround_program(&self, program: &str) -> ClientResult<()> {
        if self.is_valid_surround_program(program) {
            Ok(())
        } else {
            Err(ClientError::InvalidSurroundProgram(program.to_string()))
        }
    }

    pub fn validate_zone(&self, zone: &str) -> ClientResult<()> {
        if self.is_valid_zone(zone) {
            Ok(())
        } else {
            Err(ClientError::InvalidZone(zone.to_string()))
        }
    }
}
