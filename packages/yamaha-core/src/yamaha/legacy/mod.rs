//! Client for the legacy XML Remote Control protocol.
//!
//! Writes are PUT envelopes to the configured zone; state reads always go to
//! `Main_Zone`. Playback commands and play info are addressed to the zone of
//! the currently selected input (`NET RADIO` plays through the `NET_RADIO`
//! zone, `Spotify` through `Spotify`, ...).

pub mod envelope;
pub mod transform;
pub mod volume;

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;

use crate::protocol_constants::{HTTP_TIMEOUT_SECS, LEGACY_DEFAULT_ZONE};
use crate::yamaha::enums::EnumRegistry;
use crate::yamaha::traits::{DeviceControl, DeviceStatus, PlaybackControl, ZoneControl};
use crate::yamaha::transport::{join_url, ClientError, ClientResult};
use crate::yamaha::types::{
    ConnectionEndpoint, DeviceState, PlayInfo, PlaybackAction, Protocol, SoundOption,
};

use envelope::{Command, EnvelopeBuilder};
use transform::{transform_basic_status, transform_network_name, transform_play_info};
use volume::percentile_to_decibel;

/// Source zones that answer `Play_Info` requests.
const PLAY_INFO_ZONES: &[&str] = &[
    "USB",
    "iPod_USB",
    "Spotify",
    "NET_RADIO",
    "SERVER",
    "Juke",
    "Tuner",
    "AirPlay",
    "Deezer",
    "MusicCast Link",
];

/// Path of the unit description served by legacy receivers.
pub const UNIT_DESCRIPTION_PATH: &str = "/YamahaRemoteControl/desc.xml";

/// Returns the zone that controls playback for `input`.
///
/// Wired inputs (HDMI, AV, AUDIO, V-AUX) play through `configured_zone`;
/// network and tuner sources have zones of their own.
pub fn zone_for_input(input: &str, configured_zone: &str) -> ClientResult<String> {
    let zone = match input {
        "HDMI1" | "HDMI2" | "HDMI3" | "HDMI4" | "HDMI5" | "HDMI6" | "HDMI7" | "HDMI8" | "AV1"
        | "AV2" | "AV3" | "AV4" | "AV5" | "AV6" | "AUDIO1" | "AUDIO2" | "AUDIO3" | "V-AUX" => {
            configured_zone
        }
        "TUNER" => "Tuner",
        "AirPlay" => "AirPlay",
        "Spotify" => "Spotify",
        "Deezer" => "Deezer",
        "IPOD_USB" | "iPod_USB" => "iPod_USB",
        "USB" => "USB",
        "NET RADIO" | "NET_RADIO" => "NET_RADIO",
        "SERVER" => "SERVER",
        "MusicCast Link" => "MusicCast Link",
        other => return Err(ClientError::UnknownZoneMapping(other.to_string())),
    };
    Ok(zone.to_string())
}

/// Returns true if `zone` answers `Play_Info` requests.
#[must_use]
pub fn has_play_info(zone: &str) -> bool {
    PLAY_INFO_ZONES.contains(&zone)
}

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}

/// Legacy Remote Control client for one receiver zone.
pub struct LegacyClient {
    http: Client,
    url_base: String,
    control_url: String,
    zone: RwLock<String>,
    selected_input: RwLock<Option<String>>,
    registry: EnumRegistry,
}

impl LegacyClient {
    #[must_use]
    pub fn new(http: Client, endpoint: &ConnectionEndpoint) -> Self {
        let url_base = endpoint.url_base.trim_end_matches('/').to_string();
        let control_url = join_url(&url_base, &[&endpoint.control_path]);
        let zone = if endpoint.zone.is_empty() {
            LEGACY_DEFAULT_ZONE.to_string()
        } else {
            endpoint.zone.clone()
        };

        Self {
            http,
            url_base,
            control_url,
            zone: RwLock::new(zone),
            selected_input: RwLock::new(None),
            registry: EnumRegistry::LEGACY,
        }
    }

    #[must_use]
    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    /// Input cached by the last successful [`get_state`](DeviceStatus::get_state).
    #[must_use]
    pub fn selected_input(&self) -> Option<String> {
        self.selected_input.read().clone()
    }

    async fn put(&self, fragment: String) -> ClientResult<()> {
        let zone = self.zone();
        EnvelopeBuilder::new(&self.http, &self.control_url)
            .put()
            .zone(&zone)
            .fragment(fragment)
            .send()
            .await?;
        Ok(())
    }

    async fn request(&self, command: Command, zone: &str, fragment: &str) -> ClientResult<String> {
        envelope::send_envelope(&self.http, &self.control_url, command, zone, fragment).await
    }

    /// Selects a line of the currently displayed list (`Line_<n>`).
    pub async fn set_line(&self, line: u8) -> ClientResult<()> {
        self.put(format!(
            "<List_Control><Direct_Sel>Line_{}</Direct_Sel></List_Control>",
            line
        ))
        .await
    }

    /// Zone that controls playback for the selected input.
    ///
    /// Fetches state first when no input is cached yet.
    pub async fn current_zone(&self) -> ClientResult<String> {
        let cached = self.selected_input();
        let input = match cached {
            Some(input) => input,
            None => self
                .get_state()
                .await?
                .input
                .ok_or(ClientError::UnknownZoneMapping(String::new()))?,
        };
        zone_for_input(&input, &self.zone())
    }

    /// Network name set on the receiver (`System` → `Misc.Network.Network_Name`).
    pub async fn get_network_name(&self) -> ClientResult<Option<String>> {
        let xml = self
            .request(
                Command::Get,
                "System",
                "<Misc><Network><Network_Name>GetParam</Network_Name></Network></Misc>",
            )
            .await?;
        transform_network_name(&xml)
    }

    /// Model name from the unit description document, if the device serves one.
    pub async fn get_unit_name(&self) -> ClientResult<Option<String>> {
        let url = join_url(&self.url_base, &[UNIT_DESCRIPTION_PATH]);
        let res = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await?;
        if !res.status().is_success() {
            return Ok(None);
        }
        Ok(transform::transform_unit_name(&res.text().await?))
    }
}

#[async_trait]
impl DeviceStatus for LegacyClient {
    async fn get_state(&self) -> ClientResult<DeviceState> {
        let xml = self
            .request(
                Command::Get,
                LEGACY_DEFAULT_ZONE,
                "<Basic_Status>GetParam</Basic_Status>",
            )
            .await?;
        let state = transform_basic_status(&xml, LEGACY_DEFAULT_ZONE)?;
        if let Some(input) = &state.input {
            *self.selected_input.write() = Some(input.clone());
        }
        Ok(state)
    }

    async fn get_play_info(&self) -> ClientResult<PlayInfo> {
        let zone = self.current_zone().await?;
        if !has_play_info(&zone) {
            log::trace!("[Legacy] Zone {} has no play info", zone);
            return Ok(PlayInfo::default());
        }
        let xml = self
            .request(Command::Get, &zone, "<Play_Info>GetParam</Play_Info>")
            .await?;
        transform_play_info(&xml, &zone, &self.url_base)
    }
}

#[async_trait]
impl DeviceControl for LegacyClient {
    async fn set_power(&self, on: bool) -> ClientResult<()> {
        let state = if on { "On" } else { "Standby" };
        self.put(format!(
            "<Power_Control><Power>{}</Power></Power_Control>",
            state
        ))
        .await
    }

    async fn set_volume(&self, percentile: f64) -> ClientResult<()> {
        let decibel = percentile_to_decibel(percentile);
        self.put(format!(
            "<Volume><Lvl><Val>{}</Val><Exp>1</Exp><Unit>dB</Unit></Lvl></Volume>",
            decibel
        ))
        .await
    }

    async fn set_muted(&self, muted: bool) -> ClientResult<()> {
        self.put(format!("<Volume><Mute>{}</Mute></Volume>", on_off(muted)))
            .await
    }

    async fn set_input(&self, input: &str) -> ClientResult<()> {
        self.registry.validate_input(input)?;
        self.put(format!(
            "<Input><Input_Sel>{}</Input_Sel></Input>",
            html_escape::encode_text(input)
        ))
        .await?;
        *self.selected_input.write() = Some(input.to_string());
        Ok(())
    }

    async fn set_surround_program(&self, program: &str) -> ClientResult<()> {
        self.registry.validate_surround_program(program)?;
        self.put(format!(
            "<Surround><Program_Sel><Current><Straight>Off</Straight><Sound_Program>{}</Sound_Program></Current></Program_Sel></Surround>",
            html_escape::encode_text(program)
        ))
        .await
    }

    async fn set_sound_option(&self, option: SoundOption, enabled: bool) -> ClientResult<()> {
        let fragment = match option {
            SoundOption::SurroundStraight => format!(
                "<Surround><Program_Sel><Current><Straight>{}</Straight></Current></Program_Sel></Surround>",
                on_off(enabled)
            ),
            SoundOption::SurroundEnhancer => format!(
                "<Surround><Program_Sel><Current><Enhancer>{}</Enhancer></Current></Program_Sel></Surround>",
                on_off(enabled)
            ),
            SoundOption::Direct => format!(
                "<Sound_Video><Direct><Mode>{}</Mode></Direct></Sound_Video>",
                on_off(enabled)
            ),
            SoundOption::ExtraBass => format!(
                "<Sound_Video><Extra_Bass>{}</Extra_Bass></Sound_Video>",
                if enabled { "Auto" } else { "Off" }
            ),
            SoundOption::AdaptiveDrc => format!(
                "<Sound_Video><Adaptive_DRC>{}</Adaptive_DRC></Sound_Video>",
                on_off(enabled)
            ),
        };
        self.put(fragment).await
    }
}

#[async_trait]
impl PlaybackControl for LegacyClient {
    async fn playback(&self, action: PlaybackAction) -> ClientResult<()> {
        let value = match action {
            PlaybackAction::Play => "Play",
            PlaybackAction::Pause => "Pause",
            PlaybackAction::Stop => "Stop",
            PlaybackAction::Next => "Skip Fwd",
            PlaybackAction::Previous => "Skip Rev",
        };
        let zone = self.current_zone().await?;
        self.request(
            Command::Put,
            &zone,
            &format!("<Play_Control><Playback>{}</Playback></Play_Control>", value),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ZoneControl for LegacyClient {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    fn zone(&self) -> String {
        self.zone.read().clone()
    }

    async fn set_zone(&self, zone: &str) -> ClientResult<()> {
        self.registry.validate_zone(zone)?;
        *self.zone.write() = zone.to_string();
        log::info!("[Legacy] Control zone set to {}", zone);
        Ok(())
    }

    async fn device_name(&self) -> ClientResult<Option<String>> {
        self.get_network_name().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yamaha::enums::LEGACY_INPUTS;
    use crate::yamaha::test_fixtures::*;
    use std::sync::Arc;

    use axum::{extract::State, routing::post, Router};
    use tokio::sync::Mutex;

    #[test]
    fn every_enumerated_input_has_a_zone() {
        for input in LEGACY_INPUTS {
            assert!(zone_for_input(input, "Main_Zone").is_ok(), "{}", input);
        }
    }

    #[test]
    fn wired_inputs_use_configured_zone() {
        assert_eq!(zone_for_input("HDMI3", "Zone_2").unwrap(), "Zone_2");
        assert_eq!(zone_for_input("V-AUX", "Main_Zone").unwrap(), "Main_Zone");
        assert_eq!(zone_for_input("NET RADIO", "Zone_2").unwrap(), "NET_RADIO");
        assert_eq!(zone_for_input("IPOD_USB", "Main_Zone").unwrap(), "iPod_USB");
        assert_eq!(zone_for_input("TUNER", "Main_Zone").unwrap(), "Tuner");
    }

    #[test]
    fn unknown_input_fails_with_zone_mapping_error() {
        let err = zone_for_input("PHONO", "Main_Zone").unwrap_err();
        assert!(matches!(err, ClientError::UnknownZoneMapping(ref i) if i == "PHONO"));
    }

    #[test]
    fn play_info_zones() {
        assert!(has_play_info("NET_RADIO"));
        assert!(has_play_info("MusicCast Link"));
        assert!(!has_play_info("Main_Zone"));
    }

    /// Records request bodies and answers every POST with `response`.
    async fn spawn_receiver(response: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/YamahaRemoteControl/ctrl",
                post(
                    move |State(bodies): State<Arc<Mutex<Vec<String>>>>, body: String| async move {
                        bodies.lock().await.push(body);
                        response
                    },
                ),
            )
            .with_state(Arc::clone(&bodies));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/", addr), bodies)
    }

    fn client_for(url_base: &str) -> LegacyClient {
        LegacyClient::new(
            Client::new(),
            &ConnectionEndpoint::new(Protocol::Legacy, url_base),
        )
    }

    #[tokio::test]
    async fn set_volume_puts_decibels() {
        let (url, bodies) = spawn_receiver(r#"<YAMAHA_AV rsp="PUT" RC="0"/>"#).await;
        let client = client_for(&url);

        client.set_volume(50.0).await.unwrap();

        let bodies = bodies.lock().await;
        assert_eq!(
            bodies[0],
            r#"<YAMAHA_AV cmd="PUT"><Main_Zone><Volume><Lvl><Val>-320</Val><Exp>1</Exp><Unit>dB</Unit></Lvl></Volume></Main_Zone></YAMAHA_AV>"#
        );
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_sending() {
        let (url, bodies) = spawn_receiver("").await;
        let client = client_for(&url);

        let err = client.set_input("HDMI9").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        let err = client.set_surround_program("Hall in Paris").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidSurroundProgram(_)));
        assert!(bodies.lock().await.is_empty());
    }

    #[tokio::test]
    async fn surround_program_forces_straight_off() {
        let (url, bodies) = spawn_receiver("").await;
        let client = client_for(&url);

        client.set_surround_program("Hall in Vienna").await.unwrap();

        let body = bodies.lock().await[0].clone();
        assert!(body.contains("<Straight>Off</Straight><Sound_Program>Hall in Vienna</Sound_Program>"));
    }

    #[tokio::test]
    async fn get_state_caches_input_for_playback_zone() {
        let (url, bodies) = spawn_receiver(LEGACY_BASIC_STATUS).await;
        let client = client_for(&url);

        let state = client.get_state().await.unwrap();
        assert_eq!(state.input.as_deref(), Some("NET RADIO"));
        assert_eq!(client.current_zone().await.unwrap(), "NET_RADIO");

        client.playback(PlaybackAction::Next).await.unwrap();
        let bodies = bodies.lock().await;
        assert_eq!(bodies.len(), 2);
        assert_eq!(
            bodies[1],
            r#"<YAMAHA_AV cmd="PUT"><NET_RADIO><Play_Control><Playback>Skip Fwd</Playback></Play_Control></NET_RADIO></YAMAHA_AV>"#
        );
    }

    #[tokio::test]
    async fn play_info_is_empty_for_wired_inputs() {
        let (url, bodies) = spawn_receiver(LEGACY_BASIC_STATUS_MINIMAL).await;
        let client = client_for(&url);

        let info = client.get_play_info().await.unwrap();
        assert_eq!(info, PlayInfo::default());
        // Only the Basic_Status fetch went out.
        assert_eq!(bodies.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn set_zone_validates() {
        let client = client_for("http://127.0.0.1:9/");
        client.set_zone("Zone_2").await.unwrap();
        assert_eq!(client.zone(), "Zone_2");
        assert!(matches!(
            client.set_zone("Zone_9").await,
            Err(ClientError::InvalidZone(_))
        ));
        assert_eq!(client.zone(), "Zone_2");
    }

    #[tokio::test]
    async fn http_error_carries_status_and_body() {
        let app = Router::new().route(
            "/YamahaRemoteControl/ctrl",
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "nope") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = client_for(&format!("http://{}", addr));
        let err = client.set_power(true).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::HttpStatus { status: 400, ref body } if body == "nope"
        ));
    }
}
