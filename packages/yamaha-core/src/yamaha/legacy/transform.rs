//! Transforms legacy XML responses into domain types.
//!
//! The `YAMAHA_AV` root and the addressed zone node are required; anything
//! below them is optional and maps to `None` when absent.

use crate::protocol_constants::LEGACY_ROOT_ELEMENT;
use crate::yamaha::transport::ClientResult;
use crate::yamaha::types::{DeviceState, PlayInfo, SoundSettings};
use crate::yamaha::xml::{decode_entities, XmlDocument, XmlElement, XmlError};

use super::volume::decibel_to_percentile;

/// Returns the zone node of a response, failing when the root or zone is missing.
fn zone_result<'a>(doc: &'a XmlDocument, zone: &str) -> ClientResult<&'a XmlElement> {
    let root = doc.root();
    if root.name() != LEGACY_ROOT_ELEMENT {
        return Err(XmlError::MissingNode(LEGACY_ROOT_ELEMENT.to_string()).into());
    }
    Ok(root.require(zone)?)
}

fn is_on(node: &XmlElement, path: &str) -> Option<bool> {
    node.text_at(path).map(|v| v == "On")
}

/// Transforms a `Basic_Status` response of `zone`.
pub fn transform_basic_status(xml: &str, zone: &str) -> ClientResult<DeviceState> {
    let doc = XmlDocument::parse(xml)?;
    let status = zone_result(&doc, zone)?.require("Basic_Status")?;

    let mut state = DeviceState::default();

    if let Some(power) = status.child("Power_Control") {
        state.power = Some(power.text_at("Power") == Some("On"));
    }

    if let Some(volume) = status.first_of(&["Volume", "Vol"]) {
        state.volume = volume
            .text_at("Lvl.Val")
            .and_then(|v| v.parse::<i32>().ok())
            .map(decibel_to_percentile);
        state.muted = Some(volume.text_at("Mute") == Some("On"));
        state.subwoofer_trim = volume.text_at("Subwoofer_Trim.Val").map(str::to_string);
        state.display_scale = volume.text_of(&["Scale", "Lvl.Unit"]).map(str::to_string);
    }

    if let Some(input) = status.child("Input") {
        state.input = input.non_empty_text("Input_Sel").map(str::to_string);
        state.input_title = input
            .non_empty_text("Input_Sel_Item_Info.Title")
            .map(str::to_string);
    }

    let mut sound = SoundSettings::default();

    if let Some(current) = status.path("Surround.Program_Sel.Current") {
        state.surround_program = current.non_empty_text("Sound_Program").map(str::to_string);
        sound.surround_straight = is_on(current, "Straight");
        sound.surround_enhancer = is_on(current, "Enhancer");
    }

    if let Some(sound_video) = status.child("Sound_Video") {
        sound.direct = sound_video
            .text_of(&["Direct.Mode", "Pure_Direct.Mode"])
            .map(|v| v == "On");
        sound.extra_bass = sound_video.text_at("Extra_Bass").map(|v| v != "Off");
        sound.adaptive_drc = sound_video.text_at("Adaptive_DRC").map(|v| v != "Off");
    }

    state.sound = sound;
    Ok(state)
}

/// Transforms a `Play_Info` response of `zone`.
///
/// Metadata is double-encoded by the device and decoded a second time here.
/// `url_base` prefixes the relative album art path when one is reported.
pub fn transform_play_info(xml: &str, zone: &str, url_base: &str) -> ClientResult<PlayInfo> {
    let doc = XmlDocument::parse(xml)?;
    let play_info = zone_result(&doc, zone)?.require("Play_Info")?;

    let playback = play_info.text_at("Playback_Info").unwrap_or_default();
    let meta = |paths: &[&str]| {
        play_info
            .child("Meta_Info")
            .and_then(|m| m.text_of(paths))
            .filter(|t| !t.is_empty())
            .map(|t| decode_entities(t).into_owned())
    };

    Ok(PlayInfo {
        available: play_info.text_at("Feature_Availability") == Some("Ready"),
        input: Some(zone.to_string()),
        playing: playback == "Play",
        paused: playback == "Pause",
        stopped: playback == "Stop",
        artist: meta(&["Artist"]),
        album: meta(&["Album"]),
        track: meta(&["Song", "Track"]),
        album_art_url: play_info
            .non_empty_text("Album_ART.URL")
            .map(|path| format!("{}{}", url_base.trim_end_matches('/'), path)),
        ..Default::default()
    })
}

/// Extracts `Misc.Network.Network_Name` from a `System` response.
pub fn transform_network_name(xml: &str) -> ClientResult<Option<String>> {
    let doc = XmlDocument::parse(xml)?;
    let system = zone_result(&doc, "System")?;
    Ok(system
        .non_empty_text("Misc.Network.Network_Name")
        .map(str::to_string))
}

/// Extracts the `Unit_Name` attribute of a unit description document.
#[must_use]
pub fn transform_unit_name(xml: &str) -> Option<String> {
    let doc = XmlDocument::parse(xml).ok()?;
    let root = doc.root();
    (root.name() == "Unit_Description")
        .then(|| root.attr("Unit_Name").map(str::to_string))
        .flatten()
}
