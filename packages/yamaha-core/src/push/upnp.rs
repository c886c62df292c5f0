//! UPnP GENA NOTIFY body parsing.
//!
//! A body is an `e:propertyset` of `e:property` elements. AVTransport and
//! RenderingControl wrap their state in an escaped `LastChange` document;
//! each `InstanceID` of it becomes one map of `tag -> val`. Other properties
//! become one map of `tag -> text`.

use std::collections::BTreeMap;

use super::event::{PushEvent, PushFlags};
use super::PushResult;
use crate::yamaha::xml::{XmlDocument, XmlElement};

/// Variables that describe the transport or the current track.
const PLAY_INFO_VARIABLES: &[&str] = &[
    "TransportState",
    "TransportStatus",
    "CurrentTrackURI",
    "CurrentTrackMetaData",
    "AVTransportURI",
    "AVTransportURIMetaData",
    "CurrentPlayMode",
    "CurrentTrackDuration",
];

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn parse_last_change(xml: &str) -> PushResult<Vec<BTreeMap<String, String>>> {
    let doc = XmlDocument::parse(xml)?;
    Ok(doc
        .root()
        .children()
        .iter()
        .filter(|el| local_name(el.name()) == "InstanceID")
        .map(instance_map)
        .collect())
}

fn instance_map(instance: &XmlElement) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(id) = instance.attr("val") {
        map.insert("InstanceID".to_string(), id.to_string());
    }
    for variable in instance.children() {
        let value = variable.attr("val").unwrap_or_else(|| variable.text());
        map.insert(local_name(variable.name()).to_string(), value.to_string());
    }
    map
}

/// Parses a NOTIFY body into property maps.
pub fn parse_notify(body: &str) -> PushResult<Vec<BTreeMap<String, String>>> {
    let doc = XmlDocument::parse(body)?;
    let mut maps = Vec::new();
    let mut plain = BTreeMap::new();

    for property in doc
        .root()
        .children()
        .iter()
        .filter(|el| local_name(el.name()) == "property")
    {
        for variable in property.children() {
            let name = local_name(variable.name());
            if name == "LastChange" {
                maps.extend(parse_last_change(variable.text())?);
            } else {
                plain.insert(name.to_string(), variable.text().to_string());
            }
        }
    }

    if !plain.is_empty() {
        maps.push(plain);
    }
    Ok(maps)
}

/// Flags implied by a set of changed variables.
#[must_use]
pub fn flags_for(maps: &[BTreeMap<String, String>]) -> PushFlags {
    let mut flags = PushFlags::default();
    for key in maps.iter().flat_map(|m| m.keys()) {
        if key == "InstanceID" {
            continue;
        }
        if PLAY_INFO_VARIABLES.contains(&key.as_str()) {
            flags.play_info_updated = true;
        } else {
            flags.status_updated = true;
        }
    }
    flags
}

/// Parses a NOTIFY body for the device subscribed under the SID.
pub fn notify_event(device_id: &str, body: &str) -> PushResult<PushEvent> {
    let properties = parse_notify(body)?;
    Ok(PushEvent {
        device_id: device_id.to_string(),
        sender: None,
        zone_updates: Vec::new(),
        flags: flags_for(&properties),
        properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yamaha::test_fixtures::*;

    #[test]
    fn last_change_yields_one_map_per_instance() {
        let maps = parse_notify(UPNP_NOTIFY_LAST_CHANGE).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].get("InstanceID").map(String::as_str), Some("0"));
        assert_eq!(maps[0].get("TransportState").map(String::as_str), Some("PLAYING"));
        assert_eq!(
            maps[0].get("CurrentTrackURI").map(String::as_str),
            Some("http://10.0.0.2/a.mp3")
        );
    }

    #[test]
    fn transport_changes_flag_play_info() {
        let event = notify_event("kitchen", UPNP_NOTIFY_LAST_CHANGE).unwrap();
        assert!(event.flags.play_info_updated);
        assert!(!event.flags.status_updated);
        assert_eq!(event.device_id, "kitchen");
    }

    #[test]
    fn rendering_changes_flag_status() {
        let event = notify_event("kitchen", UPNP_NOTIFY_RENDERING).unwrap();
        assert_eq!(event.properties[0].get("Volume").map(String::as_str), Some("42"));
        assert_eq!(event.properties[0].get("Mute").map(String::as_str), Some("1"));
        assert!(event.flags.status_updated);
        assert!(!event.flags.play_info_updated);
    }

    #[test]
    fn plain_properties_become_one_map() {
        let maps = parse_notify(UPNP_NOTIFY_PROPERTIES).unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].get("SystemUpdateID").map(String::as_str), Some("12"));
        assert_eq!(maps[0].get("ContainerUpdateIDs").map(String::as_str), Some("0,4"));
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(parse_notify("<e:propertyset>").is_err());
        let bad_inner = r#"<e:propertyset xmlns:e="x"><e:property><LastChange>&lt;Event&gt;</LastChange></e:property></e:propertyset>"#;
        assert!(parse_notify(bad_inner).is_err());
    }
}
