//! Versioned capability sets.
//!
//! Each device kind exposes a fixed list of capability ids. The list a device
//! was paired with is persisted in its host settings together with
//! `capabilitySchemaVersion`; [`migrate`] brings older devices up to date once
//! at init instead of adding and removing ids ad hoc.

use serde_json::{json, Value};

use crate::events::HostPlatform;
use crate::protocol_constants::CAPABILITY_SCHEMA_VERSION;
use crate::yamaha::types::Protocol;

/// Settings key holding the schema version a device was last migrated to.
pub const SCHEMA_VERSION_SETTING: &str = "capabilitySchemaVersion";

/// Settings key holding the device's capability ids.
pub const CAPABILITIES_SETTING: &str = "capabilities";

/// Ids removed in schema version 2.
pub const DEPRECATED_CAPABILITIES: &[&str] = &["source_selected", "soundprogram_selected"];

const RECEIVER_CAPABILITIES: &[&str] = &[
    "onoff",
    "volume_set",
    "volume_mute",
    "input_selected",
    "surround_program",
    "surround_straight",
    "surround_enhancer",
    "sound_direct",
    "sound_extra_bass",
    "sound_adaptive_drc",
    "media_previous",
    "media_next",
    "media_play",
    "media_pause",
    "speaker_playing",
    "speaker_artist",
    "speaker_album",
    "speaker_track",
    "album_art",
];

const MUSICCAST_CAPABILITIES: &[&str] = &[
    "onoff",
    "volume_set",
    "volume_mute",
    "input_selected",
    "speaker_playing",
    "speaker_shuffle",
    "speaker_next",
    "speaker_prev",
    "speaker_artist",
    "speaker_album",
    "speaker_track",
    "album_art",
];

/// Current capability ids of one device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub version: u64,
    ids: &'static [&'static str],
}

impl CapabilitySet {
    #[must_use]
    pub fn for_protocol(protocol: Protocol) -> Self {
        let ids = match protocol {
            Protocol::Legacy => RECEIVER_CAPABILITIES,
            Protocol::Extended => MUSICCAST_CAPABILITIES,
        };
        Self {
            version: CAPABILITY_SCHEMA_VERSION,
            ids,
        }
    }

    #[must_use]
    pub fn ids(&self) -> &'static [&'static str] {
        self.ids
    }

    #[must_use]
    pub fn contains(&self, capability: &str) -> bool {
        self.ids.contains(&capability)
    }
}

/// What [`migrate`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    pub from_version: u64,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Resulting capability list, in persisted order.
    pub capabilities: Vec<String>,
}

impl Migration {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn stored_capabilities(value: Option<Value>) -> Option<Vec<String>> {
    let Value::Array(items) = value? else {
        return None;
    };
    Some(
        items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

/// Migrates the persisted capability list of `device_id` to the current schema.
///
/// Devices with no stored list get the full current set. Stored lists keep
/// their order; deprecated ids are dropped and missing ids appended. The
/// version setting is always written back.
pub fn migrate(platform: &dyn HostPlatform, device_id: &str, protocol: Protocol) -> Migration {
    let set = CapabilitySet::for_protocol(protocol);
    let from_version = platform
        .get_setting(device_id, SCHEMA_VERSION_SETTING)
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    let stored = stored_capabilities(platform.get_setting(device_id, CAPABILITIES_SETTING));
    let had_list = stored.is_some();
    let mut capabilities = stored.unwrap_or_default();

    let mut removed = Vec::new();
    capabilities.retain(|id| {
        let keep = !DEPRECATED_CAPABILITIES.contains(&id.as_str());
        if !keep {
            removed.push(id.clone());
        }
        keep
    });

    let mut added = Vec::new();
    for id in set.ids() {
        if !capabilities.iter().any(|c| c == id) {
            capabilities.push((*id).to_string());
            if had_list {
                added.push((*id).to_string());
            }
        }
    }

    let migration = Migration {
        from_version,
        added,
        removed,
        capabilities,
    };

    if !had_list || !migration.is_noop() {
        platform.set_setting(device_id, CAPABILITIES_SETTING, json!(migration.capabilities));
    }
    if from_version != set.version {
        platform.set_setting(device_id, SCHEMA_VERSION_SETTING, json!(set.version));
    }

    if !migration.is_noop() {
        log::info!(
            "[Capabilities] {} migrated from v{}: +{:?} -{:?}",
            device_id,
            from_version,
            migration.added,
            migration.removed
        );
    }

    migration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LoggingPlatform;

    #[test]
    fn fresh_device_gets_full_set() {
        let platform = LoggingPlatform::new();
        let migration = migrate(&platform, "av", Protocol::Legacy);

        assert!(migration.is_noop());
        assert_eq!(migration.from_version, 0);
        assert_eq!(migration.capabilities.len(), RECEIVER_CAPABILITIES.len());
        assert_eq!(
            platform.get_setting("av", SCHEMA_VERSION_SETTING),
            Some(json!(CAPABILITY_SCHEMA_VERSION))
        );
        assert_eq!(
            platform.get_setting("av", CAPABILITIES_SETTING),
            Some(json!(RECEIVER_CAPABILITIES))
        );
    }

    #[test]
    fn old_device_drops_deprecated_and_gains_new() {
        let platform = LoggingPlatform::new();
        platform.set_setting(
            "av",
            CAPABILITIES_SETTING,
            json!(["onoff", "volume_set", "volume_mute", "source_selected", "soundprogram_selected"]),
        );
        platform.set_setting("av", SCHEMA_VERSION_SETTING, json!(1));

        let migration = migrate(&platform, "av", Protocol::Legacy);

        assert_eq!(migration.from_version, 1);
        assert_eq!(migration.removed, vec!["source_selected", "soundprogram_selected"]);
        assert!(migration.added.contains(&"input_selected".to_string()));
        assert!(migration.added.contains(&"media_pause".to_string()));
        assert_eq!(&migration.capabilities[..3], &["onoff", "volume_set", "volume_mute"]);
        assert!(!migration
            .capabilities
            .iter()
            .any(|c| DEPRECATED_CAPABILITIES.contains(&c.as_str())));
        assert_eq!(
            platform.get_setting("av", SCHEMA_VERSION_SETTING),
            Some(json!(CAPABILITY_SCHEMA_VERSION))
        );
    }

    #[test]
    fn current_device_is_left_alone() {
        let platform = LoggingPlatform::new();
        migrate(&platform, "mc", Protocol::Extended);
        let second = migrate(&platform, "mc", Protocol::Extended);

        assert!(second.is_noop());
        assert_eq!(second.from_version, CAPABILITY_SCHEMA_VERSION);
        assert_eq!(second.capabilities.len(), MUSICCAST_CAPABILITIES.len());
    }

    #[test]
    fn sets_differ_per_protocol() {
        let receiver = CapabilitySet::for_protocol(Protocol::Legacy);
        let musiccast = CapabilitySet::for_protocol(Protocol::Extended);

        assert!(receiver.contains("surround_program"));
        assert!(!musiccast.contains("surround_program"));
        assert!(musiccast.contains("speaker_shuffle"));
        assert!(!receiver.contains("speaker_shuffle"));
    }
}
