//! Upward interface to the host platform.
//!
//! The core reports everything through [`HostPlatform`]: capability values,
//! flow triggers, availability, errors and per-device settings. It never
//! learns how the host stores or displays any of it.

mod emitter;

pub use emitter::{HostPlatform, LoggingPlatform, NoopPlatform};

#[cfg(test)]
pub(crate) use emitter::testing;

use serde::Serialize;
use serde_json::{json, Value};

/// Value of a capability as the host sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl From<bool> for CapabilityValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for CapabilityValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Option<String>> for CapabilityValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// Flow triggers fired on state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    InputChanged { input: String },
    SurroundProgramChanged { surround_program: String },
    Muted,
    Unmuted,
}

impl Trigger {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InputChanged { .. } => "input_changed",
            Self::SurroundProgramChanged { .. } => "surround_program_changed",
            Self::Muted => "muted",
            Self::Unmuted => "unmuted",
        }
    }

    /// Tokens passed along with the trigger.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::InputChanged { input } => json!({ "input": input }),
            Self::SurroundProgramChanged { surround_program } => {
                json!({ "surround_program": surround_program })
            }
            Self::Muted | Self::Unmuted => json!({}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_names_and_payloads() {
        let trigger = Trigger::InputChanged {
            input: "HDMI1".into(),
        };
        assert_eq!(trigger.name(), "input_changed");
        assert_eq!(trigger.payload(), json!({"input": "HDMI1"}));
        assert_eq!(Trigger::Muted.payload(), json!({}));
    }

    #[test]
    fn capability_values_serialize_untagged() {
        assert_eq!(serde_json::to_value(CapabilityValue::from(true)).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(CapabilityValue::from(42.5)).unwrap(), json!(42.5));
        assert_eq!(serde_json::to_value(CapabilityValue::from(None)).unwrap(), Value::Null);
    }
}
