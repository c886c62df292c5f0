//! Response payloads of the extended control API.
//!
//! Every response carries a `response_code`; all other fields are optional
//! since their presence varies by model and zone.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::yamaha::transport::{ClientError, ClientResult};

/// Checks `response_code` and decodes the payload.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> ClientResult<T> {
    let code = value
        .get("response_code")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if let Some(err) = ClientError::from_response_code(code) {
        return Err(err);
    }
    Ok(serde_json::from_value(value)?)
}

/// Payload of responses that only carry the code.
#[derive(Debug, Deserialize)]
pub(crate) struct Ack {}

/// `<zone>/getStatus`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StatusResponse {
    pub power: Option<String>,
    pub volume: Option<u32>,
    pub mute: Option<bool>,
    pub max_volume: Option<u32>,
    pub input: Option<String>,
    pub sound_program: Option<String>,
}

/// `<zone>/getPlayInfo`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PlayInfoResponse {
    pub input: Option<String>,
    pub playback: Option<String>,
    pub repeat: Option<String>,
    pub shuffle: Option<String>,
    pub play_time: Option<i64>,
    pub total_time: Option<i64>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<String>,
    pub albumart_url: Option<String>,
}

/// One entry of `system/getFeatures` `zone[]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ZoneFeature {
    pub id: String,
}

/// `system/getFeatures`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FeaturesResponse {
    pub zone: Vec<ZoneFeature>,
}

/// `system/getNameText`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NameTextResponse {
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_code_decodes_payload() {
        let status: StatusResponse = decode(json!({
            "response_code": 0,
            "power": "on",
            "volume": 40,
            "mute": false,
            "max_volume": 161,
            "input": "spotify",
            "sound_program": "straight",
            "tone_control": {"mode": "manual"}
        }))
        .unwrap();
        assert_eq!(status.power.as_deref(), Some("on"));
        assert_eq!(status.max_volume, Some(161));
    }

    #[test]
    fn guarded_code_is_an_error() {
        let err = decode::<Ack>(json!({"response_code": 5})).unwrap_err();
        assert!(matches!(err, ClientError::GuardedError));
    }

    #[test]
    fn invalid_parameter_code_is_an_error() {
        let err = decode::<Ack>(json!({"response_code": 4})).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameter));
    }

    #[test]
    fn wrongly_typed_payload_is_a_json_error() {
        let err = decode::<StatusResponse>(json!({"response_code": 0, "volume": "loud"}))
            .unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
