//! Scripted protocol client for monitor and manager tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::yamaha::traits::{DeviceControl, DeviceStatus, PlaybackControl, ZoneControl};
use crate::yamaha::transport::{ClientError, ClientResult};
use crate::yamaha::types::{DeviceState, PlayInfo, PlaybackAction, Protocol, SoundOption};

/// One scripted answer to `get_state`.
#[derive(Debug, Clone)]
pub enum Step {
    State(DeviceState),
    /// Connection refused by a closed local port.
    Refused,
    /// Device answered with garbage.
    Malformed,
}

/// Client whose reads follow a script and whose writes are recorded.
///
/// Once the script runs out, the last step repeats.
pub struct ScriptedClient {
    protocol: Protocol,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    pub play_info: Mutex<PlayInfo>,
    pub calls: Mutex<Vec<String>>,
    pub network_id: Option<String>,
    /// Time every `get_state` takes before answering.
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new(protocol: Protocol, steps: Vec<Step>) -> Self {
        Self {
            protocol,
            steps: Mutex::new(steps.into()),
            last: Mutex::new(Step::State(DeviceState::default())),
            play_info: Mutex::new(PlayInfo::default()),
            calls: Mutex::new(Vec::new()),
            network_id: None,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_step(&self, step: Step) {
        self.steps.lock().push_back(step);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().pop_front();
        match next {
            Some(step) => {
                *self.last.lock() = step.clone();
                step
            }
            None => self.last.lock().clone(),
        }
    }
}

/// A real connection-refused error from reqwest.
pub async fn refused() -> ClientError {
    let err = reqwest::Client::new()
        .get("http://127.0.0.1:1/")
        .send()
        .await
        .unwrap_err();
    ClientError::Http(err)
}

/// A parsed state with the fields every poll reports.
pub fn state(power: bool, muted: bool, input: &str) -> DeviceState {
    DeviceState {
        power: Some(power),
        volume: Some(40.0),
        muted: Some(muted),
        input: Some(input.to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl DeviceStatus for ScriptedClient {
    async fn get_state(&self) -> ClientResult<DeviceState> {
        self.record("get_state".into());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.next_step() {
            Step::State(state) => Ok(state),
            Step::Refused => Err(refused().await),
            Step::Malformed => Err(ClientError::UnexpectedResponseCode(99)),
        }
    }

    async fn get_play_info(&self) -> ClientResult<PlayInfo> {
        Ok(self.play_info.lock().clone())
    }
}

#[async_trait]
impl DeviceControl for ScriptedClient {
    async fn set_power(&self, on: bool) -> ClientResult<()> {
        self.record(format!("set_power:{}", on));
        Ok(())
    }

    async fn set_volume(&self, percentile: f64) -> ClientResult<()> {
        self.record(format!("set_volume:{}", percentile));
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> ClientResult<()> {
        self.record(format!("set_muted:{}", muted));
        Ok(())
    }

    async fn set_input(&self, input: &str) -> ClientResult<()> {
        if input == "bogus" {
            return Err(ClientError::InvalidInput(input.to_string()));
        }
        self.record(format!("set_input:{}", input));
        Ok(())
    }

    async fn set_surround_program(&self, program: &str) -> ClientResult<()> {
        self.record(format!("set_surround_program:{}", program));
        Ok(())
    }

    async fn set_sound_option(&self, option: SoundOption, enabled: bool) -> ClientResult<()> {
        self.record(format!("{}:{}", option.capability(), enabled));
        Ok(())
    }
}

#[async_trait]
impl PlaybackControl for ScriptedClient {
    async fn playback(&self, action: PlaybackAction) -> ClientResult<()> {
        self.record(format!("playback:{:?}", action));
        Ok(())
    }
}

#[async_trait]
impl ZoneControl for ScriptedClient {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    fn zone(&self) -> String {
        self.protocol.default_zone().to_string()
    }

    async fn set_zone(&self, zone: &str) -> ClientResult<()> {
        self.record(format!("set_zone:{}", zone));
        Ok(())
    }

    async fn device_name(&self) -> ClientResult<Option<String>> {
        Ok(Some("Living Room".into()))
    }

    async fn network_id(&self) -> ClientResult<Option<String>> {
        Ok(self.network_id.clone())
    }
}
