//! Per-device reconciliation task.
//!
//! Every paired device runs one [`DeviceMonitor`] on its own task. The monitor
//! is the only writer of the device snapshot: poll results, push events and
//! host commands are all handled one at a time from a single `select!` loop.
//!
//! # Lifecycle
//!
//! - The first poll runs immediately. Later polls run every
//!   `max(updateInterval, 5s)`, or every 60s while the device is unavailable.
//! - Push events are folded in as they arrive and never move the poll timer.
//!   Events flagged `status_updated`/`play_info_updated` cause an extra poll.
//! - The first observation of a field is its baseline; triggers fire only on
//!   a later transition of a present field.
//! - Stopping the monitor drops any poll, push or command still running, so a
//!   removed device never reports to the host again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::capabilities::CapabilitySet;
use super::{ServiceError, ServiceResult};
use crate::events::{CapabilityValue, HostPlatform, Trigger};
use crate::protocol_constants::{
    DEVICE_INBOX_CAPACITY, MINIMUM_UPDATE_INTERVAL_MS, UNAVAILABLE_UPDATE_INTERVAL_MS,
};
use crate::push::{DeviceRegistry, PushEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::yamaha::extended::raw_to_percentile;
use crate::yamaha::traits::ProtocolClient;
use crate::yamaha::transport::{ClientError, ClientResult};
use crate::yamaha::types::{DeviceState, PlayInfo, PlaybackAction, SoundOption};

/// Settings key for the poll interval in seconds.
pub const UPDATE_INTERVAL_SETTING: &str = "updateInterval";

/// Settings key for the raw volume ceiling of extended devices.
pub const MAX_VOLUME_SETTING: &str = "maxVolume";

/// Consecutive protocol errors on the state fetch before a device is
/// considered unavailable.
const PROTOCOL_FAILURE_THRESHOLD: u32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// A host request against one device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    SetPower(bool),
    /// 0..100 percentile.
    SetVolume(f64),
    SetMuted(bool),
    SetInput(String),
    SetSurroundProgram(String),
    SetSoundOption(SoundOption, bool),
    VolumeStep { up: bool, step: u32 },
    Playback(PlaybackAction),
    /// Poll now.
    Refresh,
}

impl DeviceCommand {
    /// Maps a capability write from the host to a command.
    pub fn from_capability(capability: &str, value: &Value) -> ServiceResult<Self> {
        let invalid = || ServiceError::InvalidValue {
            capability: capability.to_string(),
            value: value.clone(),
        };
        let as_bool = || value.as_bool().ok_or_else(invalid);
        let as_text = || value.as_str().map(str::to_string).ok_or_else(invalid);

        if let Some(option) = SoundOption::from_capability(capability) {
            return Ok(Self::SetSoundOption(option, as_bool()?));
        }

        let command = match capability {
            "onoff" => Self::SetPower(as_bool()?),
            "volume_set" => Self::SetVolume(
                value
                    .as_f64()
                    .filter(|v| (0.0..=100.0).contains(v))
                    .ok_or_else(invalid)?,
            ),
            "volume_mute" => Self::SetMuted(as_bool()?),
            "input_selected" => Self::SetInput(as_text()?),
            "surround_program" => Self::SetSurroundProgram(as_text()?),
            "speaker_playing" => Self::Playback(if as_bool()? {
                PlaybackAction::Play
            } else {
                PlaybackAction::Pause
            }),
            "media_play" => Self::Playback(PlaybackAction::Play),
            "media_pause" => Self::Playback(PlaybackAction::Pause),
            "media_next" | "speaker_next" => Self::Playback(PlaybackAction::Next),
            "media_previous" | "speaker_prev" => Self::Playback(PlaybackAction::Previous),
            "speaker_shuffle" | "speaker_artist" | "speaker_album" | "speaker_track"
            | "album_art" => return Err(ServiceError::ReadOnlyCapability(capability.to_string())),
            other => return Err(ServiceError::UnknownCapability(other.to_string())),
        };
        Ok(command)
    }

    fn skips_track(&self) -> bool {
        matches!(
            self,
            Self::Playback(PlaybackAction::Next | PlaybackAction::Previous)
        )
    }
}

struct CommandRequest {
    command: DeviceCommand,
    reply: oneshot::Sender<ServiceResult<()>>,
}

/// Cloneable handle to a running monitor.
#[derive(Clone)]
pub struct DeviceHandle {
    device_id: String,
    capabilities: CapabilitySet,
    commands: mpsc::Sender<CommandRequest>,
    cancel: CancellationToken,
}

impl DeviceHandle {
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    /// Runs `command` on the device and waits for the client's answer.
    ///
    /// The follow-up poll happens after the reply.
    pub async fn send(&self, command: DeviceCommand) -> ServiceResult<()> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(CommandRequest { command, reply })
            .await
            .map_err(|_| ServiceError::DeviceStopped(self.device_id.clone()))?;
        rx.await
            .map_err(|_| ServiceError::DeviceStopped(self.device_id.clone()))?
    }

    /// Applies a host capability write.
    pub async fn set_capability(&self, capability: &str, value: &Value) -> ServiceResult<()> {
        if !self.capabilities.contains(capability) {
            return Err(ServiceError::UnknownCapability(capability.to_string()));
        }
        let command = DeviceCommand::from_capability(capability, value)?;
        self.send(command).await
    }

    pub async fn refresh(&self) -> ServiceResult<()> {
        self.send(DeviceCommand::Refresh).await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Monitor
// ─────────────────────────────────────────────────────────────────────────────

/// Availability as last reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityState {
    pub available: bool,
    pub last_error: Option<String>,
}

impl Default for AvailabilityState {
    fn default() -> Self {
        Self {
            available: true,
            last_error: None,
        }
    }
}

/// Reconciler for one device.
pub struct DeviceMonitor {
    device_id: String,
    client: Arc<dyn ProtocolClient>,
    platform: Arc<dyn HostPlatform>,
    registry: Arc<DeviceRegistry>,
    capabilities: CapabilitySet,
    default_interval_secs: u64,
    state: DeviceState,
    play_info: Option<PlayInfo>,
    /// Last value sent to the host per capability.
    emitted: HashMap<&'static str, CapabilityValue>,
    availability: AvailabilityState,
    protocol_failures: u32,
    max_volume: Option<u32>,
    alias_checked: bool,
}

impl DeviceMonitor {
    pub fn new(
        device_id: impl Into<String>,
        client: Arc<dyn ProtocolClient>,
        platform: Arc<dyn HostPlatform>,
        registry: Arc<DeviceRegistry>,
        default_interval_secs: u64,
    ) -> Self {
        let device_id = device_id.into();
        let max_volume = platform
            .get_setting(&device_id, MAX_VOLUME_SETTING)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0);

        Self {
            capabilities: CapabilitySet::for_protocol(client.protocol()),
            device_id,
            client,
            platform,
            registry,
            default_interval_secs,
            state: DeviceState::default(),
            play_info: None,
            emitted: HashMap::new(),
            availability: AvailabilityState::default(),
            protocol_failures: 0,
            max_volume,
            alias_checked: false,
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Current merged snapshot.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    #[must_use]
    pub fn play_info(&self) -> Option<&PlayInfo> {
        self.play_info.as_ref()
    }

    #[must_use]
    pub fn availability(&self) -> &AvailabilityState {
        &self.availability
    }

    /// Delay until the next scheduled poll.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        if !self.availability.available {
            return Duration::from_millis(UNAVAILABLE_UPDATE_INTERVAL_MS);
        }
        let secs = self
            .platform
            .get_setting(&self.device_id, UPDATE_INTERVAL_SETTING)
            .and_then(|v| v.as_u64())
            .unwrap_or(self.default_interval_secs);
        Duration::from_millis(secs.saturating_mul(1000).max(MINIMUM_UPDATE_INTERVAL_MS))
    }

    /// Starts the reconciliation task.
    ///
    /// `inbox` receives the push events the registry dispatches to this
    /// device. The task ends when `cancel` fires.
    pub fn spawn(
        self,
        inbox: mpsc::Receiver<PushEvent>,
        spawner: &TokioSpawner,
        cancel: CancellationToken,
    ) -> DeviceHandle {
        let (commands, command_rx) = mpsc::channel(DEVICE_INBOX_CAPACITY);
        let handle = DeviceHandle {
            device_id: self.device_id.clone(),
            capabilities: self.capabilities,
            commands,
            cancel: cancel.clone(),
        };
        spawner.spawn(self.run(inbox, command_rx, cancel));
        handle
    }

    async fn run(
        mut self,
        mut inbox: mpsc::Receiver<PushEvent>,
        mut commands: mpsc::Receiver<CommandRequest>,
        cancel: CancellationToken,
    ) {
        log::info!(
            "[Monitor] Started {} ({})",
            self.device_id,
            self.client.protocol()
        );
        let mut next_poll = Instant::now();

        loop {
            // Work in flight is dropped on cancel so nothing reaches the host
            // after removal.
            let finished = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                Some(request) = commands.recv() => {
                    until_cancelled(&cancel, self.handle_command(request)).await
                }
                Some(event) = inbox.recv() => {
                    until_cancelled(&cancel, self.handle_push(&event)).await
                }
                () = tokio::time::sleep_until(next_poll) => {
                    let finished = until_cancelled(&cancel, self.poll()).await;
                    if finished {
                        next_poll = Instant::now() + self.update_interval();
                    }
                    finished
                }
            };
            if !finished {
                break;
            }
        }

        log::info!("[Monitor] Stopped {}", self.device_id);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Polling
    // ─────────────────────────────────────────────────────────────────────────

    async fn poll(&mut self) {
        let mut state = match self.client.get_state().await {
            Ok(state) => state,
            Err(e) => return self.handle_poll_error(e),
        };
        // A full status without power means the zone is off.
        state.power.get_or_insert(false);

        self.protocol_failures = 0;
        self.availability.last_error = None;
        self.apply_state(&state);
        self.mark_available();
        self.register_alias().await;

        match self.client.get_play_info().await {
            Ok(info) => self.apply_play_info(info),
            Err(e) if e.is_transient() => {
                log::debug!("[Monitor] {} play info unreachable: {}", self.device_id, e);
            }
            Err(e) => {
                log::warn!("[Monitor] {} play info failed: {}", self.device_id, e);
                self.platform.report_error(&self.device_id, &e);
            }
        }

        log::trace!("[Monitor] {} updated device values", self.device_id);
    }

    fn handle_poll_error(&mut self, error: ClientError) {
        self.availability.last_error = Some(error.to_string());

        if error.is_transient() {
            log::debug!("[Monitor] {} unreachable: {}", self.device_id, error);
            self.mark_unavailable(&error);
            return;
        }

        self.protocol_failures += 1;
        log::warn!(
            "[Monitor] {} failed updating device values ({} in a row): {}",
            self.device_id,
            self.protocol_failures,
            error
        );
        self.platform.report_error(&self.device_id, &error);
        if self.protocol_failures >= PROTOCOL_FAILURE_THRESHOLD {
            self.mark_unavailable(&error);
        }
    }

    fn mark_available(&mut self) {
        if self.availability.available {
            return;
        }
        self.availability.available = true;
        log::info!("[Monitor] {} is available again", self.device_id);
        self.platform.report_available(&self.device_id);
    }

    fn mark_unavailable(&mut self, error: &ClientError) {
        if !self.availability.available {
            return;
        }
        self.availability.available = false;
        log::info!("[Monitor] {} is unavailable: {}", self.device_id, error);
        self.emit("onoff", false.into());
        self.platform
            .report_unavailable(&self.device_id, &error.to_string());
    }

    /// Routes unicast events stamped with the device's network id here.
    async fn register_alias(&mut self) {
        if self.alias_checked {
            return;
        }
        match self.client.network_id().await {
            Ok(network_id) => {
                if let Some(network_id) = network_id {
                    self.registry.alias(&network_id, &self.device_id);
                }
                self.alias_checked = true;
            }
            Err(e) => log::debug!("[Monitor] {} network id unknown: {}", self.device_id, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Push
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_push(&mut self, event: &PushEvent) {
        let zone = self.client.protocol().default_zone();
        if let Some(update) = event.zone_update(zone) {
            log::debug!("[Monitor] {} push update: {:?}", self.device_id, update);
            self.apply_state(update);
        }
        if event.flags.needs_poll() {
            self.poll().await;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    async fn handle_command(&mut self, request: CommandRequest) {
        let CommandRequest { command, reply } = request;

        if command == DeviceCommand::Refresh {
            self.poll().await;
            let _ = reply.send(Ok(()));
            return;
        }

        let result = self.execute(&command).await;
        let succeeded = result.is_ok();
        match &result {
            Ok(()) => {
                log::debug!("[Monitor] {} applied {:?}", self.device_id, command);
                self.apply_echo(&command);
            }
            Err(e) => log::warn!("[Monitor] {} {:?} failed: {}", self.device_id, command, e),
        }
        let _ = reply.send(result.map_err(ServiceError::from));

        if succeeded {
            if command.skips_track() {
                self.emit("album_art", CapabilityValue::Null);
            }
            self.poll().await;
        }
    }

    async fn execute(&self, command: &DeviceCommand) -> ClientResult<()> {
        let client = &self.client;
        match command {
            DeviceCommand::SetPower(on) => client.set_power(*on).await,
            DeviceCommand::SetVolume(volume) => client.set_volume(*volume).await,
            DeviceCommand::SetMuted(muted) => client.set_muted(*muted).await,
            DeviceCommand::SetInput(input) => client.set_input(input).await,
            DeviceCommand::SetSurroundProgram(program) => {
                client.set_surround_program(program).await
            }
            DeviceCommand::SetSoundOption(option, enabled) => {
                client.set_sound_option(*option, *enabled).await
            }
            DeviceCommand::VolumeStep { up, step } => client.volume_step(*up, *step).await,
            DeviceCommand::Playback(action) => client.playback(*action).await,
            DeviceCommand::Refresh => Ok(()),
        }
    }

    /// Records a successful input or program change and fires its trigger.
    ///
    /// The snapshot is updated first, so the follow-up poll sees no transition.
    fn apply_echo(&mut self, command: &DeviceCommand) {
        let (update, trigger, changed) = match command {
            DeviceCommand::SetInput(input) => (
                DeviceState {
                    input: Some(input.clone()),
                    ..Default::default()
                },
                Trigger::InputChanged {
                    input: input.clone(),
                },
                self.state.input.as_ref() != Some(input),
            ),
            DeviceCommand::SetSurroundProgram(program) => (
                DeviceState {
                    surround_program: Some(program.clone()),
                    ..Default::default()
                },
                Trigger::SurroundProgramChanged {
                    surround_program: program.clone(),
                },
                self.state.surround_program.as_ref() != Some(program),
            ),
            _ => return,
        };

        self.state.merge(&update);
        self.emit_state();
        if changed {
            self.fire(trigger);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_state(&mut self, update: &DeviceState) {
        let mut update = update.clone();
        if let Some(max) = update.max_volume_raw {
            self.observe_max_volume(max);
        }
        if update.volume.is_none() {
            update.volume = update
                .volume_raw
                .zip(self.max_volume)
                .and_then(|(raw, max)| raw_to_percentile(raw, max));
        }

        let triggers = transitions(&self.state, &update);
        self.state.merge(&update);
        self.emit_state();
        for trigger in triggers {
            self.fire(trigger);
        }
    }

    fn observe_max_volume(&mut self, max: u32) {
        if max == 0 || self.max_volume == Some(max) {
            return;
        }
        self.max_volume = Some(max);
        self.platform
            .set_setting(&self.device_id, MAX_VOLUME_SETTING, json!(max));
    }

    fn emit_state(&mut self) {
        let state = self.state.clone();
        if let Some(power) = state.power {
            self.emit("onoff", power.into());
        }
        if let Some(volume) = state.volume {
            self.emit("volume_set", volume.into());
        }
        if let Some(muted) = state.muted {
            self.emit("volume_mute", muted.into());
        }
        if let Some(input) = state.input {
            self.emit("input_selected", CapabilityValue::Text(input));
        }
        if let Some(program) = state.surround_program {
            self.emit("surround_program", CapabilityValue::Text(program));
        }
        for option in SoundOption::ALL {
            if let Some(enabled) = option.read(&state.sound) {
                self.emit(option.capability(), enabled.into());
            }
        }
    }

    fn apply_play_info(&mut self, info: PlayInfo) {
        self.emit("speaker_playing", info.playing.into());
        self.emit("speaker_shuffle", info.shuffle.into());
        self.emit("speaker_artist", info.artist.clone().into());
        self.emit("speaker_album", info.album.clone().into());
        self.emit("speaker_track", info.track.clone().into());
        self.emit("album_art", info.album_art_url.clone().into());
        self.play_info = Some(info);
    }

    /// Sends a capability value unless the host already has it.
    fn emit(&mut self, capability: &'static str, value: CapabilityValue) {
        if !self.capabilities.contains(capability) {
            return;
        }
        if self.emitted.get(capability) == Some(&value) {
            return;
        }
        self.platform
            .emit_capability_change(&self.device_id, capability, value.clone());
        self.emitted.insert(capability, value);
    }

    fn fire(&self, trigger: Trigger) {
        log::info!("[Monitor] {} fired {}", self.device_id, trigger.name());
        self.platform.emit_trigger(&self.device_id, &trigger);
    }
}

/// Runs `work` unless `cancel` fires first. Returns false when cancelled.
async fn until_cancelled(cancel: &CancellationToken, work: impl Future<Output = ()>) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = work => true,
    }
}

/// Triggers implied by folding `update` into `previous`.
///
/// Only fields present on both sides can change.
fn transitions(previous: &DeviceState, update: &DeviceState) -> Vec<Trigger> {
    let mut triggers = Vec::new();

    if let (Some(was), Some(now)) = (previous.muted, update.muted) {
        if was != now {
            triggers.push(if now { Trigger::Muted } else { Trigger::Unmuted });
        }
    }
    if let (Some(was), Some(now)) = (&previous.input, &update.input) {
        if was != now {
            triggers.push(Trigger::InputChanged { input: now.clone() });
        }
    }
    if let (Some(was), Some(now)) = (&previous.surround_program, &update.surround_program) {
        if was != now {
            triggers.push(Trigger::SurroundProgramChanged {
                surround_program: now.clone(),
            });
        }
    }

    triggers
}
