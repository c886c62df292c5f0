//! Trait abstractions over the two protocol clients.
//!
//! The reconciler holds an `Arc<dyn ProtocolClient>` and never needs to know
//! which wire protocol sits behind it. Operations one protocol lacks have
//! default implementations that fail with [`ClientError::Unsupported`].

use async_trait::async_trait;

use super::transport::{ClientError, ClientResult};
use super::types::{DeviceState, PlayInfo, PlaybackAction, Protocol, SoundOption};

/// Reading device state.
#[async_trait]
pub trait DeviceStatus: Send + Sync {
    /// Fetches the current state snapshot.
    ///
    /// Also refreshes the client's cached selected input, which playback
    /// commands use to pick a zone.
    async fn get_state(&self) -> ClientResult<DeviceState>;

    /// Fetches now-playing information for the active source.
    async fn get_play_info(&self) -> ClientResult<PlayInfo>;
}

/// Changing device state.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    async fn set_power(&self, on: bool) -> ClientResult<()>;

    /// Sets the volume from a 0..100 percentile.
    async fn set_volume(&self, percentile: f64) -> ClientResult<()>;

    async fn set_muted(&self, muted: bool) -> ClientResult<()>;

    /// Selects an input. Validated before any request is sent.
    async fn set_input(&self, input: &str) -> ClientResult<()>;

    /// Selects a surround (sound) program. Validated before any request is sent.
    async fn set_surround_program(&self, program: &str) -> ClientResult<()>;

    async fn set_sound_option(&self, _option: SoundOption, _enabled: bool) -> ClientResult<()> {
        Err(ClientError::Unsupported("sound options"))
    }

    async fn volume_step(&self, _up: bool, _step: u32) -> ClientResult<()> {
        Err(ClientError::Unsupported("relative volume"))
    }
}

/// Transport control of the active playback source.
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    async fn playback(&self, action: PlaybackAction) -> ClientResult<()>;
}

/// Zone selection and identity.
#[async_trait]
pub trait ZoneControl: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Configured control zone.
    fn zone(&self) -> String;

    /// Switches the control zone after validating it.
    async fn set_zone(&self, zone: &str) -> ClientResult<()>;

    /// Human-readable device name as the device reports it.
    async fn device_name(&self) -> ClientResult<Option<String>>;

    /// Id the device stamps on unicast events, if it sends any.
    async fn network_id(&self) -> ClientResult<Option<String>> {
        Ok(None)
    }
}

/// Combined trait for everything the reconciler needs.
pub trait ProtocolClient: DeviceStatus + DeviceControl + PlaybackControl + ZoneControl {}

impl<T: DeviceStatus + DeviceControl + PlaybackControl + ZoneControl> ProtocolClient for T {}
