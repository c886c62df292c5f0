//! Application services layer.
//!
//! Orchestrates the protocol clients (`yamaha/`) and push listeners (`push/`)
//! on behalf of the host platform:
//! - [`capabilities`] - versioned capability sets and their migration
//! - [`device_monitor`] - one reconciliation task per device
//! - [`device_manager`] - registry of running monitors

pub mod capabilities;
pub mod device_manager;
pub mod device_monitor;

#[cfg(test)]
pub(crate) mod test_support;

use serde_json::Value;
use thiserror::Error;

use crate::push::PushError;
use crate::yamaha::transport::ClientError;

pub use capabilities::{CapabilitySet, Migration};
pub use device_manager::{DeviceManager, DeviceSettings};
pub use device_monitor::{AvailabilityState, DeviceCommand, DeviceHandle, DeviceMonitor};

/// Errors from device management and host commands.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already added: {0}")]
    DeviceExists(String),

    #[error("Device {0} has stopped")]
    DeviceStopped(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability {0} cannot be set")]
    ReadOnlyCapability(String),

    #[error("Invalid value for {capability}: {value}")]
    InvalidValue { capability: String, value: Value },

    #[error("Missing device setting: {0}")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Push(#[from] PushError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
