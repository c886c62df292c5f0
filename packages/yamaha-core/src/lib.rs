//! Yamaha Core - shared library for the Yamaha bridge.
//!
//! This crate talks to Yamaha AV receivers (XML Remote Control protocol) and
//! MusicCast devices (JSON Extended Control protocol), discovers them on the
//! LAN, receives their push events and reconciles each device's state into a
//! host platform's capability model.
//!
//! # Architecture
//!
//! - [`yamaha`]: protocol clients, value registries, XML codec and discovery
//! - [`push`]: unicast and UPnP event ingress, dispatch registry, subscriptions
//! - [`services`]: per-device reconciliation and the device manager
//! - [`events`]: the [`HostPlatform`] boundary the core reports through
//! - [`api`]: HTTP endpoint receiving UPnP NOTIFY requests
//! - [`context`]: callback address detection and URL building
//! - [`state`]: runtime configuration
//! - [`bootstrap`]: composition root
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`ProtocolClient`](yamaha::ProtocolClient): one client per device protocol
//! - [`HostPlatform`](events::HostPlatform): capability, trigger and settings
//!   sink of the host
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning background tasks
//! - [`IpDetector`](context::IpDetector): local IP detection

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod context;
pub mod error;
pub mod events;
pub mod protocol_constants;
pub mod push;
pub mod runtime;
pub mod services;
pub mod state;
pub mod yamaha;

// Re-export commonly used types at the crate root
pub use context::{IpDetector, LocalIpDetector, NetworkContext, NetworkError, UrlBuilder};
pub use error::{
    ClientResult, CoreError, CoreResult, DiscoveryResult, ErrorCode, PushResult, ServiceResult,
};
pub use events::{CapabilityValue, HostPlatform, LoggingPlatform, NoopPlatform, Trigger};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

// Re-export protocol types
pub use yamaha::discovery::{PairingCandidate, PairingRecord, Rejection};
pub use yamaha::{
    ClientError, ConnectionEndpoint, DeviceState, PlayInfo, PlaybackAction, Protocol,
    ProtocolClient,
};

// Re-export service types
pub use services::{DeviceCommand, DeviceHandle, DeviceManager, ServiceError};

// Re-export push types
pub use push::{DeviceRegistry, PushError, PushEvent};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, bootstrap_services_with_network, BootstrappedServices};

// Re-export API types
pub use api::{AppState, ServerError};
