//! Centralized error types for the Yamaha core library.
//!
//! This module provides a unified error handling system that:
//! - Gives every module error a stable, machine-readable code
//! - Aggregates module errors into [`CoreError`]
//! - Maps errors to HTTP status codes for the event endpoint

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::push::PushError;
use crate::services::ServiceError;
use crate::yamaha::discovery::{DiscoveryError, Rejection};
use crate::yamaha::transport::ClientError;
use crate::yamaha::xml::XmlError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
        }
    }
}

impl ErrorCode for Rejection {
    fn code(&self) -> &'static str {
        Rejection::code(self)
    }
}

impl ErrorCode for XmlError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "xml_malformed",
            Self::Empty => "xml_empty",
            Self::MissingNode(_) => "xml_missing_node",
        }
    }
}

impl ErrorCode for ClientError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) if self.is_transient() => "device_unreachable",
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus { .. } => "http_error_status",
            Self::Xml(e) => e.code(),
            Self::Json(_) => "json_parse_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidSurroundProgram(_) => "invalid_surround_program",
            Self::InvalidZone(_) => "invalid_zone",
            Self::UnknownZoneMapping(_) => "unknown_zone_mapping",
            Self::InternalError => "device_internal_error",
            Self::InvalidRequest => "device_invalid_request",
            Self::InvalidParameter => "device_invalid_parameter",
            Self::GuardedError => "device_guarded",
            Self::AccessError => "device_access_denied",
            Self::ReadOnlyMode => "device_read_only",
            Self::UnexpectedResponseCode(_) => "unexpected_response_code",
            Self::Unsupported(_) => "unsupported_operation",
        }
    }
}

impl ErrorCode for PushError {
    fn code(&self) -> &'static str {
        match self {
            Self::Bind(_) => "push_bind_failed",
            Self::Json(_) => "unicast_parse_error",
            Self::Xml(e) => e.code(),
            Self::MissingDeviceId => "unicast_missing_device_id",
            Self::Http(_) => "http_request_failed",
            Self::SubscriptionFailed(_) => "upnp_subscription_failed",
            Self::MissingSid => "upnp_missing_sid",
        }
    }
}

impl ErrorCode for ServiceError {
    fn code(&self) -> &'static str {
        match self {
            Self::DeviceNotFound(_) => "device_not_found",
            Self::DeviceExists(_) => "device_exists",
            Self::DeviceStopped(_) => "device_stopped",
            Self::UnknownCapability(_) => "unknown_capability",
            Self::ReadOnlyCapability(_) => "read_only_capability",
            Self::InvalidValue { .. } => "invalid_value",
            Self::MissingSetting(_) => "missing_setting",
            Self::Client(e) => e.code(),
            Self::Push(e) => e.code(),
        }
    }
}

/// Application-wide error type for the Yamaha bridge.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CoreError {
    /// Device discovery failed (SSDP/network issues).
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// Request to a device failed.
    #[error("Device request failed: {0}")]
    Device(String),

    /// The device refused control, usually because it is in standby.
    #[error("{0}")]
    Guarded(String),

    /// Device is not paired or not running.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Push listener or subscription failure.
    #[error("Push error: {0}")]
    Push(String),

    /// Caller sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server configuration error (missing required settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::Device(_) => "device_error",
            Self::Guarded(_) => "device_guarded",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::Push(_) => "push_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Guarded(_) => StatusCode::CONFLICT,
            Self::Device(_) | Self::Push(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Discovery(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::push::PushResult;
pub use crate::services::ServiceResult;
pub use crate::yamaha::discovery::DiscoveryResult;
pub use crate::yamaha::transport::ClientResult;

/// Convenient Result alias for application-wide operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ClientError> for CoreError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            crate::yamaha::ErrorKind::Validation | crate::yamaha::ErrorKind::ZoneMapping => {
                Self::InvalidRequest(err.to_string())
            }
            crate::yamaha::ErrorKind::Guarded => Self::Guarded(err.to_string()),
            _ => Self::Device(err.to_string()),
        }
    }
}

impl From<PushError> for CoreError {
    fn from(err: PushError) -> Self {
        Self::Push(err.to_string())
    }
}

impl From<DiscoveryError> for CoreError {
    fn from(err: DiscoveryError) -> Self {
        Self::Discovery(err.to_string())
    }
}

impl From<ServiceError> for CoreError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Client(e) => e.into(),
            ServiceError::Push(e) => e.into(),
            ServiceError::DeviceNotFound(id) | ServiceError::DeviceStopped(id) => {
                Self::DeviceNotFound(id)
            }
            ServiceError::MissingSetting(_) => Self::Configuration(err.to_string()),
            other => Self::InvalidRequest(other.to_string()),
        }
    }
}
