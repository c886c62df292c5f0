//! Client error taxonomy shared by both protocol clients.

use std::io;

use thiserror::Error;

use super::xml::XmlError;

/// Broad classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection-level failure that is expected to clear up on its own.
    NetworkTransient,
    /// The device answered, but not with something usable.
    Protocol,
    /// A value was rejected before any network call.
    Validation,
    /// The device refused control (usually because it is in standby).
    Guarded,
    /// The selected input has no known zone.
    ZoneMapping,
    /// The operation does not exist for this protocol.
    Unsupported,
}

/// Errors from the legacy and extended protocol clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid XML response: {0}")]
    Xml(#[from] XmlError),

    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid source \"{0}\"")]
    InvalidInput(String),

    #[error("Invalid surround program \"{0}\"")]
    InvalidSurroundProgram(String),

    #[error("Invalid zone \"{0}\"")]
    InvalidZone(String),

    #[error("Could not find zone by input [{0}]")]
    UnknownZoneMapping(String),

    #[error("Device reported an internal error")]
    InternalError,

    #[error("Device rejected the request as invalid")]
    InvalidRequest,

    #[error("Device rejected a request parameter")]
    InvalidParameter,

    #[error("Unable to control the device, maybe it's turned off?")]
    GuardedError,

    #[error("Device denied access")]
    AccessError,

    #[error("Device is in read-only mode")]
    ReadOnlyMode,

    #[error("Invalid response, code {0}")]
    UnexpectedResponseCode(i64),

    #[error("{0} is not supported by this protocol")]
    Unsupported(&'static str),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Maps an extended control `response_code` to an error.
    ///
    /// Returns `None` for 0 (success).
    #[must_use]
    pub fn from_response_code(code: i64) -> Option<Self> {
        match code {
            0 => None,
            2 => Some(Self::InternalError),
            3 => Some(Self::InvalidRequest),
            4 => Some(Self::InvalidParameter),
            5 => Some(Self::GuardedError),
            100 => Some(Self::AccessError),
            110 => Some(Self::ReadOnlyMode),
            other => Some(Self::UnexpectedResponseCode(other)),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if is_transient_http(e) => ErrorKind::NetworkTransient,
            Self::Http(_)
            | Self::HttpStatus { .. }
            | Self::Xml(_)
            | Self::Json(_)
            | Self::InternalError
            | Self::InvalidRequest
            | Self::InvalidParameter
            | Self::AccessError
            | Self::ReadOnlyMode
            | Self::UnexpectedResponseCode(_) => ErrorKind::Protocol,
            Self::InvalidInput(_) | Self::InvalidSurroundProgram(_) | Self::InvalidZone(_) => {
                ErrorKind::Validation
            }
            Self::GuardedError => ErrorKind::Guarded,
            Self::UnknownZoneMapping(_) => ErrorKind::ZoneMapping,
            Self::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Returns true for connection-level failures (refused, reset, timeout).
    ///
    /// These are logged and retried by the poll loop but never reported to the
    /// host as faults.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::NetworkTransient
    }
}

fn is_transient_http(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || has_transient_io_source(err)
}

fn has_transient_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::TimedOut
            );
        }
        source = e.source();
    }
    false
}

/// Trims leading and trailing slashes.
pub(crate) fn trim_slashes(value: &str) -> &str {
    value.trim_matches('/')
}

/// Joins a URL base and path segments with single slashes.
pub(crate) fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = trim_slashes(segment);
        if !segment.is_empty() {
            url.push('/');
            url.push_str(segment);
        }
    }
    url
}
