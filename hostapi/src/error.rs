//! Host-side error types.
//!
//! `HostError` is the error currency of the handle plane. Guests only ever
//! see the `XqdStatus` code; the `Internal` variant carries a descriptive
//! message for host-side debugging and maps to the generic error code.

use std::fmt;

use crate::status::XqdStatus;

/// Host-side error returned by handle-plane operations.
#[derive(Debug, Clone)]
pub enum HostError {
    /// A wire-defined status code.
    Status(XqdStatus),
    /// An internal host error with no dedicated status code.
    /// Returned to the guest as the generic `XQD_ERROR` (1).
    Internal(String),
}

impl HostError {
    /// Convert to the status code returned to the WASM guest.
    pub fn to_status(&self) -> XqdStatus {
        match self {
            Self::Status(status) => *status,
            Self::Internal(_) => XqdStatus::Error,
        }
    }

    /// The `i32` form of [`to_status`](HostError::to_status).
    pub fn to_i32(&self) -> i32 {
        self.to_status().as_i32()
    }

    pub fn invalid_handle() -> Self {
        Self::Status(XqdStatus::InvalidHandle)
    }

    pub fn invalid_argument() -> Self {
        Self::Status(XqdStatus::InvalidArgument)
    }

    pub fn buffer_length() -> Self {
        Self::Status(XqdStatus::BufferLength)
    }

    pub fn unsupported() -> Self {
        Self::Status(XqdStatus::Unsupported)
    }

    pub fn http_parse() -> Self {
        Self::Status(XqdStatus::HttpParse)
    }

    pub fn http_user_invalid() -> Self {
        Self::Status(XqdStatus::HttpUserInvalid)
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "host error: {}", status),
            Self::Internal(msg) => write!(f, "internal host error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<XqdStatus> for HostError {
    fn from(status: XqdStatus) -> Self {
        Self::Status(status)
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
