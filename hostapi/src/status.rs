//! ABI status and HTTP version codes.
//!
//! Every host function returns one of these status values to the guest as a
//! 32-bit signed integer. The numbering is part of the wire contract and must
//! not change.

use std::fmt;

/// Status code returned from every ABI method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum XqdStatus {
    Ok = 0,
    Error = 1,
    InvalidArgument = 2,
    InvalidHandle = 3,
    BufferLength = 4,
    Unsupported = 5,
    BadAlignment = 6,
    HttpParse = 7,
    HttpUserInvalid = 8,
    HttpIncomplete = 9,
}

impl XqdStatus {
    /// The `i32` value handed back to the WASM guest.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for XqdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "XQD_OK",
            Self::Error => "XQD_ERROR",
            Self::InvalidArgument => "XQD_ERR_INVALID_ARGUMENT",
            Self::InvalidHandle => "XQD_ERR_INVALID_HANDLE",
            Self::BufferLength => "XQD_ERR_BUFFER_LENGTH",
            Self::Unsupported => "XQD_ERR_UNSUPPORTED",
            Self::BadAlignment => "XQD_ERR_BAD_ALIGNMENT",
            Self::HttpParse => "XQD_ERR_HTTP_PARSE",
            Self::HttpUserInvalid => "XQD_ERR_HTTP_USER_INVALID",
            Self::HttpIncomplete => "XQD_ERR_HTTP_INCOMPLETE",
        };
        f.write_str(name)
    }
}

/// HTTP version codes as exchanged over the ABI.
///
/// Only HTTP/1.1 is accepted by the `version_set` calls; the `version_get`
/// calls always report HTTP/1.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum HttpVersion {
    Http09 = 0,
    Http10 = 1,
    Http11 = 2,
    Http2 = 3,
    Http3 = 4,
}

impl HttpVersion {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Http09),
            1 => Some(Self::Http10),
            2 => Some(Self::Http11),
            3 => Some(Self::Http2),
            4 => Some(Self::Http3),
            _ => None,
        }
    }
}
