// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the NAD receiver library.
//!
//! The hierarchy separates the failures a host cares about:
//!
//! - [`ValueError`]: an argument is outside what the receiver accepts
//!   (returned synchronously, nothing is written to the wire)
//! - [`ProtocolError`]: the connection could not be opened, was lost, or a
//!   write did not complete in time
//! - [`ParseError`]: a recognised status line carried an unusable value
//! - [`Error::UnsupportedCommand`]: the active dialect has no encoding for a
//!   command

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a received line.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The dialect has no line template for this command.
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    /// Receiver was not found in the manager.
    #[error("receiver not found")]
    DeviceNotFound,
}

impl Error {
    /// Returns `true` if the error came from the connection rather than the
    /// caller's input.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Errors related to value validation and constraints.
///
/// These errors are raised before anything is encoded, so a failing call
/// never touches the wire.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i32,
        /// Maximum allowed value.
        max: i32,
        /// The actual value that was provided.
        actual: i32,
    },

    /// A volume level fraction is outside `0.0..=1.0`.
    #[error("volume level {0} is out of range [0.0, 1.0]")]
    InvalidLevel(f32),

    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// The source name or number does not match any known input.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// A dialect key template does not fit its attribute.
    #[error("invalid key template: {0}")]
    InvalidTemplate(String),

    /// The minimum of a range is above its maximum.
    #[error("invalid range [{min}, {max}]")]
    InvalidRange {
        /// Requested minimum.
        min: i32,
        /// Requested maximum.
        max: i32,
    },
}

/// Errors related to the byte stream to the receiver.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The connection could not be established.
    #[error("failed to connect to {target}: {reason}")]
    ConnectionFailed {
        /// The serial path or `host:port` that was dialled.
        target: String,
        /// Description of the failure.
        reason: String,
    },

    /// The established connection dropped.
    #[error("connection lost")]
    ConnectionLost,

    /// Operation timed out.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Invalid host or serial device path.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The adapter has been torn down.
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to parsing receiver output and host configuration.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A recognised status line carried a value that cannot be interpreted.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// The status key, e.g. `Main.Volume`.
        key: String,
        /// The raw value text.
        value: String,
        /// Description of the parsing failure.
        reason: String,
    },
}

impl ParseError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
