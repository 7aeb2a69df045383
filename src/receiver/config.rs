// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ProtocolError};
use crate::protocol::Dialect;
use crate::types::VolumeScale;

use super::ReconnectionPolicy;

/// Default TCP port of the NAD telnet interface.
pub const DEFAULT_NETWORK_PORT: u16 = 23;

/// Default baud rate of the NAD RS-232 interface.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// How to reach a receiver.
///
/// # Examples
///
/// ```
/// use nad_simple::ConnectionConfig;
///
/// let telnet = ConnectionConfig::network("192.168.1.60");
/// let serial = ConnectionConfig::serial("/dev/ttyUSB0").with_baud(9600);
///
/// let parsed = ConnectionConfig::from_json(r#"{"type":"network","host":"nad.local","port":23}"#).unwrap();
/// assert_eq!(parsed, ConnectionConfig::network("nad.local"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// RS-232 connection.
    Serial {
        /// Serial device path (e.g. `/dev/ttyUSB0` or `COM3`).
        port: String,
        /// Baud rate.
        #[serde(default = "default_baud")]
        baud: u32,
    },
    /// Telnet-style TCP connection.
    Network {
        /// Host name or IP address.
        host: String,
        /// TCP port.
        #[serde(default = "default_port")]
        port: u16,
    },
}

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_port() -> u16 {
    DEFAULT_NETWORK_PORT
}

impl ConnectionConfig {
    /// Creates a serial configuration at 115200 baud.
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::Serial {
            port: port.into(),
            baud: DEFAULT_BAUD_RATE,
        }
    }

    /// Creates a network configuration on port 23.
    #[must_use]
    pub fn network(host: impl Into<String>) -> Self {
        Self::Network {
            host: host.into(),
            port: DEFAULT_NETWORK_PORT,
        }
    }

    /// Sets the TCP port.
    ///
    /// Only applicable for network connections.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        if let Self::Network { port: p, .. } = &mut self {
            *p = port;
        }
        self
    }

    /// Sets the baud rate.
    ///
    /// Only applicable for serial connections.
    #[must_use]
    pub fn with_baud(mut self, baud: u32) -> Self {
        if let Self::Serial { baud: b, .. } = &mut self {
            *b = baud;
        }
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Json` if the text is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns true if this is a serial connection.
    #[must_use]
    pub fn is_serial(&self) -> bool {
        matches!(self, Self::Serial { .. })
    }

    /// Returns true if this is a network connection.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Checks the configuration before a connection attempt.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidAddress` for an empty host or serial
    /// path, a zero port, or a zero baud rate.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Network { host, port } => {
                if host.trim().is_empty() {
                    return Err(ProtocolError::InvalidAddress("empty host".to_string()));
                }
                if *port == 0 {
                    return Err(ProtocolError::InvalidAddress(format!("{host}: port 0")));
                }
            }
            Self::Serial { port, baud } => {
                if port.trim().is_empty() {
                    return Err(ProtocolError::InvalidAddress(
                        "empty serial port".to_string(),
                    ));
                }
                if *baud == 0 {
                    return Err(ProtocolError::InvalidAddress(format!("{port}: baud 0")));
                }
            }
        }
        Ok(())
    }
}

/// Configuration of one receiver adapter.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nad_simple::{ConnectionConfig, ReceiverConfig, ReconnectionPolicy};
///
/// let config = ReceiverConfig::new(ConnectionConfig::network("192.168.1.60"))
///     .with_stale_after(Duration::from_secs(10))
///     .with_reconnection(ReconnectionPolicy::new().with_max_retries(5));
/// ```
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// The connection configuration.
    pub connection: ConnectionConfig,
    /// Receiver vocabulary and limits.
    pub dialect: Dialect,
    /// Reconnection policy.
    pub reconnection: ReconnectionPolicy,
    /// Connection gap after which cached values are reset to unknown.
    pub stale_after: Duration,
    /// Upper bound for opening the connection.
    pub connect_timeout: Duration,
    /// Upper bound for writing one command.
    pub write_timeout: Duration,
    /// Upper bound for [`Receiver::shutdown`](super::Receiver::shutdown).
    pub shutdown_timeout: Duration,
    /// Mapping between dB and host volume levels.
    pub volume_scale: VolumeScale,
}

impl ReceiverConfig {
    /// Default staleness threshold.
    pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5);
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default write timeout.
    pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default teardown timeout.
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a configuration with the NAD dialect and default timings.
    #[must_use]
    pub fn new(connection: ConnectionConfig) -> Self {
        Self {
            connection,
            dialect: Dialect::nad(),
            reconnection: ReconnectionPolicy::default(),
            stale_after: Self::DEFAULT_STALE_AFTER,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            write_timeout: Self::DEFAULT_WRITE_TIMEOUT,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
            volume_scale: VolumeScale::default(),
        }
    }

    /// Sets the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the staleness threshold.
    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the write timeout.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets the teardown timeout.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the host volume scale.
    #[must_use]
    pub fn with_volume_scale(mut self, scale: VolumeScale) -> Self {
        self.volume_scale = scale;
        self
    }
}

impl From<ConnectionConfig> for ReceiverConfig {
    fn from(connection: ConnectionConfig) -> Self {
        Self::new(connection)
    }
}
