// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-stream connectors.
//!
//! The codec and the state tracker never see the transport: everything
//! above this module works on a [`BoxedStream`]. A [`Connect`]
//! implementation opens one, either from a [`ConnectionConfig`] (serial
//! port or TCP socket) or from any custom source such as an in-memory
//! duplex pipe in tests.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::ProtocolError;
use crate::receiver::ConnectionConfig;

/// A bidirectional byte stream to a receiver.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Owned, type-erased byte stream.
pub type BoxedStream = Box<dyn ByteStream>;

/// Opens byte streams to a receiver.
///
/// The connection worker calls [`connect`](Self::connect) once at startup
/// and again for every reconnect attempt, so implementations must be
/// reusable.
pub trait Connect: Send + Sync + 'static {
    /// Opens a new stream.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` if the receiver cannot be
    /// reached.
    fn connect(&self) -> impl Future<Output = Result<BoxedStream, ProtocolError>> + Send;

    /// Describes the target for logs and errors, e.g. `192.168.1.60:23`.
    fn target(&self) -> String;
}

impl Connect for ConnectionConfig {
    async fn connect(&self) -> Result<BoxedStream, ProtocolError> {
        self.validate()?;

        match self {
            Self::Network { host, port } => {
                tracing::debug!(host = %host, port, "Opening TCP connection");
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(|e| ProtocolError::ConnectionFailed {
                        target: self.target(),
                        reason: e.to_string(),
                    })?;
                // Commands are a few bytes each; do not let Nagle hold them back
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
                }
                Ok(Box::new(stream))
            }
            Self::Serial { port, baud } => open_serial(port, *baud),
        }
    }

    fn target(&self) -> String {
        match self {
            Self::Network { host, port } => format!("{host}:{port}"),
            Self::Serial { port, baud } => format!("{port}@{baud}"),
        }
    }
}

#[cfg(feature = "serial")]
fn open_serial(path: &str, baud: u32) -> Result<BoxedStream, ProtocolError> {
    use tokio_serial::SerialPortBuilderExt;

    tracing::debug!(port = %path, baud, "Opening serial port");
    let stream = tokio_serial::new(path, baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| ProtocolError::ConnectionFailed {
            target: path.to_string(),
            reason: e.to_string(),
        })?;
    Ok(Box::new(stream))
}

#[cfg(not(feature = "serial"))]
fn open_serial(path: &str, _baud: u32) -> Result<BoxedStream, ProtocolError> {
    Err(ProtocolError::ConnectionFailed {
        target: path.to_string(),
        reason: "serial support is not enabled (feature \"serial\")".to_string(),
    })
}
