// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire protocol and transport for NAD receivers.
//!
//! NAD receivers speak the same line-oriented text protocol over RS-232 and
//! over their telnet port. This module provides:
//!
//! - [`Dialect`]: the data table between attributes and wire keys
//! - [`Codec`]: encoding of commands and decoding of status lines
//! - [`LineFramer`]: splitting of the received byte stream into lines
//! - [`Connect`]: opening a byte stream, implemented for
//!   [`ConnectionConfig`](crate::ConnectionConfig) (serial and TCP)
//!
//! The connection worker that ties these together is internal; it is driven
//! through [`Receiver`](crate::Receiver).

mod codec;
pub(crate) mod connection;
mod dialect;
mod framer;
mod transport;

pub use codec::Codec;
pub use dialect::{Dialect, DialectBuilder, NAD_SOURCE_COUNT};
pub use framer::{LineFramer, MAX_LINE_LEN};
pub use transport::{BoxedStream, ByteStream, Connect};
