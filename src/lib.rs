// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `nad_simple` - A Rust library to control NAD receivers.
//!
//! The library speaks the NAD ASCII control protocol over an RS-232 serial
//! port or a TCP socket (the receiver's Telnet port). The receiver pushes a
//! `Key=Value` line whenever something changes, whether the change came from
//! this library, the front panel or the IR remote, so the state exposed here
//! always follows what the receiver reports.
//!
//! # Supported Features
//!
//! - **Power control**: On and standby
//! - **Input selection**: By number or by the name configured on the receiver
//! - **Volume**: In dB, as a host-level fraction, or in steps
//! - **Mute**
//! - **Device info**: Model, firmware version, enabled inputs and their names
//! - **Reconnection**: Automatic, with exponential backoff and resync
//!
//! # Quick Start
//!
//! ```no_run
//! use nad_simple::{ConnectionConfig, Receiver, ReceiverConfig};
//! use nad_simple::subscription::Subscribable;
//!
//! #[tokio::main]
//! async fn main() -> nad_simple::Result<()> {
//!     let receiver = Receiver::connect(ReceiverConfig::new(
//!         ConnectionConfig::network("192.168.1.60"),
//!     ))
//!     .await?;
//!
//!     receiver.on_volume_changed(|volume| println!("Volume: {volume}"));
//!     receiver.on_source_changed(|source| println!("Input: {source}"));
//!
//!     receiver.power_on().await?;
//!     receiver.select_source_by_name("Turntable").await?;
//!     receiver.set_volume_level(0.4).await?;
//!
//!     receiver.shutdown().await
//! }
//! ```
//!
//! ## Serial Connection
//!
//! ```no_run
//! use nad_simple::{ConnectionConfig, Receiver, ReceiverConfig};
//!
//! # async fn example() -> nad_simple::Result<()> {
//! let config = ReceiverConfig::new(ConnectionConfig::serial("/dev/ttyUSB0"));
//! let receiver = Receiver::connect(config).await?;
//!
//! for (source, name) in receiver.source_list() {
//!     println!("{source}: {name}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `serial` (default): serial port support through `tokio-serial`.

pub mod command;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod receiver;
pub mod state;
pub mod subscription;
pub mod types;

pub use command::{Attribute, AttributeKind, Command, Operator};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use event::{DeviceEvent, DeviceId};
pub use manager::ReceiverManager;
pub use protocol::{Codec, Connect, Dialect, DialectBuilder};
pub use receiver::{ConnectionConfig, Receiver, ReceiverConfig, ReconnectionPolicy};
pub use state::{DeviceState, Event};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{PowerState, SourceId, Volume, VolumeRange, VolumeScale};
