// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Management of several receivers.
//!
//! A single [`Receiver`](crate::Receiver) is enough for most hosts. The
//! [`ReceiverManager`] is for hosts driving several of them (one per room,
//! say) that want one event stream instead of one set of callbacks per
//! receiver.
//!
//! # Examples
//!
//! ```no_run
//! use nad_simple::event::DeviceEvent;
//! use nad_simple::manager::ReceiverManager;
//! use nad_simple::{ConnectionConfig, ReceiverConfig};
//!
//! # async fn example() -> nad_simple::Result<()> {
//! let manager = ReceiverManager::new();
//! let mut events = manager.subscribe();
//!
//! manager
//!     .add_receiver(ReceiverConfig::new(ConnectionConfig::network("192.168.1.60")))
//!     .await?;
//! manager
//!     .add_receiver(ReceiverConfig::new(ConnectionConfig::serial("/dev/ttyUSB0")))
//!     .await?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let DeviceEvent::StateChanged { device_id, new_state, .. } = event {
//!         println!("{device_id}: volume {:?}", new_state.volume());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod event_bus;
mod receiver_manager;

pub use receiver_manager::ReceiverManager;
