// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Events published by the receiver manager.
//!
//! A [`ReceiverManager`](crate::manager::ReceiverManager) forwards the
//! lifecycle, connection and state notifications of every receiver it holds
//! as [`DeviceEvent`]s tagged with the receiver's [`DeviceId`]. Any number of
//! tasks can follow all receivers at once through
//! [`ReceiverManager::subscribe`](crate::manager::ReceiverManager::subscribe).
//!
//! # Examples
//!
//! ```
//! use nad_simple::event::{DeviceEvent, DeviceId};
//!
//! let device_id = DeviceId::new();
//! let event = DeviceEvent::disconnected(device_id);
//!
//! assert!(event.is_connection());
//! assert_eq!(event.device_id(), device_id);
//! ```

mod device_event;
mod device_id;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
