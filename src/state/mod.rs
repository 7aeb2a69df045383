// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver state management types.
//!
//! The [`DeviceState`] struct holds the last values the receiver reported.
//! It only ever changes by applying an [`Event`] decoded from a status line;
//! sending a command never updates it. The [`StateTracker`] owns one
//! `DeviceState`, publishes snapshots, and notifies subscribers when a value
//! actually changes.
//!
//! # Examples
//!
//! ```
//! use nad_simple::state::{DeviceState, Event};
//! use nad_simple::types::PowerState;
//!
//! let mut state = DeviceState::new();
//!
//! // Apply a power event pushed by the receiver
//! assert!(state.apply(&Event::PowerChanged(PowerState::On)));
//! assert_eq!(state.power(), Some(PowerState::On));
//!
//! // The same value again is not a change
//! assert!(!state.apply(&Event::PowerChanged(PowerState::On)));
//! ```

mod device_state;
mod event;
mod tracker;

pub use device_state::{DeviceState, SourceInfo};
pub use event::{Decoded, Event, Quality};
pub use tracker::StateTracker;
