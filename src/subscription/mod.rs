// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for receiver state changes.
//!
//! Receivers push status lines whenever something changes on the device,
//! so the library never polls. Every change that reaches the
//! [`StateTracker`](crate::state::StateTracker) is forwarded to the
//! callbacks registered here.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a subscription, used to unsubscribe
//! - [`CallbackRegistry`] - Registry that manages callbacks and dispatches events
//! - [`Subscribable`] - Trait for types that support event subscriptions
//!
//! # Usage
//!
//! ```no_run
//! use nad_simple::{ConnectionConfig, Receiver, ReceiverConfig};
//! use nad_simple::subscription::Subscribable;
//!
//! # async fn example() -> nad_simple::Result<()> {
//! let config = ReceiverConfig::new(ConnectionConfig::network("192.168.1.60"));
//! let receiver = Receiver::connect(config).await?;
//!
//! let sub_id = receiver.on_volume_changed(|volume| {
//!     println!("Volume is now {volume} dB");
//! });
//!
//! // Later, unsubscribe
//! receiver.unsubscribe(sub_id);
//! # Ok(())
//! # }
//! ```

mod callback;
mod subscribable;

pub use callback::{CallbackRegistry, SubscriptionId};
pub use subscribable::Subscribable;
