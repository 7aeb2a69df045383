// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that support event subscriptions.

use crate::state::{DeviceState, Event};
use crate::subscription::{CallbackRegistry, SubscriptionId};
use crate::types::{PowerState, SourceId, Volume};

/// Trait for types that support event subscriptions.
///
/// Implementors only provide [`callbacks`](Self::callbacks); every
/// subscription method forwards to that registry.
pub trait Subscribable {
    /// Returns the registry callbacks are stored in.
    fn callbacks(&self) -> &CallbackRegistry;

    /// Subscribes to power state changes.
    fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        self.callbacks().on_power_changed(callback)
    }

    /// Subscribes to input changes.
    fn on_source_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(SourceId) + Send + Sync + 'static,
    {
        self.callbacks().on_source_changed(callback)
    }

    /// Subscribes to volume changes.
    fn on_volume_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Volume) + Send + Sync + 'static,
    {
        self.callbacks().on_volume_changed(callback)
    }

    /// Subscribes to mute changes.
    fn on_mute_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.callbacks().on_mute_changed(callback)
    }

    /// Subscribes to all state changes.
    ///
    /// The callback receives every event that changed the state.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.callbacks().on_state_changed(callback)
    }

    /// Subscribes to reconnection events.
    ///
    /// Called after the connection is re-established following a loss. The
    /// state passed in has already been reset; fresh values follow as the
    /// receiver answers the resync queries.
    fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        self.callbacks().on_connected(callback)
    }

    /// Subscribes to disconnection events.
    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks().on_disconnected(callback)
    }

    /// Subscribes to state resets.
    ///
    /// Called when power, source, volume and mute become unknown, either
    /// after a reconnect or when a connection gap outlasts the staleness
    /// threshold.
    fn on_state_reset<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.callbacks().on_state_reset(callback)
    }

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks().unsubscribe(id)
    }
}
