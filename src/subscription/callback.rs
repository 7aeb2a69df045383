// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for receiver state subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::{DeviceState, Event};
use crate::types::{PowerState, SourceId, Volume};

/// Unique identifier for a subscription.
///
/// This ID is returned when creating a subscription and can be used to
/// unsubscribe later. IDs are unique within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type PowerCallback = Arc<dyn Fn(PowerState) + Send + Sync>;
type SourceCallback = Arc<dyn Fn(SourceId) + Send + Sync>;
type VolumeCallback = Arc<dyn Fn(Volume) + Send + Sync>;
type MuteCallback = Arc<dyn Fn(bool) + Send + Sync>;
type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Type alias for connected callbacks (receives the state at connect time).
type ConnectedCallback = Arc<dyn Fn(&DeviceState) + Send + Sync>;

/// Type alias for callbacks without arguments (disconnected, reset).
type SignalCallback = Arc<dyn Fn() + Send + Sync>;

/// Registry for managing receiver subscription callbacks.
///
/// Callbacks are invoked synchronously on the task that owns the read loop,
/// so they must not block. Hosts running on another scheduler should forward
/// from the callback into a channel.
///
/// # Thread Safety
///
/// The registry uses `parking_lot::RwLock` and can be shared between tasks.
/// Callbacks are wrapped in `Arc` so they can be cloned cheaply.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    power_callbacks: RwLock<HashMap<SubscriptionId, PowerCallback>>,
    source_callbacks: RwLock<HashMap<SubscriptionId, SourceCallback>>,
    volume_callbacks: RwLock<HashMap<SubscriptionId, VolumeCallback>>,
    mute_callbacks: RwLock<HashMap<SubscriptionId, MuteCallback>>,
    /// Generic callbacks (receive every applied event).
    event_callbacks: RwLock<HashMap<SubscriptionId, EventCallback>>,
    connected_callbacks: RwLock<HashMap<SubscriptionId, ConnectedCallback>>,
    disconnected_callbacks: RwLock<HashMap<SubscriptionId, SignalCallback>>,
    /// Called when power, source, volume and mute become unknown.
    reset_callbacks: RwLock<HashMap<SubscriptionId, SignalCallback>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            power_callbacks: RwLock::new(HashMap::new()),
            source_callbacks: RwLock::new(HashMap::new()),
            volume_callbacks: RwLock::new(HashMap::new()),
            mute_callbacks: RwLock::new(HashMap::new()),
            event_callbacks: RwLock::new(HashMap::new()),
            connected_callbacks: RwLock::new(HashMap::new()),
            disconnected_callbacks: RwLock::new(HashMap::new()),
            reset_callbacks: RwLock::new(HashMap::new()),
        }
    }

    /// Generates a new unique subscription ID.
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration methods
    // =========================================================================

    /// Registers a callback for power state changes.
    pub fn on_power_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PowerState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.power_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for input changes.
    pub fn on_source_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(SourceId) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.source_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for volume changes.
    pub fn on_volume_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Volume) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.volume_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for mute changes.
    pub fn on_mute_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.mute_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for every applied event.
    ///
    /// This also receives device information (model, version, inputs).
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.event_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for when the connection is re-established.
    pub fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connected_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for when the connection drops.
    pub fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.disconnected_callbacks
            .write()
            .insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for when the live attributes become unknown.
    pub fn on_state_reset<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.reset_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    // =========================================================================
    // Unsubscription
    // =========================================================================

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.power_callbacks.write().remove(&id).is_some()
            || self.source_callbacks.write().remove(&id).is_some()
            || self.volume_callbacks.write().remove(&id).is_some()
            || self.mute_callbacks.write().remove(&id).is_some()
            || self.event_callbacks.write().remove(&id).is_some()
            || self.connected_callbacks.write().remove(&id).is_some()
            || self.disconnected_callbacks.write().remove(&id).is_some()
            || self.reset_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.power_callbacks.write().clear();
        self.source_callbacks.write().clear();
        self.volume_callbacks.write().clear();
        self.mute_callbacks.write().clear();
        self.event_callbacks.write().clear();
        self.connected_callbacks.write().clear();
        self.disconnected_callbacks.write().clear();
        self.reset_callbacks.write().clear();
    }

    // =========================================================================
    // Dispatch methods
    // =========================================================================

    /// Dispatches an applied event to the relevant callbacks.
    ///
    /// Callbacks are cloned out of the lock before being called, so a
    /// callback may subscribe or unsubscribe without deadlocking.
    pub fn dispatch(&self, event: &Event) {
        let generic: Vec<EventCallback> = self.event_callbacks.read().values().cloned().collect();
        for callback in generic {
            callback(event);
        }

        match event {
            Event::PowerChanged(state) => {
                let callbacks: Vec<_> = self.power_callbacks.read().values().cloned().collect();
                for callback in callbacks {
                    callback(*state);
                }
            }
            Event::SourceChanged(id) => {
                let callbacks: Vec<_> = self.source_callbacks.read().values().cloned().collect();
                for callback in callbacks {
                    callback(*id);
                }
            }
            Event::VolumeChanged(volume) => {
                let callbacks: Vec<_> = self.volume_callbacks.read().values().cloned().collect();
                for callback in callbacks {
                    callback(*volume);
                }
            }
            Event::MuteChanged(muted) => {
                let callbacks: Vec<_> = self.mute_callbacks.read().values().cloned().collect();
                for callback in callbacks {
                    callback(*muted);
                }
            }
            Event::ModelReported(_)
            | Event::VersionReported(_)
            | Event::SourceEnabledReported { .. }
            | Event::SourceNameReported { .. } => {}
        }
    }

    /// Dispatches the connected event with the current state.
    pub fn dispatch_connected(&self, state: &DeviceState) {
        let callbacks: Vec<_> = self.connected_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback(state);
        }
    }

    /// Dispatches the disconnected event.
    pub fn dispatch_disconnected(&self) {
        let callbacks: Vec<_> = self
            .disconnected_callbacks
            .read()
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Dispatches the state reset event.
    pub fn dispatch_reset(&self) {
        let callbacks: Vec<_> = self.reset_callbacks.read().values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.power_callbacks.read().len()
            + self.source_callbacks.read().len()
            + self.volume_callbacks.read().len()
            + self.mute_callbacks.read().len()
            + self.event_callbacks.read().len()
            + self.connected_callbacks.read().len()
            + self.disconnected_callbacks.read().len()
            + self.reset_callbacks.read().len()
    }

    /// Returns `true` if there are no registered callbacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VolumeRange;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn subscription_id_display() {
        let id = SubscriptionId::new(42);
        assert_eq!(id.to_string(), "Sub(42)");
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.callback_count(), 0);
    }

    #[test]
    fn registry_power_callback() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let id = registry.on_power_changed(move |_state| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(registry.callback_count(), 1);

        registry.dispatch(&Event::PowerChanged(PowerState::On));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        assert!(registry.is_empty());

        // Dispatch again - counter should not change
        registry.dispatch(&Event::PowerChanged(PowerState::Off));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_volume_callback_receives_value() {
        let registry = CallbackRegistry::new();
        let received = Arc::new(RwLock::new(None::<Volume>));
        let received_clone = received.clone();

        registry.on_volume_changed(move |volume| {
            *received_clone.write() = Some(volume);
        });

        let volume = VolumeRange::NAD.check(-42).unwrap();
        registry.dispatch(&Event::VolumeChanged(volume));

        assert_eq!(*received.read(), Some(volume));
    }

    #[test]
    fn specific_callbacks_ignore_other_attributes() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        registry.on_source_changed(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&Event::PowerChanged(PowerState::On));
        registry.dispatch(&Event::MuteChanged(true));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        registry.dispatch(&Event::SourceChanged(SourceId::new(2).unwrap()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_state_changed_callback() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        registry.on_state_changed(move |_event| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&Event::PowerChanged(PowerState::On));
        registry.dispatch(&Event::MuteChanged(false));
        registry.dispatch(&Event::ModelReported("T758".to_string()));

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let slot = Arc::new(RwLock::new(None::<SubscriptionId>));

        let registry_clone = registry.clone();
        let slot_clone = slot.clone();
        let id = registry.on_mute_changed(move |_| {
            if let Some(id) = *slot_clone.read() {
                registry_clone.unsubscribe(id);
            }
        });
        *slot.write() = Some(id);

        registry.dispatch(&Event::MuteChanged(true));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_unsubscribe_nonexistent() {
        let registry = CallbackRegistry::new();
        assert!(!registry.unsubscribe(SubscriptionId::new(999)));
    }

    #[test]
    fn registry_clear() {
        let registry = CallbackRegistry::new();

        registry.on_power_changed(|_| {});
        registry.on_volume_changed(|_| {});
        registry.on_connected(|_| {});
        registry.on_state_reset(|| {});

        assert_eq!(registry.callback_count(), 4);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_connection_callbacks() {
        let registry = CallbackRegistry::new();
        let connected = Arc::new(AtomicU32::new(0));
        let disconnected = Arc::new(AtomicU32::new(0));
        let reset = Arc::new(AtomicU32::new(0));

        let c = connected.clone();
        registry.on_connected(move |_state| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let d = disconnected.clone();
        registry.on_disconnected(move || {
            d.fetch_add(1, Ordering::SeqCst);
        });
        let r = reset.clone();
        registry.on_state_reset(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch_connected(&DeviceState::new());
        registry.dispatch_disconnected();
        registry.dispatch_reset();

        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
        assert_eq!(reset.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_unique_ids() {
        let registry = CallbackRegistry::new();

        let id1 = registry.on_power_changed(|_| {});
        let id2 = registry.on_source_changed(|_| {});
        let id3 = registry.on_connected(|_| {});

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}
