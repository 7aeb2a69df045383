// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Authoritative last-known state of one receiver.

use std::sync::Arc;

use tokio::sync::watch;

use crate::command::{Attribute, Command};
use crate::subscription::CallbackRegistry;

use super::{Decoded, DeviceState, Event, Quality};

/// Attributes re-queried after every (re)connect.
const LIVE_ATTRIBUTES: [Attribute; 4] = [
    Attribute::Power,
    Attribute::Volume,
    Attribute::Mute,
    Attribute::Source,
];

/// Owns the [`DeviceState`] of one receiver.
///
/// The connection worker is the only caller, so the state itself needs no
/// lock. Readers get snapshots through [`watch`](Self::watch); subscribers
/// are notified through the shared [`CallbackRegistry`] only when a value
/// actually changes.
pub struct StateTracker {
    state: DeviceState,
    callbacks: Arc<CallbackRegistry>,
    state_tx: watch::Sender<DeviceState>,
}

impl StateTracker {
    /// Creates a tracker with all fields unknown.
    #[must_use]
    pub fn new(callbacks: Arc<CallbackRegistry>) -> Self {
        let state = DeviceState::new();
        let (state_tx, _) = watch::channel(state.clone());
        Self {
            state,
            callbacks,
            state_tx,
        }
    }

    /// Creates a watch receiver for state snapshots.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    /// Returns a reference to the current state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> DeviceState {
        self.state.clone()
    }

    /// Returns the callback registry notifications go to.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Applies a decoded line.
    ///
    /// Returns `true` if the state changed. Subscribers are notified once
    /// per change; a repeated value produces no notification.
    pub fn apply(&mut self, decoded: &Decoded) -> bool {
        if let Quality::Clamped { reported } = decoded.quality {
            tracing::warn!(
                reported,
                event = ?decoded.event,
                "Receiver reported a volume outside the supported range, clamped"
            );
        }
        self.apply_event(&decoded.event)
    }

    /// Applies a single event.
    ///
    /// Returns `true` if the state changed.
    pub fn apply_event(&mut self, event: &Event) -> bool {
        if !self.state.apply(event) {
            tracing::trace!(?event, "Status unchanged");
            return false;
        }

        tracing::debug!(?event, "State changed");
        self.publish();
        self.callbacks.dispatch(event);
        true
    }

    /// Marks power, source, volume and mute as unknown.
    ///
    /// Returns `true` if anything was known before. Reset subscribers are
    /// only notified in that case.
    pub fn invalidate(&mut self) -> bool {
        if !self.state.invalidate() {
            return false;
        }

        tracing::debug!("State invalidated");
        self.publish();
        self.callbacks.dispatch_reset();
        true
    }

    /// Invalidates the state and returns the queries that refresh it.
    ///
    /// Called after every reconnect so no value survives a connection gap
    /// unconfirmed.
    pub fn resync(&mut self) -> Vec<Command> {
        self.invalidate();
        LIVE_ATTRIBUTES.into_iter().map(Command::query).collect()
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("state", &self.state)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}
