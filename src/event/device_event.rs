// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver event types.

use serde::{Deserialize, Serialize};

use crate::state::{DeviceState, Event};

use super::DeviceId;

/// Events emitted by the receiver manager.
///
/// Every event carries the id of the receiver it concerns.
///
/// # Examples
///
/// ```
/// use nad_simple::event::{DeviceId, DeviceEvent};
/// use nad_simple::state::{DeviceState, Event};
/// use nad_simple::types::PowerState;
///
/// let device_id = DeviceId::new();
///
/// let added = DeviceEvent::DeviceAdded { device_id };
/// assert!(added.is_lifecycle());
///
/// let mut state = DeviceState::new();
/// let event = Event::PowerChanged(PowerState::On);
/// state.apply(&event);
///
/// let changed = DeviceEvent::state_changed(device_id, event, state);
/// assert!(changed.is_state_change());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// A receiver was added to the manager.
    DeviceAdded {
        /// The ID of the added receiver.
        device_id: DeviceId,
    },

    /// A receiver was removed from the manager and shut down.
    DeviceRemoved {
        /// The ID of the removed receiver.
        device_id: DeviceId,
    },

    /// The connection was lost or re-established.
    ConnectionChanged {
        /// The ID of the receiver.
        device_id: DeviceId,
        /// Whether the receiver is now connected.
        connected: bool,
    },

    /// The receiver reported a value different from the last known one.
    StateChanged {
        /// The ID of the receiver.
        device_id: DeviceId,
        /// The value that changed.
        event: Event,
        /// The complete state after applying the change.
        new_state: DeviceState,
    },

    /// Power, source, volume and mute became unknown, either after a
    /// reconnect or because the connection stayed down too long.
    StateReset {
        /// The ID of the receiver.
        device_id: DeviceId,
    },
}

impl DeviceEvent {
    /// Returns the receiver ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        match self {
            Self::DeviceAdded { device_id }
            | Self::DeviceRemoved { device_id }
            | Self::ConnectionChanged { device_id, .. }
            | Self::StateChanged { device_id, .. }
            | Self::StateReset { device_id } => *device_id,
        }
    }

    /// Returns `true` if this is a lifecycle event (added/removed).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::DeviceAdded { .. } | Self::DeviceRemoved { .. })
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` if this is a state change or reset.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. } | Self::StateReset { .. })
    }

    /// Creates a device added event.
    #[must_use]
    pub fn device_added(device_id: DeviceId) -> Self {
        Self::DeviceAdded { device_id }
    }

    /// Creates a device removed event.
    #[must_use]
    pub fn device_removed(device_id: DeviceId) -> Self {
        Self::DeviceRemoved { device_id }
    }

    /// Creates a connected event.
    #[must_use]
    pub fn connected(device_id: DeviceId) -> Self {
        Self::ConnectionChanged {
            device_id,
            connected: true,
        }
    }

    /// Creates a disconnected event.
    #[must_use]
    pub fn disconnected(device_id: DeviceId) -> Self {
        Self::ConnectionChanged {
            device_id,
            connected: false,
        }
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(device_id: DeviceId, event: Event, new_state: DeviceState) -> Self {
        Self::StateChanged {
            device_id,
            event,
            new_state,
        }
    }

    /// Creates a state reset event.
    #[must_use]
    pub fn state_reset(device_id: DeviceId) -> Self {
        Self::StateReset { device_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PowerState, SourceId};

    #[test]
    fn device_id_extraction() {
        let id = DeviceId::new();

        assert_eq!(DeviceEvent::device_added(id).device_id(), id);
        assert_eq!(DeviceEvent::device_removed(id).device_id(), id);
        assert_eq!(DeviceEvent::connected(id).device_id(), id);
        assert_eq!(DeviceEvent::state_reset(id).device_id(), id);
    }

    #[test]
    fn lifecycle_events() {
        let id = DeviceId::new();

        assert!(DeviceEvent::device_added(id).is_lifecycle());
        assert!(DeviceEvent::device_removed(id).is_lifecycle());
        assert!(!DeviceEvent::connected(id).is_lifecycle());
    }

    #[test]
    fn connection_events() {
        let id = DeviceId::new();

        assert!(DeviceEvent::connected(id).is_connection());
        assert!(DeviceEvent::disconnected(id).is_connection());
        assert!(!DeviceEvent::device_added(id).is_connection());
    }

    #[test]
    fn state_change_events() {
        let id = DeviceId::new();
        let event = DeviceEvent::state_changed(
            id,
            Event::PowerChanged(PowerState::On),
            DeviceState::new(),
        );

        assert!(event.is_state_change());
        assert!(!event.is_lifecycle());
        assert!(!event.is_connection());
        assert!(DeviceEvent::state_reset(id).is_state_change());
    }

    #[test]
    fn serializes_with_variant_name() {
        let id = DeviceId::new();
        let mut state = DeviceState::new();
        let change = Event::SourceChanged(SourceId::new(3).unwrap());
        state.apply(&change);

        let event = DeviceEvent::state_changed(id, change, state);
        let json = serde_json::to_value(&event).unwrap();

        assert!(json.get("StateChanged").is_some());
        let back: DeviceEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
