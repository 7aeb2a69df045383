// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver state tracking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{PowerState, SourceId, Volume};

use super::Event;

/// What the receiver reported about one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Whether the input is enabled in the receiver setup.
    pub enabled: Option<bool>,
    /// User-visible name.
    pub name: Option<String>,
}

/// Last-known state of a NAD receiver.
///
/// All fields are optional: `None` means unknown, either because the
/// receiver has not reported the value yet or because it was invalidated
/// after a connection gap.
///
/// # Examples
///
/// ```
/// use nad_simple::state::{DeviceState, Event};
/// use nad_simple::types::SourceId;
///
/// let mut state = DeviceState::new();
/// let tuner = SourceId::new(2).unwrap();
/// state.apply(&Event::SourceChanged(tuner));
/// assert_eq!(state.source(), Some(tuner));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Main zone power.
    power: Option<PowerState>,
    /// Selected input.
    source: Option<SourceId>,
    /// Main volume in dB.
    volume: Option<Volume>,
    /// Mute flag.
    muted: Option<bool>,
    /// Model name.
    model: Option<String>,
    /// Firmware version.
    version: Option<String>,
    /// Per-input setup, keyed by input number.
    sources: BTreeMap<SourceId, SourceInfo>,
}

impl DeviceState {
    /// Creates a new empty device state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.power
    }

    /// Gets the selected input.
    #[must_use]
    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    /// Gets the volume.
    #[must_use]
    pub fn volume(&self) -> Option<Volume> {
        self.volume
    }

    /// Gets the mute flag.
    #[must_use]
    pub fn muted(&self) -> Option<bool> {
        self.muted
    }

    /// Gets the model name.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Gets the firmware version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Gets what is known about an input.
    #[must_use]
    pub fn source_info(&self, source: SourceId) -> Option<&SourceInfo> {
        self.sources.get(&source)
    }

    /// Gets the name of the selected input, if both are known.
    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source
            .and_then(|id| self.sources.get(&id))
            .and_then(|info| info.name.as_deref())
    }

    /// Returns the enabled inputs that have a name, in input order.
    #[must_use]
    pub fn source_list(&self) -> Vec<(SourceId, String)> {
        self.sources
            .iter()
            .filter(|(_, info)| info.enabled == Some(true))
            .filter_map(|(id, info)| info.name.clone().map(|name| (*id, name)))
            .collect()
    }

    /// Resolves an input by name, or by number if the text is numeric.
    ///
    /// Only inputs in [`source_list`](Self::source_list) are considered.
    #[must_use]
    pub fn find_source(&self, name: &str) -> Option<SourceId> {
        let list = self.source_list();
        if let Some((id, _)) = list.iter().find(|(_, n)| n == name) {
            return Some(*id);
        }
        let number: u8 = name.trim().parse().ok()?;
        list.iter()
            .map(|(id, _)| *id)
            .find(|id| id.value() == number)
    }

    /// Returns `true` if none of power, source, volume or mute is known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.power.is_none() && self.source.is_none() && self.volume.is_none() && self.muted.is_none()
    }

    // ========== State Changes ==========

    /// Applies an event and returns whether the state actually changed.
    ///
    /// # Returns
    ///
    /// Returns `true` if the state was modified, `false` if it already held
    /// the reported value.
    pub fn apply(&mut self, event: &Event) -> bool {
        fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
            if slot.as_ref() == Some(&value) {
                false
            } else {
                *slot = Some(value);
                true
            }
        }

        match event {
            Event::PowerChanged(state) => replace(&mut self.power, *state),
            Event::SourceChanged(id) => replace(&mut self.source, *id),
            Event::VolumeChanged(volume) => replace(&mut self.volume, *volume),
            Event::MuteChanged(muted) => replace(&mut self.muted, *muted),
            Event::ModelReported(model) => replace(&mut self.model, model.clone()),
            Event::VersionReported(version) => replace(&mut self.version, version.clone()),
            Event::SourceEnabledReported { source, enabled } => {
                replace(&mut self.sources.entry(*source).or_default().enabled, *enabled)
            }
            Event::SourceNameReported { source, name } => {
                replace(&mut self.sources.entry(*source).or_default().name, name.clone())
            }
        }
    }

    /// Resets power, source, volume and mute to unknown.
    ///
    /// Device information (model, version, inputs) is kept: it does not
    /// change while the receiver is unreachable.
    ///
    /// Returns `true` if any of the reset fields was known.
    pub fn invalidate(&mut self) -> bool {
        let had_values = !self.is_unknown();
        self.power = None;
        self.source = None;
        self.volume = None;
        self.muted = None;
        had_values
    }

    /// Clears all state, resetting to unknown.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VolumeRange;

    fn source(n: u8) -> SourceId {
        SourceId::new(n).unwrap()
    }

    #[test]
    fn new_state_is_unknown() {
        let state = DeviceState::new();
        assert!(state.is_unknown());
        assert!(state.power().is_none());
        assert!(state.source().is_none());
        assert!(state.volume().is_none());
        assert!(state.model().is_none());
    }

    #[test]
    fn apply_power_change() {
        let mut state = DeviceState::new();
        let event = Event::PowerChanged(PowerState::On);

        assert!(state.apply(&event));
        assert_eq!(state.power(), Some(PowerState::On));

        // Applying same state returns false
        assert!(!state.apply(&event));

        assert!(state.apply(&Event::PowerChanged(PowerState::Off)));
        assert_eq!(state.power(), Some(PowerState::Off));
    }

    #[test]
    fn apply_volume_change() {
        let mut state = DeviceState::new();
        let volume = VolumeRange::NAD.check(-35).unwrap();

        assert!(state.apply(&Event::VolumeChanged(volume)));
        assert_eq!(state.volume(), Some(volume));
    }

    #[test]
    fn invalidate_keeps_device_info() {
        let mut state = DeviceState::new();
        state.apply(&Event::PowerChanged(PowerState::On));
        state.apply(&Event::MuteChanged(false));
        state.apply(&Event::ModelReported("T758".to_string()));

        assert!(state.invalidate());
        assert!(state.is_unknown());
        assert_eq!(state.model(), Some("T758"));

        // Nothing left to invalidate
        assert!(!state.invalidate());
    }

    #[test]
    fn source_list_only_contains_enabled_named_inputs() {
        let mut state = DeviceState::new();
        state.apply(&Event::SourceEnabledReported {
            source: source(1),
            enabled: true,
        });
        state.apply(&Event::SourceNameReported {
            source: source(1),
            name: "Stream".to_string(),
        });
        state.apply(&Event::SourceEnabledReported {
            source: source(2),
            enabled: false,
        });
        state.apply(&Event::SourceNameReported {
            source: source(2),
            name: "Tuner".to_string(),
        });
        state.apply(&Event::SourceEnabledReported {
            source: source(3),
            enabled: true,
        });

        assert_eq!(state.source_list(), vec![(source(1), "Stream".to_string())]);
    }

    #[test]
    fn find_source_by_name_or_number() {
        let mut state = DeviceState::new();
        for (n, name) in [(1, "Stream"), (4, "Phono")] {
            state.apply(&Event::SourceEnabledReported {
                source: source(n),
                enabled: true,
            });
            state.apply(&Event::SourceNameReported {
                source: source(n),
                name: name.to_string(),
            });
        }

        assert_eq!(state.find_source("Phono"), Some(source(4)));
        assert_eq!(state.find_source("1"), Some(source(1)));
        assert_eq!(state.find_source("2"), None);
        assert_eq!(state.find_source("Tuner"), None);
    }

    #[test]
    fn source_name_follows_selection() {
        let mut state = DeviceState::new();
        state.apply(&Event::SourceNameReported {
            source: source(2),
            name: "Tuner".to_string(),
        });
        assert_eq!(state.source_name(), None);

        state.apply(&Event::SourceChanged(source(2)));
        assert_eq!(state.source_name(), Some("Tuner"));
    }

    #[test]
    fn clear_resets_everything() {
        let mut state = DeviceState::new();
        state.apply(&Event::VersionReported("1.02".to_string()));
        state.apply(&Event::PowerChanged(PowerState::On));

        state.clear();

        assert_eq!(state, DeviceState::new());
    }
}
