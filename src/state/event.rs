// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded status events.
//!
//! An [`Event`] is one attribute value pushed by the receiver. The codec
//! produces it from a status line, the tracker applies it and drops it.

use serde::{Deserialize, Serialize};

use crate::types::{PowerState, SourceId, Volume};

/// A single attribute value reported by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Power state changed (or was reported).
    PowerChanged(PowerState),
    /// Selected input changed.
    SourceChanged(SourceId),
    /// Volume changed.
    VolumeChanged(Volume),
    /// Mute changed.
    MuteChanged(bool),
    /// Model name reported.
    ModelReported(String),
    /// Firmware version reported.
    VersionReported(String),
    /// Enabled flag of an input reported.
    SourceEnabledReported {
        /// The input.
        source: SourceId,
        /// Whether the input is enabled.
        enabled: bool,
    },
    /// Name of an input reported.
    SourceNameReported {
        /// The input.
        source: SourceId,
        /// The user-visible name.
        name: String,
    },
}

impl Event {
    /// Returns `true` for the live attributes (power, source, volume, mute).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(
            self,
            Self::PowerChanged(_)
                | Self::SourceChanged(_)
                | Self::VolumeChanged(_)
                | Self::MuteChanged(_)
        )
    }
}

/// Data quality of a decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// The value was used as reported.
    Clean,
    /// The reported volume was outside the dialect range and was clamped.
    Clamped {
        /// The value the receiver sent.
        reported: i32,
    },
}

/// A decoded event with its data quality flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded event.
    pub event: Event,
    /// Whether the value was used as-is.
    pub quality: Quality,
}

impl Decoded {
    /// Wraps an event decoded without adjustment.
    #[must_use]
    pub const fn clean(event: Event) -> Self {
        Self {
            event,
            quality: Quality::Clean,
        }
    }

    /// Returns `true` if the value had to be adjusted.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        !matches!(self.quality, Quality::Clean)
    }
}
