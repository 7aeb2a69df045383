// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for NAD receiver control.
//!
//! Each type ensures its value is valid at construction time, so commands
//! built from them can be encoded without further checks.
//!
//! # Types
//!
//! - [`PowerState`] - On/Off
//! - [`Volume`] - Main volume in dB, checked against a [`VolumeRange`]
//! - [`VolumeScale`] - Mapping between dB and a host-facing 0.0..=1.0 level
//! - [`SourceId`] - Input number (1-based)

mod power;
mod source;
mod volume;

pub use power::PowerState;
pub use source::SourceId;
pub use volume::{Volume, VolumeRange, VolumeScale};
