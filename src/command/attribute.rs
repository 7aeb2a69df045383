// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver attributes addressed by commands and status lines.

use std::fmt;

use crate::types::SourceId;

/// A readable or writable value on the receiver.
///
/// Indexed attributes (`SourceEnabled`, `SourceName`) carry the input
/// number they refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Main zone power.
    Power,
    /// Selected input of the main zone.
    Source,
    /// Main zone volume in dB.
    Volume,
    /// Main zone mute.
    Mute,
    /// Model name, e.g. `T758`.
    Model,
    /// Firmware version.
    Version,
    /// Whether an input is enabled in the receiver setup.
    SourceEnabled(SourceId),
    /// User-visible name of an input.
    SourceName(SourceId),
}

impl Attribute {
    /// Returns the attribute kind without any index.
    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        match self {
            Self::Power => AttributeKind::Power,
            Self::Source => AttributeKind::Source,
            Self::Volume => AttributeKind::Volume,
            Self::Mute => AttributeKind::Mute,
            Self::Model => AttributeKind::Model,
            Self::Version => AttributeKind::Version,
            Self::SourceEnabled(_) => AttributeKind::SourceEnabled,
            Self::SourceName(_) => AttributeKind::SourceName,
        }
    }

    /// Returns the input number for indexed attributes.
    #[must_use]
    pub const fn index(&self) -> Option<SourceId> {
        match self {
            Self::SourceEnabled(id) | Self::SourceName(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(index) => write!(f, "{:?}({index})", self.kind()),
            None => write!(f, "{:?}", self.kind()),
        }
    }
}

/// Attribute identity used as the key of a dialect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// See [`Attribute::Power`].
    Power,
    /// See [`Attribute::Source`].
    Source,
    /// See [`Attribute::Volume`].
    Volume,
    /// See [`Attribute::Mute`].
    Mute,
    /// See [`Attribute::Model`].
    Model,
    /// See [`Attribute::Version`].
    Version,
    /// See [`Attribute::SourceEnabled`].
    SourceEnabled,
    /// See [`Attribute::SourceName`].
    SourceName,
}

impl AttributeKind {
    /// Returns `true` for kinds whose wire key contains an input number.
    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        matches!(self, Self::SourceEnabled | Self::SourceName)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_attributes_expose_index() {
        let id = SourceId::new(3).unwrap();
        assert_eq!(Attribute::SourceName(id).index(), Some(id));
        assert_eq!(Attribute::Power.index(), None);
        assert!(Attribute::SourceEnabled(id).kind().is_indexed());
    }

    #[test]
    fn display_includes_index() {
        let id = SourceId::new(4).unwrap();
        assert_eq!(Attribute::SourceName(id).to_string(), "SourceName(4)");
        assert_eq!(Attribute::Volume.to_string(), "Volume");
    }
}
