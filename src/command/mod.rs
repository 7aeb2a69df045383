// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver command definitions.
//!
//! A [`Command`] is an outbound intent. It is independent of the wire
//! syntax: the [`Codec`](crate::protocol::Codec) turns it into a line using
//! the active [`Dialect`](crate::protocol::Dialect).
//!
//! # Command Structure
//!
//! Every command resolves to three parts:
//! - an [`Attribute`] (e.g. `Volume`)
//! - an [`Operator`]: query `?`, set `=`, step up `+`, step down `-`
//! - an optional value (e.g. `-48`)
//!
//! # Examples
//!
//! ```
//! use nad_simple::command::{Attribute, Command, Operator};
//! use nad_simple::types::PowerState;
//!
//! let cmd = Command::SetPower(PowerState::On);
//! assert_eq!(cmd.attribute(), Attribute::Power);
//! assert_eq!(cmd.operator(), Operator::Set);
//! assert_eq!(cmd.value(), Some("On".to_string()));
//!
//! let query = Command::query(Attribute::Volume);
//! assert_eq!(query.operator().as_str(), "?");
//! assert_eq!(query.value(), None);
//! ```

mod attribute;

pub use attribute::{Attribute, AttributeKind};

use std::fmt;

use crate::types::{PowerState, SourceId, Volume};

/// Operator joining the attribute key and the value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Ask for the current value.
    Query,
    /// Assign a value.
    Set,
    /// Step up by one unit.
    Increment,
    /// Step down by one unit.
    Decrement,
}

impl Operator {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "?",
            Self::Set => "=",
            Self::Increment => "+",
            Self::Decrement => "-",
        }
    }
}

/// An outbound intent for the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switch the main zone on or off.
    SetPower(PowerState),
    /// Select an input.
    SetSource(SourceId),
    /// Set the main volume.
    SetVolume(Volume),
    /// Mute or unmute.
    SetMute(bool),
    /// Raise the volume one step.
    VolumeUp,
    /// Lower the volume one step.
    VolumeDown,
    /// Ask the receiver to report an attribute.
    Query(Attribute),
}

impl Command {
    /// Creates a command that turns the receiver on.
    #[must_use]
    pub const fn power_on() -> Self {
        Self::SetPower(PowerState::On)
    }

    /// Creates a command that puts the receiver in standby.
    #[must_use]
    pub const fn power_off() -> Self {
        Self::SetPower(PowerState::Off)
    }

    /// Creates a status query.
    #[must_use]
    pub const fn query(attribute: Attribute) -> Self {
        Self::Query(attribute)
    }

    /// Returns the attribute the command addresses.
    #[must_use]
    pub const fn attribute(&self) -> Attribute {
        match self {
            Self::SetPower(_) => Attribute::Power,
            Self::SetSource(_) => Attribute::Source,
            Self::SetVolume(_) | Self::VolumeUp | Self::VolumeDown => Attribute::Volume,
            Self::SetMute(_) => Attribute::Mute,
            Self::Query(attribute) => *attribute,
        }
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        match self {
            Self::SetPower(_) | Self::SetSource(_) | Self::SetVolume(_) | Self::SetMute(_) => {
                Operator::Set
            }
            Self::VolumeUp => Operator::Increment,
            Self::VolumeDown => Operator::Decrement,
            Self::Query(_) => Operator::Query,
        }
    }

    /// Returns the value text, if the operator carries one.
    #[must_use]
    pub fn value(&self) -> Option<String> {
        match self {
            Self::SetPower(state) => Some(state.as_str().to_string()),
            Self::SetSource(id) => Some(id.to_string()),
            Self::SetVolume(volume) => Some(volume.to_string()),
            Self::SetMute(muted) => Some(PowerState::from(*muted).as_str().to_string()),
            Self::VolumeUp | Self::VolumeDown | Self::Query(_) => None,
        }
    }

    /// Returns `true` if the command only reads state.
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.attribute(), self.operator().as_str())?;
        if let Some(value) = self.value() {
            f.write_str(&value)?;
        }
        Ok(())
    }
}
