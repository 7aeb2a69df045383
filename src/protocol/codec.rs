// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation between commands, status lines and events.
//!
//! Outgoing lines have the form `<key><operator>[value]`, for example
//! `Main.Volume=-48` or `Main.Power?`. On the wire each line is wrapped in
//! carriage returns. Incoming status lines have the form `<key>=<value>`.

use std::str::FromStr;

use crate::command::{Attribute, Command};
use crate::error::{Error, ParseError};
use crate::state::{Decoded, Event, Quality};
use crate::types::{PowerState, SourceId};

use super::Dialect;

/// Line terminator written before and after every command.
const TERMINATOR: u8 = b'\r';

/// Encodes commands and decodes status lines for one dialect.
///
/// # Examples
///
/// ```
/// use nad_simple::command::Command;
/// use nad_simple::protocol::{Codec, Dialect};
/// use nad_simple::state::Event;
/// use nad_simple::types::PowerState;
///
/// let codec = Codec::new(Dialect::nad());
///
/// let bytes = codec.encode(&Command::power_on()).unwrap();
/// assert_eq!(bytes, b"\rMain.Power=On\r");
///
/// let decoded = codec.decode("Main.Power=On").unwrap().unwrap();
/// assert_eq!(decoded.event, Event::PowerChanged(PowerState::On));
///
/// // Lines the dialect does not know are ignored
/// assert!(codec.decode("Main.Bass=2").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Codec {
    dialect: Dialect,
}

impl Codec {
    /// Creates a codec for the given dialect.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Renders a command as a protocol line, without terminators.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedCommand` if the dialect has no key for the
    /// attribute or does not accept the operator.
    pub fn encode_line(&self, command: &Command) -> Result<String, Error> {
        let attribute = command.attribute();
        let operator = command.operator();

        if !self.dialect.supports(attribute, operator) {
            return Err(Error::UnsupportedCommand(command.to_string()));
        }
        let key = self
            .dialect
            .key_for(attribute)
            .ok_or_else(|| Error::UnsupportedCommand(command.to_string()))?;

        let mut line = key;
        line.push_str(operator.as_str());
        if let Some(value) = command.value() {
            line.push_str(&value);
        }
        Ok(line)
    }

    /// Encodes a command into the bytes written to the receiver.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedCommand` if the dialect cannot express the
    /// command.
    pub fn encode(&self, command: &Command) -> Result<Vec<u8>, Error> {
        let line = self.encode_line(command)?;
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.push(TERMINATOR);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(TERMINATOR);
        Ok(bytes)
    }

    /// Decodes one received line.
    ///
    /// Returns `Ok(None)` for blank lines, lines without `=`, and keys the
    /// dialect does not know. Out-of-range volumes are clamped and flagged
    /// with [`Quality::Clamped`].
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidValue` if the key is known but the value
    /// cannot be interpreted.
    pub fn decode(&self, line: &str) -> Result<Option<Decoded>, ParseError> {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            return Ok(None);
        };
        let (key, value) = (key.trim(), value.trim());

        let Some(attribute) = self.dialect.resolve(key) else {
            return Ok(None);
        };

        let decoded = match attribute {
            Attribute::Power => {
                let state = PowerState::from_str(value)
                    .map_err(|_| ParseError::invalid(key, value, "expected On or Off"))?;
                Decoded::clean(Event::PowerChanged(state))
            }
            Attribute::Mute => {
                let state = PowerState::from_str(value)
                    .map_err(|_| ParseError::invalid(key, value, "expected On or Off"))?;
                Decoded::clean(Event::MuteChanged(state.is_on()))
            }
            Attribute::Source => Decoded::clean(Event::SourceChanged(self.parse_source(key, value)?)),
            Attribute::Volume => {
                let db: i32 = value
                    .parse()
                    .map_err(|_| ParseError::invalid(key, value, "not an integer"))?;
                let (volume, clamped) = self.dialect.volume_range().clamp(db);
                Decoded {
                    event: Event::VolumeChanged(volume),
                    quality: if clamped {
                        Quality::Clamped { reported: db }
                    } else {
                        Quality::Clean
                    },
                }
            }
            Attribute::Model => Decoded::clean(Event::ModelReported(value.to_string())),
            Attribute::Version => Decoded::clean(Event::VersionReported(value.to_string())),
            Attribute::SourceEnabled(source) => {
                let enabled = parse_yes_no(value)
                    .ok_or_else(|| ParseError::invalid(key, value, "expected Yes or No"))?;
                Decoded::clean(Event::SourceEnabledReported { source, enabled })
            }
            Attribute::SourceName(source) => Decoded::clean(Event::SourceNameReported {
                source,
                name: value.to_string(),
            }),
        };

        Ok(Some(decoded))
    }

    fn parse_source(&self, key: &str, value: &str) -> Result<SourceId, ParseError> {
        let number: u8 = value
            .parse()
            .map_err(|_| ParseError::invalid(key, value, "not an input number"))?;
        SourceId::new(number)
            .ok()
            .filter(|id| self.dialect.has_source(*id))
            .ok_or_else(|| {
                ParseError::invalid(
                    key,
                    value,
                    format!("input must be in 1..={}", self.dialect.source_count()),
                )
            })
    }
}

fn parse_yes_no(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if value.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}
