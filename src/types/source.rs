// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input source identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A receiver input, numbered from 1.
///
/// The upper bound depends on the model and is enforced by the
/// [`Dialect`](crate::protocol::Dialect), not by this type.
///
/// # Examples
///
/// ```
/// use nad_simple::types::SourceId;
///
/// let tuner = SourceId::new(2).unwrap();
/// assert_eq!(tuner.value(), 2);
/// assert!(SourceId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct SourceId(u8);

impl SourceId {
    /// Creates a source identifier.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` for 0.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value == 0 {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: i32::from(u8::MAX),
                actual: 0,
            });
        }
        Ok(Self(value))
    }

    /// Returns the source number.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| ValueError::UnknownSource(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<u8> for SourceId {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
