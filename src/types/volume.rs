// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume types.
//!
//! NAD receivers report the main volume as a signed dB figure
//! (`Main.Volume=-48`). [`VolumeRange`] holds the span a given model
//! accepts; [`VolumeScale`] maps a sub-span of it onto the 0.0..=1.0 level
//! that media-player style hosts work with.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValueError;

/// Main volume in dB.
///
/// A `Volume` carries no range of its own. The library only creates one
/// through a [`VolumeRange`], which either checks or clamps the value.
/// Deserializing a state snapshot restores the stored dB figure as is;
/// commands are still checked against the dialect's range before sending.
///
/// # Examples
///
/// ```
/// use nad_simple::types::VolumeRange;
///
/// let range = VolumeRange::new(-99, 19).unwrap();
/// let vol = range.check(-40).unwrap();
/// assert_eq!(vol.db(), -40);
/// assert!(range.check(20).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Volume(i32);

impl Volume {
    /// Returns the volume in dB.
    #[must_use]
    pub const fn db(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bounds as they appear in serialized form, before validation.
#[derive(Deserialize)]
struct RawBounds {
    min: i32,
    max: i32,
}

/// Inclusive range of volume values a receiver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeRange {
    min: i32,
    max: i32,
}

impl VolumeRange {
    /// Range accepted by current NAD receivers.
    pub const NAD: Self = Self { min: -99, max: 19 };

    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` if `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self, ValueError> {
        if min > max {
            return Err(ValueError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lowest accepted value.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Highest accepted value.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Returns `true` if `db` lies inside the range.
    #[must_use]
    pub const fn contains(&self, db: i32) -> bool {
        db >= self.min && db <= self.max
    }

    /// Validates a requested volume.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `db` is outside the range.
    pub fn check(&self, db: i32) -> Result<Volume, ValueError> {
        if !self.contains(db) {
            return Err(ValueError::OutOfRange {
                min: self.min,
                max: self.max,
                actual: db,
            });
        }
        Ok(Volume(db))
    }

    /// Clamps a reported volume into the range.
    ///
    /// The second element is `true` when the value had to be clamped.
    #[must_use]
    pub fn clamp(&self, db: i32) -> (Volume, bool) {
        let clamped = db.clamp(self.min, self.max);
        (Volume(clamped), clamped != db)
    }
}

impl<'de> Deserialize<'de> for VolumeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBounds::deserialize(deserializer)?;
        Self::new(raw.min, raw.max).map_err(serde::de::Error::custom)
    }
}

impl Default for VolumeRange {
    fn default() -> Self {
        Self::NAD
    }
}

/// Maps volume in dB onto a 0.0..=1.0 level.
///
/// The level is linear in dB between `min` (0.0) and `max` (1.0).
///
/// # Examples
///
/// ```
/// use nad_simple::types::VolumeScale;
///
/// let scale = VolumeScale::default();
/// assert_eq!(scale.db_for(0.5).unwrap(), -56);
/// assert!((scale.level_for_db(-20) - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VolumeScale {
    min: i32,
    max: i32,
}

impl VolumeScale {
    /// Default lower bound in dB.
    pub const DEFAULT_MIN: i32 = -92;

    /// Default upper bound in dB.
    pub const DEFAULT_MAX: i32 = -20;

    /// Creates a scale.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` unless `min < max`.
    pub fn new(min: i32, max: i32) -> Result<Self, ValueError> {
        if min >= max {
            return Err(ValueError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// dB value mapped to level 0.0.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// dB value mapped to level 1.0.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    fn span(&self) -> f64 {
        f64::from(self.max) - f64::from(self.min)
    }

    /// Converts a dB value to a level, clamped to 0.0..=1.0.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn level_for_db(&self, db: i32) -> f32 {
        let offset = f64::from(db) - f64::from(self.min);
        (offset / self.span()).clamp(0.0, 1.0) as f32
    }

    /// Converts a volume to a level, clamped to 0.0..=1.0.
    #[must_use]
    pub fn level_for(&self, volume: Volume) -> f32 {
        self.level_for_db(volume.db())
    }

    /// Converts a level to a dB value, rounding to the nearest step.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidLevel` if `level` is not in 0.0..=1.0.
    #[allow(clippy::cast_possible_truncation)]
    pub fn db_for(&self, level: f32) -> Result<i32, ValueError> {
        if !(0.0..=1.0).contains(&level) {
            return Err(ValueError::InvalidLevel(level));
        }
        // Stays within min..=max, so the cast cannot truncate
        let db = f64::from(self.min) + (self.span() * f64::from(level)).round();
        Ok(db as i32)
    }
}

impl<'de> Deserialize<'de> for VolumeScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawBounds::deserialize(deserializer)?;
        Self::new(raw.min, raw.max).map_err(serde::de::Error::custom)
    }
}

impl Default for VolumeScale {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}
