// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver vocabulary as a data table.
//!
//! A [`Dialect`] maps each [`AttributeKind`] to the key the receiver uses on
//! the wire and lists the operators it accepts for that key. Indexed keys
//! use a `{n}` placeholder for the input number, e.g. `Source{n}.Name`.
//!
//! ```
//! use nad_simple::command::{Attribute, Operator};
//! use nad_simple::protocol::Dialect;
//! use nad_simple::types::SourceId;
//!
//! let dialect = Dialect::nad();
//! let tuner = SourceId::new(2).unwrap();
//!
//! assert_eq!(dialect.key_for(Attribute::Volume).as_deref(), Some("Main.Volume"));
//! assert_eq!(dialect.resolve("Source2.Name"), Some(Attribute::SourceName(tuner)));
//! assert!(dialect.supports(Attribute::Volume, Operator::Increment));
//! assert!(!dialect.supports(Attribute::Model, Operator::Set));
//! ```

use crate::command::{Attribute, AttributeKind, Operator};
use crate::error::ValueError;
use crate::types::{SourceId, VolumeRange};

const INDEX_PLACEHOLDER: &str = "{n}";

/// Number of inputs on current NAD receivers.
pub const NAD_SOURCE_COUNT: u8 = 12;

/// Wire key of one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyTemplate {
    Fixed(String),
    Indexed { prefix: String, suffix: String },
}

impl KeyTemplate {
    fn parse(kind: AttributeKind, template: &str) -> Result<Self, ValueError> {
        let invalid = || ValueError::InvalidTemplate(format!("{kind:?}: {template:?}"));

        if template.is_empty() || template.contains(char::is_whitespace) {
            return Err(invalid());
        }

        match (kind.is_indexed(), template.split_once(INDEX_PLACEHOLDER)) {
            (true, Some((prefix, suffix))) if !suffix.contains(INDEX_PLACEHOLDER) => {
                Ok(Self::Indexed {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
            }
            (false, None) => Ok(Self::Fixed(template.to_string())),
            _ => Err(invalid()),
        }
    }

    fn render(&self, index: Option<SourceId>) -> Option<String> {
        match (self, index) {
            (Self::Fixed(key), None) => Some(key.clone()),
            (Self::Indexed { prefix, suffix }, Some(id)) => Some(format!("{prefix}{id}{suffix}")),
            _ => None,
        }
    }

    /// Matches a received key, returning the input number for indexed keys.
    fn matches(&self, key: &str) -> Option<Option<u8>> {
        match self {
            Self::Fixed(fixed) => (fixed == key).then_some(None),
            Self::Indexed { prefix, suffix } => {
                let number = key.strip_prefix(prefix.as_str())?.strip_suffix(suffix.as_str())?;
                if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                number.parse().ok().map(Some)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    kind: AttributeKind,
    template: KeyTemplate,
    operators: Vec<Operator>,
}

/// Table between the abstract command vocabulary and a receiver's wire keys.
///
/// Use [`Dialect::nad`] for current NAD receivers, or [`Dialect::builder`]
/// for models with a different key set or volume range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    entries: Vec<Entry>,
    volume_range: VolumeRange,
    source_count: u8,
}

impl Dialect {
    /// The vocabulary of current NAD receivers.
    #[must_use]
    pub fn nad() -> Self {
        use Operator::{Decrement, Increment, Query, Set};

        let fixed = |kind, key: &str, operators: &[Operator]| Entry {
            kind,
            template: KeyTemplate::Fixed(key.to_string()),
            operators: operators.to_vec(),
        };
        let indexed = |kind, prefix: &str, suffix: &str| Entry {
            kind,
            template: KeyTemplate::Indexed {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            operators: vec![Query],
        };

        Self {
            entries: vec![
                fixed(AttributeKind::Power, "Main.Power", &[Query, Set]),
                fixed(AttributeKind::Source, "Main.Source", &[Query, Set]),
                fixed(
                    AttributeKind::Volume,
                    "Main.Volume",
                    &[Query, Set, Increment, Decrement],
                ),
                fixed(AttributeKind::Mute, "Main.Mute", &[Query, Set]),
                fixed(AttributeKind::Model, "Main.Model", &[Query]),
                fixed(AttributeKind::Version, "Main.Version", &[Query]),
                indexed(AttributeKind::SourceEnabled, "Source", ".Enabled"),
                indexed(AttributeKind::SourceName, "Source", ".Name"),
            ],
            volume_range: VolumeRange::NAD,
            source_count: NAD_SOURCE_COUNT,
        }
    }

    /// Starts an empty dialect.
    #[must_use]
    pub fn builder() -> DialectBuilder {
        DialectBuilder::default()
    }

    /// Returns the volume range the receiver accepts.
    #[must_use]
    pub fn volume_range(&self) -> VolumeRange {
        self.volume_range
    }

    /// Returns the number of inputs.
    #[must_use]
    pub fn source_count(&self) -> u8 {
        self.source_count
    }

    /// Returns `true` if `source` is one of the receiver's inputs.
    #[must_use]
    pub fn has_source(&self, source: SourceId) -> bool {
        source.value() <= self.source_count
    }

    /// Iterates over all input numbers.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        (1..=self.source_count).filter_map(|n| SourceId::new(n).ok())
    }

    /// Returns the wire key for an attribute, if the dialect has one.
    #[must_use]
    pub fn key_for(&self, attribute: Attribute) -> Option<String> {
        self.entry(attribute.kind())?
            .template
            .render(attribute.index())
    }

    /// Returns `true` if the attribute accepts the operator.
    #[must_use]
    pub fn supports(&self, attribute: Attribute, operator: Operator) -> bool {
        self.entry(attribute.kind())
            .is_some_and(|entry| entry.operators.contains(&operator))
    }

    /// Looks up the attribute a received key refers to.
    ///
    /// Returns `None` for keys outside the table and for indexed keys whose
    /// input number is not one of the receiver's inputs.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<Attribute> {
        self.entries.iter().find_map(|entry| {
            let index = entry.template.matches(key)?;
            match index {
                None => attribute_of(entry.kind, None),
                Some(n) => {
                    let id = SourceId::new(n).ok().filter(|id| self.has_source(*id))?;
                    attribute_of(entry.kind, Some(id))
                }
            }
        })
    }

    fn entry(&self, kind: AttributeKind) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::nad()
    }
}

fn attribute_of(kind: AttributeKind, index: Option<SourceId>) -> Option<Attribute> {
    match (kind, index) {
        (AttributeKind::Power, None) => Some(Attribute::Power),
        (AttributeKind::Source, None) => Some(Attribute::Source),
        (AttributeKind::Volume, None) => Some(Attribute::Volume),
        (AttributeKind::Mute, None) => Some(Attribute::Mute),
        (AttributeKind::Model, None) => Some(Attribute::Model),
        (AttributeKind::Version, None) => Some(Attribute::Version),
        (AttributeKind::SourceEnabled, Some(id)) => Some(Attribute::SourceEnabled(id)),
        (AttributeKind::SourceName, Some(id)) => Some(Attribute::SourceName(id)),
        _ => None,
    }
}

/// Builder for custom dialects.
///
/// # Examples
///
/// ```
/// use nad_simple::command::{AttributeKind, Operator};
/// use nad_simple::protocol::Dialect;
/// use nad_simple::types::VolumeRange;
///
/// let dialect = Dialect::builder()
///     .attribute(AttributeKind::Power, "Main.Power", &[Operator::Query, Operator::Set])
///     .attribute(AttributeKind::Volume, "Main.Volume", &[Operator::Query, Operator::Set])
///     .volume_range(VolumeRange::new(0, 99).unwrap())
///     .source_count(6)
///     .build()
///     .unwrap();
///
/// assert_eq!(dialect.volume_range().max(), 99);
/// ```
#[derive(Debug, Clone)]
pub struct DialectBuilder {
    attributes: Vec<(AttributeKind, String, Vec<Operator>)>,
    volume_range: VolumeRange,
    source_count: u8,
}

impl Default for DialectBuilder {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            volume_range: VolumeRange::NAD,
            source_count: NAD_SOURCE_COUNT,
        }
    }
}

impl DialectBuilder {
    /// Adds or replaces an attribute.
    #[must_use]
    pub fn attribute(
        mut self,
        kind: AttributeKind,
        template: impl Into<String>,
        operators: &[Operator],
    ) -> Self {
        self.attributes.retain(|(k, _, _)| *k != kind);
        self.attributes
            .push((kind, template.into(), operators.to_vec()));
        self
    }

    /// Sets the volume range.
    #[must_use]
    pub fn volume_range(mut self, range: VolumeRange) -> Self {
        self.volume_range = range;
        self
    }

    /// Sets the number of inputs.
    #[must_use]
    pub fn source_count(mut self, count: u8) -> Self {
        self.source_count = count;
        self
    }

    /// Builds the dialect.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidTemplate` if a key is empty, contains
    /// whitespace, or does not carry exactly one `{n}` when (and only when)
    /// the attribute is indexed. Returns `ValueError::InvalidRange` if the
    /// source count is zero.
    pub fn build(self) -> Result<Dialect, ValueError> {
        if self.source_count == 0 {
            return Err(ValueError::InvalidRange {
                min: 1,
                max: i32::from(self.source_count),
            });
        }

        let entries = self
            .attributes
            .into_iter()
            .map(|(kind, template, operators)| {
                Ok(Entry {
                    kind,
                    template: KeyTemplate::parse(kind, &template)?,
                    operators,
                })
            })
            .collect::<Result<Vec<_>, ValueError>>()?;

        Ok(Dialect {
            entries,
            volume_range: self.volume_range,
            source_count: self.source_count,
        })
    }
}
