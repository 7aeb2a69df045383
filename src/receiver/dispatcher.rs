// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation and delivery of outbound commands.

use crate::command::Command;
use crate::error::{Error, ValueError};
use crate::protocol::Codec;
use crate::protocol::connection::ConnectionHandle;

/// Turns commands into writes on the connection.
///
/// Arguments are checked against the dialect before anything is encoded,
/// so a rejected command never reaches the wire. The dispatcher does not
/// touch the state: it only changes when the receiver reports the new value.
#[derive(Debug)]
pub(crate) struct CommandDispatcher {
    codec: Codec,
    connection: ConnectionHandle,
}

impl CommandDispatcher {
    pub(crate) fn new(codec: Codec, connection: ConnectionHandle) -> Self {
        Self { codec, connection }
    }

    pub(crate) fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Checks a command against the dialect limits and encodes it.
    pub(crate) fn prepare(&self, command: &Command) -> Result<Vec<u8>, Error> {
        validate(&self.codec, command)?;
        self.codec.encode(command)
    }

    /// Validates, encodes and writes a command.
    ///
    /// Write failures are returned as they are; nothing is retried.
    pub(crate) async fn send(&self, command: &Command) -> Result<(), Error> {
        let bytes = self.prepare(command)?;
        tracing::debug!(%command, "Dispatching command");
        self.connection.write(bytes).await.map_err(Error::from)
    }
}

fn validate(codec: &Codec, command: &Command) -> Result<(), ValueError> {
    let dialect = codec.dialect();
    match command {
        Command::SetVolume(volume) => {
            dialect.volume_range().check(volume.db())?;
        }
        Command::SetSource(source) if !dialect.has_source(*source) => {
            return Err(ValueError::OutOfRange {
                min: 1,
                max: i32::from(dialect.source_count()),
                actual: i32::from(source.value()),
            });
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AttributeKind;
    use crate::command::Operator;
    use crate::protocol::Dialect;
    use crate::types::{SourceId, VolumeRange};

    fn zero_to_99() -> Codec {
        let dialect = Dialect::builder()
            .attribute(AttributeKind::Volume, "Main.Volume", &[Operator::Query, Operator::Set])
            .attribute(AttributeKind::Source, "Main.Source", &[Operator::Query, Operator::Set])
            .volume_range(VolumeRange::new(0, 99).unwrap())
            .source_count(4)
            .build()
            .unwrap();
        Codec::new(dialect)
    }

    #[test]
    fn volume_outside_dialect_range_is_rejected() {
        let codec = zero_to_99();
        let volume = VolumeRange::NAD.check(-5).unwrap();

        assert_eq!(
            validate(&codec, &Command::SetVolume(volume)),
            Err(ValueError::OutOfRange {
                min: 0,
                max: 99,
                actual: -5
            })
        );
    }

    #[test]
    fn volume_bounds_are_accepted() {
        let codec = zero_to_99();
        let range = VolumeRange::new(0, 99).unwrap();

        assert!(validate(&codec, &Command::SetVolume(range.check(0).unwrap())).is_ok());
        assert!(validate(&codec, &Command::SetVolume(range.check(99).unwrap())).is_ok());
    }

    #[test]
    fn source_outside_dialect_is_rejected() {
        let codec = zero_to_99();

        assert!(validate(&codec, &Command::SetSource(SourceId::new(4).unwrap())).is_ok());
        assert!(validate(&codec, &Command::SetSource(SourceId::new(5).unwrap())).is_err());
    }
}
