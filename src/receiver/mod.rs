// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing receiver adapter.
//!
//! A [`Receiver`] is one independent connection to one NAD receiver. It
//! exposes the last reported state, the actions a host can trigger, and
//! change notifications through [`Subscribable`].
//!
//! # Examples
//!
//! ```no_run
//! use nad_simple::{ConnectionConfig, Receiver, ReceiverConfig};
//! use nad_simple::subscription::Subscribable;
//!
//! # async fn example() -> nad_simple::Result<()> {
//! let receiver = Receiver::connect(ReceiverConfig::new(
//!     ConnectionConfig::network("192.168.1.60"),
//! ))
//! .await?;
//!
//! receiver.on_power_changed(|state| println!("Power: {state}"));
//!
//! receiver.power_on().await?;
//! receiver.set_volume(-40).await?;
//!
//! // The state follows what the receiver reports, not what was sent
//! println!("Volume: {:?}", receiver.state().volume());
//!
//! receiver.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dispatcher;
mod policy;

pub use config::{ConnectionConfig, DEFAULT_BAUD_RATE, DEFAULT_NETWORK_PORT, ReceiverConfig};
pub use policy::ReconnectionPolicy;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;

use crate::command::{Attribute, Command};
use crate::error::{Error, ProtocolError, Result, ValueError};
use crate::protocol::connection::{ConnectionHandle, WorkerSettings};
use crate::protocol::{Codec, Connect, Dialect};
use crate::state::{DeviceState, StateTracker};
use crate::subscription::{CallbackRegistry, Subscribable};
use crate::types::{PowerState, SourceId, Volume, VolumeScale};

use dispatcher::CommandDispatcher;

/// Queries sent once after the first connect, before the live attributes.
fn discovery_queries(dialect: &Dialect) -> Vec<Command> {
    let mut queries = vec![
        Command::query(Attribute::Model),
        Command::query(Attribute::Version),
    ];
    for source in dialect.sources() {
        queries.push(Command::query(Attribute::SourceEnabled(source)));
        queries.push(Command::query(Attribute::SourceName(source)));
    }
    queries
}

/// Connection to one NAD receiver.
///
/// Created with [`Receiver::connect`]. All state changes come from status
/// lines the receiver pushes; setters only send the request. Dropping the
/// receiver cancels its connection worker, [`shutdown`](Self::shutdown)
/// additionally waits for the stream to close.
pub struct Receiver {
    dispatcher: CommandDispatcher,
    callbacks: Arc<CallbackRegistry>,
    state_rx: watch::Receiver<DeviceState>,
    volume_scale: VolumeScale,
    shutdown_timeout: Duration,
    target: String,
}

impl Receiver {
    /// Connects to the receiver described by `config.connection`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::ConnectionFailed` (or `InvalidAddress`) if the
    /// initial connection cannot be established. Later connection losses
    /// are handled by reconnecting and are never returned from here.
    pub async fn connect(config: ReceiverConfig) -> Result<Self> {
        let connector = config.connection.clone();
        Self::with_connector(connector, config).await
    }

    /// Connects through a custom [`Connect`] implementation.
    ///
    /// `config.connection` is ignored; everything else applies.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the initial connection fails.
    pub async fn with_connector<C: Connect>(connector: C, config: ReceiverConfig) -> Result<Self> {
        Self::with_callbacks(connector, config, Arc::new(CallbackRegistry::new())).await
    }

    /// Connects with callbacks registered before the worker starts, so no
    /// reply to the startup queries goes unnoticed.
    pub(crate) async fn with_callbacks<C: Connect>(
        connector: C,
        config: ReceiverConfig,
        callbacks: Arc<CallbackRegistry>,
    ) -> Result<Self> {
        let target = connector.target();

        let stream = match timeout(config.connect_timeout, connector.connect()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::error!(receiver = %target, error = %e, "Failed to connect to receiver");
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!(receiver = %target, "Timed out connecting to receiver");
                return Err(ProtocolError::ConnectionFailed {
                    target,
                    reason: format!("timed out after {:?}", config.connect_timeout),
                }
                .into());
            }
        };

        let mut tracker = StateTracker::new(Arc::clone(&callbacks));
        let state_rx = tracker.watch();

        let mut startup = discovery_queries(&config.dialect);
        startup.extend(tracker.resync());

        let codec = Codec::new(config.dialect.clone());
        let connection = ConnectionHandle::spawn(
            connector,
            stream,
            codec.clone(),
            tracker,
            WorkerSettings::from(&config),
            startup,
        );

        Ok(Self {
            dispatcher: CommandDispatcher::new(codec, connection),
            callbacks,
            state_rx,
            volume_scale: config.volume_scale,
            shutdown_timeout: config.shutdown_timeout,
            target,
        })
    }

    // ========== State ==========

    /// Returns a snapshot of the last reported state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state_rx.borrow().clone()
    }

    /// Creates a watch receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DeviceState> {
        self.state_rx.clone()
    }

    /// Returns the reported power state.
    #[must_use]
    pub fn power(&self) -> Option<PowerState> {
        self.state_rx.borrow().power()
    }

    /// Returns the reported input.
    #[must_use]
    pub fn source(&self) -> Option<SourceId> {
        self.state_rx.borrow().source()
    }

    /// Returns the reported volume.
    #[must_use]
    pub fn volume(&self) -> Option<Volume> {
        self.state_rx.borrow().volume()
    }

    /// Returns the reported volume as a 0.0..=1.0 level.
    #[must_use]
    pub fn volume_level(&self) -> Option<f32> {
        self.volume().map(|v| self.volume_scale.level_for(v))
    }

    /// Returns the reported mute flag.
    #[must_use]
    pub fn muted(&self) -> Option<bool> {
        self.state_rx.borrow().muted()
    }

    /// Returns the enabled, named inputs.
    #[must_use]
    pub fn source_list(&self) -> Vec<(SourceId, String)> {
        self.state_rx.borrow().source_list()
    }

    /// Returns `true` while a stream to the receiver is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.dispatcher.connection().is_connected()
    }

    /// Creates a watch receiver for the connection flag.
    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<bool> {
        self.dispatcher.connection().watch_connected()
    }

    /// Returns the dialect in use.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        self.dispatcher.codec().dialect()
    }

    /// Returns the connection target, e.g. `192.168.1.60:23`.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    // ========== Actions ==========

    /// Sends a command.
    ///
    /// # Errors
    ///
    /// Returns `Error::Value` if an argument is outside the dialect limits,
    /// `Error::UnsupportedCommand` if the dialect cannot express it, and
    /// `Error::Protocol` if it cannot be written.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.dispatcher.send(command).await
    }

    /// Switches the receiver on or to standby.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be written.
    pub async fn set_power(&self, state: PowerState) -> Result<()> {
        self.send(&Command::SetPower(state)).await
    }

    /// Switches the receiver on.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be written.
    pub async fn power_on(&self) -> Result<()> {
        self.set_power(PowerState::On).await
    }

    /// Puts the receiver in standby.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be written.
    pub async fn power_off(&self) -> Result<()> {
        self.set_power(PowerState::Off).await
    }

    /// Selects an input.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if the receiver has no such input.
    pub async fn set_source(&self, source: SourceId) -> Result<()> {
        self.send(&Command::SetSource(source)).await
    }

    /// Selects an input by its reported name, or by number.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::UnknownSource` if no enabled input matches.
    pub async fn select_source_by_name(&self, name: &str) -> Result<()> {
        let source = self
            .state_rx
            .borrow()
            .find_source(name)
            .ok_or_else(|| ValueError::UnknownSource(name.to_string()))?;
        tracing::debug!(name = %name, %source, "Resolved input name");
        self.set_source(source).await
    }

    /// Sets the volume in dB.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if `db` is outside the dialect's
    /// volume range; nothing is written in that case.
    pub async fn set_volume(&self, db: i32) -> Result<()> {
        let volume = self.dialect().volume_range().check(db)?;
        self.send(&Command::SetVolume(volume)).await
    }

    /// Sets the volume from a 0.0..=1.0 level using the configured scale.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidLevel` if `level` is outside 0.0..=1.0.
    pub async fn set_volume_level(&self, level: f32) -> Result<()> {
        let db = self.volume_scale.db_for(level)?;
        self.set_volume(db).await
    }

    /// Raises the volume by one step.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedCommand` if the dialect has no step.
    pub async fn volume_up(&self) -> Result<()> {
        self.send(&Command::VolumeUp).await
    }

    /// Lowers the volume by one step.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedCommand` if the dialect has no step.
    pub async fn volume_down(&self) -> Result<()> {
        self.send(&Command::VolumeDown).await
    }

    /// Mutes or unmutes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Protocol` if the command cannot be written.
    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.send(&Command::SetMute(muted)).await
    }

    /// Asks the receiver to report an attribute.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedCommand` if the dialect has no such key.
    pub async fn query(&self, attribute: Attribute) -> Result<()> {
        self.send(&Command::query(attribute)).await
    }

    /// Asks the receiver to report power, volume, mute and input.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub async fn refresh(&self) -> Result<()> {
        for attribute in [
            Attribute::Power,
            Attribute::Volume,
            Attribute::Mute,
            Attribute::Source,
        ] {
            self.query(attribute).await?;
        }
        Ok(())
    }

    // ========== Lifecycle ==========

    /// Closes the connection and stops the worker.
    ///
    /// Waits at most the configured shutdown timeout. Later commands fail
    /// with `ProtocolError::ChannelClosed`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Timeout` if the worker had to be aborted.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!(receiver = %self.target, "Disconnecting from receiver");
        self.dispatcher
            .connection()
            .shutdown(self.shutdown_timeout)
            .await
            .map_err(Error::from)
    }
}

impl Subscribable for Receiver {
    fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("target", &self.target)
            .field("connected", &self.is_connected())
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}
