// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of connected receivers sharing one event bus.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{RwLock, broadcast, watch};

use crate::command::Command;
use crate::error::Error;
use crate::event::{DeviceEvent, DeviceId};
use crate::protocol::Connect;
use crate::receiver::{Receiver, ReceiverConfig};
use crate::state::DeviceState;
use crate::subscription::CallbackRegistry;
use crate::types::{PowerState, SourceId};

use super::event_bus::{DEFAULT_EVENT_CAPACITY, EventBus};

/// Manager for several NAD receivers.
///
/// Each receiver keeps its own connection worker; the manager only holds
/// them by [`DeviceId`] and republishes their notifications as
/// [`DeviceEvent`]s on a single broadcast channel.
///
/// # Examples
///
/// ```no_run
/// use nad_simple::manager::ReceiverManager;
/// use nad_simple::{ConnectionConfig, ReceiverConfig};
///
/// #[tokio::main]
/// async fn main() -> nad_simple::Result<()> {
///     let manager = ReceiverManager::new();
///
///     let mut events = manager.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     let config = ReceiverConfig::new(ConnectionConfig::network("192.168.1.60"));
///     let living_room = manager.add_receiver(config).await?;
///
///     manager.power_on(living_room).await?;
///     manager.set_volume(living_room, -35).await?;
///
///     manager.shutdown_all().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ReceiverManager {
    /// Connected receivers, keyed by device ID.
    receivers: Arc<RwLock<HashMap<DeviceId, Arc<Receiver>>>>,
    /// Event bus for broadcasting receiver events.
    event_bus: EventBus,
}

impl ReceiverManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates an empty manager whose subscribers may fall up to
    /// `event_capacity` events behind before they start losing the oldest.
    #[must_use]
    pub fn with_capacity(event_capacity: usize) -> Self {
        Self {
            receivers: Arc::new(RwLock::new(HashMap::new())),
            event_bus: EventBus::new(event_capacity),
        }
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to events of all managed receivers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the number of active event subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.event_bus.subscriber_count()
    }

    // =========================================================================
    // Receiver Management
    // =========================================================================

    /// Connects to a receiver and starts managing it.
    ///
    /// # Errors
    ///
    /// Returns the connection error if the initial connect fails. Nothing is
    /// added in that case.
    pub async fn add_receiver(&self, config: ReceiverConfig) -> Result<DeviceId, Error> {
        let connector = config.connection.clone();
        self.add_with_connector(connector, config).await
    }

    /// Connects through a custom [`Connect`] implementation and starts
    /// managing the receiver.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the initial connect fails.
    ///
    /// # Events
    ///
    /// `DeviceAdded` is published before connecting, so it precedes every
    /// state event of the new receiver. A failed connect follows it with
    /// `DeviceRemoved`.
    pub async fn add_with_connector<C: Connect>(
        &self,
        connector: C,
        config: ReceiverConfig,
    ) -> Result<DeviceId, Error> {
        let device_id = DeviceId::new();
        let callbacks = Arc::new(CallbackRegistry::new());
        forward_to_bus(&callbacks, device_id, &self.event_bus);
        self.event_bus.publish(DeviceEvent::device_added(device_id));

        let receiver = match Receiver::with_callbacks(connector, config, callbacks).await {
            Ok(receiver) => receiver,
            Err(e) => {
                self.event_bus.publish(DeviceEvent::device_removed(device_id));
                return Err(e);
            }
        };
        tracing::info!(%device_id, receiver = %receiver.target(), "Receiver added");

        self.receivers
            .write()
            .await
            .insert(device_id, Arc::new(receiver));

        Ok(device_id)
    }

    /// Shuts a receiver down and stops managing it.
    ///
    /// # Returns
    ///
    /// Returns `true` if the receiver was found and removed, `false` otherwise.
    pub async fn remove_receiver(&self, device_id: DeviceId) -> bool {
        let Some(receiver) = self.receivers.write().await.remove(&device_id) else {
            return false;
        };

        if let Err(e) = receiver.shutdown().await {
            tracing::warn!(%device_id, error = %e, "Receiver did not shut down cleanly");
        }
        self.event_bus
            .publish(DeviceEvent::device_removed(device_id));

        true
    }

    /// Removes and shuts down every receiver.
    pub async fn shutdown_all(&self) {
        let ids = self.device_ids().await;
        for device_id in ids {
            self.remove_receiver(device_id).await;
        }
    }

    /// Returns a handle to a managed receiver.
    ///
    /// The handle stays usable after removal but its commands fail with
    /// `ProtocolError::ChannelClosed`.
    pub async fn receiver(&self, device_id: DeviceId) -> Option<Arc<Receiver>> {
        self.receivers.read().await.get(&device_id).cloned()
    }

    /// Returns a list of all device IDs.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.receivers.read().await.keys().copied().collect()
    }

    /// Returns the number of managed receivers.
    pub async fn device_count(&self) -> usize {
        self.receivers.read().await.len()
    }

    /// Returns true if the receiver is currently connected.
    pub async fn is_connected(&self, device_id: DeviceId) -> bool {
        self.receivers
            .read()
            .await
            .get(&device_id)
            .is_some_and(|r| r.is_connected())
    }

    // =========================================================================
    // State Management
    // =========================================================================

    /// Returns the current state of a receiver.
    pub async fn get_state(&self, device_id: DeviceId) -> Option<DeviceState> {
        self.receivers
            .read()
            .await
            .get(&device_id)
            .map(|r| r.state())
    }

    /// Creates a watch receiver for a receiver's state.
    pub async fn watch_device(&self, device_id: DeviceId) -> Option<watch::Receiver<DeviceState>> {
        self.receivers
            .read()
            .await
            .get(&device_id)
            .map(|r| r.watch())
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Sends a raw command to a receiver.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown ID, otherwise whatever
    /// [`Receiver::send`] returns.
    pub async fn send(&self, device_id: DeviceId, command: &Command) -> Result<(), Error> {
        self.get(device_id).await?.send(command).await
    }

    /// Turns a receiver on.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found or the write fails.
    pub async fn power_on(&self, device_id: DeviceId) -> Result<(), Error> {
        self.set_power(device_id, PowerState::On).await
    }

    /// Puts a receiver in standby.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found or the write fails.
    pub async fn power_off(&self, device_id: DeviceId) -> Result<(), Error> {
        self.set_power(device_id, PowerState::Off).await
    }

    /// Requests a power state.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found or the write fails.
    pub async fn set_power(&self, device_id: DeviceId, state: PowerState) -> Result<(), Error> {
        self.get(device_id).await?.set_power(state).await
    }

    /// Selects an input.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found, the input is outside
    /// its dialect, or the write fails.
    pub async fn set_source(&self, device_id: DeviceId, source: SourceId) -> Result<(), Error> {
        self.get(device_id).await?.set_source(source).await
    }

    /// Requests a volume in dB.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found, the value is outside
    /// its volume range, or the write fails.
    pub async fn set_volume(&self, device_id: DeviceId, db: i32) -> Result<(), Error> {
        self.get(device_id).await?.set_volume(db).await
    }

    /// Requests mute on or off.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found or the write fails.
    pub async fn set_mute(&self, device_id: DeviceId, muted: bool) -> Result<(), Error> {
        self.get(device_id).await?.set_mute(muted).await
    }

    /// Re-queries the live attributes of a receiver.
    ///
    /// # Errors
    ///
    /// Returns an error if the receiver is not found or the write fails.
    pub async fn refresh(&self, device_id: DeviceId) -> Result<(), Error> {
        self.get(device_id).await?.refresh().await
    }

    /// Clones the receiver handle out of the map so no lock is held while
    /// a command is in flight.
    async fn get(&self, device_id: DeviceId) -> Result<Arc<Receiver>, Error> {
        self.receiver(device_id).await.ok_or(Error::DeviceNotFound)
    }
}

/// Registers callbacks that republish a receiver's notifications as
/// [`DeviceEvent`]s.
///
/// The mirror follows the same events as the receiver's own tracker, so
/// `new_state` always matches what the receiver reports at that point.
fn forward_to_bus(callbacks: &CallbackRegistry, device_id: DeviceId, bus: &EventBus) {
    let mirror = Arc::new(Mutex::new(DeviceState::new()));

    {
        let bus = bus.clone();
        let mirror = Arc::clone(&mirror);
        callbacks.on_state_changed(move |event| {
            let new_state = {
                let mut state = mirror.lock();
                state.apply(event);
                state.clone()
            };
            bus.publish(DeviceEvent::state_changed(device_id, event.clone(), new_state));
        });
    }

    {
        let bus = bus.clone();
        callbacks.on_state_reset(move || {
            mirror.lock().invalidate();
            bus.publish(DeviceEvent::state_reset(device_id));
        });
    }

    {
        let bus = bus.clone();
        callbacks.on_connected(move |_| bus.publish(DeviceEvent::connected(device_id)));
    }

    let bus = bus.clone();
    callbacks.on_disconnected(move || bus.publish(DeviceEvent::disconnected(device_id)));
}

impl Default for ReceiverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ReceiverManager {
    fn clone(&self) -> Self {
        Self {
            receivers: Arc::clone(&self.receivers),
            event_bus: self.event_bus.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;
    use crate::protocol::BoxedStream;
    use crate::receiver::{ConnectionConfig, ReconnectionPolicy};
    use crate::state::Event;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Hands out one in-memory stream, then refuses.
    struct PipeConnector(Mutex<Option<DuplexStream>>);

    impl Connect for PipeConnector {
        async fn connect(&self) -> Result<BoxedStream, ProtocolError> {
            match self.0.lock().take() {
                Some(stream) => Ok(Box::new(stream)),
                None => Err(ProtocolError::ConnectionFailed {
                    target: "pipe".to_string(),
                    reason: "already used".to_string(),
                }),
            }
        }

        fn target(&self) -> String {
            "pipe".to_string()
        }
    }

    fn pipe() -> (PipeConnector, DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        (PipeConnector(Mutex::new(Some(client))), server)
    }

    fn config() -> ReceiverConfig {
        ReceiverConfig::new(ConnectionConfig::network("pipe"))
            .with_reconnection(ReconnectionPolicy::disabled())
    }

    #[tokio::test]
    async fn new_manager_is_empty() {
        let manager = ReceiverManager::new();
        assert_eq!(manager.device_count().await, 0);
        assert!(manager.device_ids().await.is_empty());
    }

    #[tokio::test]
    async fn add_receiver_publishes_event() {
        let manager = ReceiverManager::new();
        let mut events = manager.subscribe();
        let (connector, _server) = pipe();

        let id = manager.add_with_connector(connector, config()).await.unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::DeviceAdded { device_id } if device_id == id));
        assert_eq!(manager.device_count().await, 1);
        assert!(manager.is_connected(id).await);
    }

    #[tokio::test]
    async fn failed_connect_adds_nothing() {
        let manager = ReceiverManager::new();
        let mut events = manager.subscribe();
        let connector = PipeConnector(Mutex::new(None));

        let result = manager.add_with_connector(connector, config()).await;

        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::ConnectionFailed { .. }))
        ));
        assert_eq!(manager.device_count().await, 0);

        let added = events.try_recv().unwrap();
        assert!(matches!(added, DeviceEvent::DeviceAdded { .. }));
        assert_eq!(
            events.try_recv().unwrap(),
            DeviceEvent::device_removed(added.device_id())
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn added_precedes_state_from_startup_replies() {
        let manager = ReceiverManager::new();
        let mut events = manager.subscribe();
        let (connector, mut server) = pipe();

        // Queued before the worker starts, so it is read with the startup replies
        server.write_all(b"Main.Power=On\r").await.unwrap();
        let id = manager.add_with_connector(connector, config()).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), DeviceEvent::device_added(id));
        let next = events.recv().await.unwrap();
        assert!(next.is_state_change());
        assert_eq!(next.device_id(), id);
    }

    #[tokio::test]
    async fn status_lines_become_state_events() {
        let manager = ReceiverManager::new();
        let mut events = manager.subscribe();
        let (connector, mut server) = pipe();
        let id = manager.add_with_connector(connector, config()).await.unwrap();

        server.write_all(b"Main.Power=On\r\n").await.unwrap();

        loop {
            match events.recv().await.unwrap() {
                DeviceEvent::StateChanged {
                    device_id,
                    event,
                    new_state,
                } => {
                    assert_eq!(device_id, id);
                    assert_eq!(event, Event::PowerChanged(PowerState::On));
                    assert_eq!(new_state.power(), Some(PowerState::On));
                    break;
                }
                other => assert!(other.is_lifecycle()),
            }
        }
        assert_eq!(
            manager.get_state(id).await.and_then(|s| s.power()),
            Some(PowerState::On)
        );
    }

    #[tokio::test]
    async fn lost_connection_publishes_disconnected() {
        let manager = ReceiverManager::new();
        let mut events = manager.subscribe();
        let (connector, server) = pipe();
        let id = manager.add_with_connector(connector, config()).await.unwrap();

        drop(server);

        loop {
            if let DeviceEvent::ConnectionChanged {
                device_id,
                connected,
            } = events.recv().await.unwrap()
            {
                assert_eq!(device_id, id);
                assert!(!connected);
                break;
            }
        }
    }

    #[tokio::test]
    async fn commands_reach_the_right_receiver() {
        let manager = ReceiverManager::new();
        let (first, mut first_server) = pipe();
        let (second, mut second_server) = pipe();
        let first_id = manager.add_with_connector(first, config()).await.unwrap();
        let _second_id = manager.add_with_connector(second, config()).await.unwrap();

        manager.set_mute(first_id, true).await.unwrap();
        manager.remove_receiver(first_id).await;

        let mut written = Vec::new();
        first_server.read_to_end(&mut written).await.unwrap();
        assert!(String::from_utf8_lossy(&written).contains("\rMain.Mute=On\r"));

        // Only the startup queries reached the second receiver
        let mut buf = vec![0u8; 4096];
        let n = second_server.read(&mut buf).await.unwrap();
        assert!(!String::from_utf8_lossy(&buf[..n]).contains("Main.Mute=On"));
    }

    #[tokio::test]
    async fn remove_receiver_publishes_event() {
        let manager = ReceiverManager::new();
        let (connector, _server) = pipe();
        let id = manager.add_with_connector(connector, config()).await.unwrap();
        let handle = manager.receiver(id).await.unwrap();
        let mut events = manager.subscribe();

        assert!(manager.remove_receiver(id).await);

        loop {
            if let DeviceEvent::DeviceRemoved { device_id } = events.recv().await.unwrap() {
                assert_eq!(device_id, id);
                break;
            }
        }
        assert_eq!(manager.device_count().await, 0);
        assert!(matches!(
            handle.power_on().await,
            Err(Error::Protocol(ProtocolError::ChannelClosed(_)))
        ));
    }

    #[tokio::test]
    async fn remove_nonexistent_receiver_returns_false() {
        let manager = ReceiverManager::new();
        assert!(!manager.remove_receiver(DeviceId::new()).await);
    }

    #[tokio::test]
    async fn unknown_receiver_is_reported() {
        let manager = ReceiverManager::new();
        let id = DeviceId::new();

        assert!(manager.get_state(id).await.is_none());
        assert!(manager.watch_device(id).await.is_none());
        assert!(!manager.is_connected(id).await);
        assert!(matches!(
            manager.power_on(id).await,
            Err(Error::DeviceNotFound)
        ));
    }

    #[tokio::test]
    async fn shutdown_all_empties_manager() {
        let manager = ReceiverManager::new();
        let (first, _a) = pipe();
        let (second, _b) = pipe();
        manager.add_with_connector(first, config()).await.unwrap();
        manager.add_with_connector(second, config()).await.unwrap();

        manager.shutdown_all().await;

        assert_eq!(manager.device_count().await, 0);
    }

    #[test]
    fn clone_shares_event_bus() {
        let manager = ReceiverManager::new();
        let clone = manager.clone();

        let _rx = manager.subscribe();
        assert_eq!(clone.subscriber_count(), 1);
    }
}
