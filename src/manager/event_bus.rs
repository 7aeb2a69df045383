// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan-out of receiver events to manager subscribers.

use tokio::sync::broadcast;

use crate::event::DeviceEvent;

/// Events buffered per subscriber before the slowest one starts lagging.
pub(crate) const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Sending half shared by the manager and every receiver's forwarders.
///
/// A subscriber that falls `capacity` events behind skips ahead and sees
/// `RecvError::Lagged`; the receivers themselves never wait on it.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub(crate) fn publish(&self, event: DeviceEvent) {
        let device = event.device_id().short();
        match self.sender.send(event) {
            Ok(delivered) => tracing::trace!(device = %device, delivered, "Event published"),
            Err(_) => tracing::trace!(device = %device, "Event dropped, nobody subscribed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceId;
    use crate::state::{DeviceState, Event};
    use crate::types::PowerState;

    fn power_on(device_id: DeviceId) -> DeviceEvent {
        let mut state = DeviceState::new();
        let event = Event::PowerChanged(PowerState::On);
        state.apply(&event);
        DeviceEvent::state_changed(device_id, event, state)
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        let id = DeviceId::new();

        bus.publish(DeviceEvent::device_added(id));

        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::device_added(id));
    }

    #[test]
    fn events_keep_publish_order_per_subscriber() {
        let bus = EventBus::new(DEFAULT_EVENT_CAPACITY);
        let mut hall = bus.subscribe();
        let mut kitchen = bus.subscribe();
        let id = DeviceId::new();

        bus.publish(DeviceEvent::device_added(id));
        bus.publish(power_on(id));
        bus.publish(DeviceEvent::disconnected(id));

        for rx in [&mut hall, &mut kitchen] {
            assert!(rx.try_recv().unwrap().is_lifecycle());
            assert!(rx.try_recv().unwrap().is_state_change());
            assert!(rx.try_recv().unwrap().is_connection());
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn late_subscriber_only_sees_later_events() {
        let bus = EventBus::new(DEFAULT_EVENT_CAPACITY);
        let id = DeviceId::new();
        bus.publish(DeviceEvent::device_added(id));

        let mut rx = bus.subscribe();
        bus.publish(DeviceEvent::device_removed(id));

        assert_eq!(rx.try_recv().unwrap(), DeviceEvent::device_removed(id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_not_counted() {
        let bus = EventBus::new(DEFAULT_EVENT_CAPACITY);
        let rx = bus.subscribe();
        let shared = bus.clone();
        assert_eq!(shared.subscriber_count(), 1);

        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(DeviceEvent::device_added(DeviceId::new()));
    }

    #[tokio::test]
    async fn slow_subscriber_skips_to_newest() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let id = DeviceId::new();

        bus.publish(DeviceEvent::connected(id));
        bus.publish(power_on(id));
        bus.publish(DeviceEvent::disconnected(id));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert!(rx.recv().await.unwrap().is_state_change());
        assert_eq!(rx.recv().await.unwrap(), DeviceEvent::disconnected(id));
    }
}
