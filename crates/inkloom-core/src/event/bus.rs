//! Broadcast event bus for distributing `RunEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op,
//! so the engine emits unconditionally and never blocks on slow consumers.

use inkloom_types::event::{NodeEvent, RunEvent};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Multi-consumer bus for per-node lifecycle events.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    /// Scope a node event to its run and publish it.
    pub fn publish_node(&self, run_id: Uuid, event: NodeEvent) {
        self.publish(RunEvent { run_id, event });
    }

    /// Access the underlying broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<RunEvent> {
        &self.sender
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloom_types::event::NodeEventStatus;

    fn sample_event(node_id: &str) -> NodeEvent {
        NodeEvent::now(node_id, "chapter_writer", NodeEventStatus::Started, "started")
    }

    #[tokio::test]
    async fn publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let run_id = Uuid::now_v7();

        bus.publish_node(run_id, sample_event("n1"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.run_id, run_id);
        assert_eq!(received.event.node_id, "n1");
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish_node(Uuid::now_v7(), sample_event("n1"));

        assert_eq!(rx1.recv().await.unwrap().event.node_id, "n1");
        assert_eq!(rx2.recv().await.unwrap().event.node_id, "n1");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        // No subscribers -- should not panic
        bus.publish_node(Uuid::now_v7(), sample_event("n1"));
        bus.publish_node(Uuid::now_v7(), sample_event("n2"));
    }

    #[tokio::test]
    async fn lagged_receiver_handles_gracefully() {
        let bus = EventBus::new(4); // Small capacity to trigger lag
        let mut rx = bus.subscribe();

        // Publish more events than the channel capacity
        for i in 0..10 {
            bus.publish_node(Uuid::now_v7(), sample_event(&format!("n{i}")));
        }

        // Receiver may get a Lagged error -- should not panic
        match rx.try_recv() {
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        // Publish via clone, receive via original's subscriber
        bus2.publish_node(Uuid::now_v7(), sample_event("n1"));

        assert!(rx.try_recv().is_ok());
    }
}
