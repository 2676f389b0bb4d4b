use livepoll_models::WsEvent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Broadcast-based event bus for real-time dispatch.
///
/// Every registered session receives every published event; clients filter
/// by poll id. Publishing never blocks: each session owns a bounded
/// broadcast channel, and a receiver that lags past its buffer is the
/// session's problem (the gateway drops it on `Lagged`).
#[derive(Clone)]
pub struct EventBus {
    capacity: usize,
    sessions: Arc<RwLock<HashMap<String, broadcast::Sender<WsEvent>>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a subscriber handle; the returned receiver is the session's
    /// event feed until [`unregister_session`](Self::unregister_session).
    pub fn register_session(
        &self,
        session_id: impl Into<String>,
    ) -> broadcast::Receiver<WsEvent> {
        let (sender, receiver) = broadcast::channel(self.capacity.max(16));
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.insert(session_id.into(), sender);
        receiver
    }

    pub fn unregister_session(&self, session_id: &str) {
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.remove(session_id);
    }

    pub fn session_count(&self) -> usize {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.len()
    }

    /// Fan the event out to every registered session. Senders are snapshot
    /// first so no lock is held while sending.
    pub fn publish(&self, event: WsEvent) {
        let senders: Vec<broadcast::Sender<WsEvent>> = {
            let sessions = match self.sessions.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            sessions.values().cloned().collect()
        };

        tracing::debug!(
            event_type = event.event_type(),
            poll_id = event.poll_id(),
            subscribers = senders.len(),
            "publishing event"
        );
        for sender in senders {
            // A send error just means the session's receiver is already
            // gone; unregistration happens on its own path.
            let _ = sender.send(event.clone());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(poll_id: i64, option_order: i32) -> WsEvent {
        WsEvent::VoteDelta {
            poll_id,
            option_order,
            voter_user_id: Some(1),
            ts: 0,
        }
    }

    #[tokio::test]
    async fn every_session_receives_every_event() {
        let bus = EventBus::new(8);
        let mut rx_a = bus.register_session("a");
        let mut rx_b = bus.register_session("b");

        bus.publish(delta(1, 1));

        assert_eq!(rx_a.recv().await.unwrap().poll_id(), 1);
        assert_eq!(rx_b.recv().await.unwrap().poll_id(), 1);
    }

    #[tokio::test]
    async fn unregistered_session_stops_receiving() {
        let bus = EventBus::new(8);
        let mut rx = bus.register_session("a");
        bus.unregister_session("a");
        assert_eq!(bus.session_count(), 0);

        bus.publish(delta(1, 1));
        // The sender side was dropped at unregister, so the feed ends.
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn same_poll_events_arrive_in_publish_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.register_session("a");

        for order in 1..=5 {
            bus.publish(delta(7, order));
        }

        for expected in 1..=5 {
            match rx.recv().await.unwrap() {
                WsEvent::VoteDelta { option_order, .. } => assert_eq!(option_order, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }
}
