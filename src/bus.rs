//! Process-wide live event bus
//!
//! A single broadcast channel carries event envelopes from live runs to
//! push subscribers. Each subscription owns a forwarding task that turns
//! every envelope into an independent, fire-and-forget unit of work, so a
//! slow handler never stalls the broadcaster.

use std::future::Future;
use std::sync::OnceLock;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::event::EventEnvelope;

/// Broadcast capacity; subscribers further behind than this lose events
const BUS_CAPACITY: usize = 256;

static BUS: OnceLock<EventBus> = OnceLock::new();

/// The process-wide bus instance
pub fn global() -> &'static EventBus {
    BUS.get_or_init(EventBus::new)
}

/// Broadcast channel for live run events
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
    registered: watch::Sender<usize>,
}

impl EventBus {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        let (registered, _) = watch::channel(0);
        Self { tx, registered }
    }

    /// Publish one envelope to every current subscriber.
    /// Returns how many subscribers received it; 0 when nobody listens.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.tx.send(envelope).unwrap_or(0)
    }

    /// Number of live broadcast receivers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Attach a raw receiver to the broadcast stream
    pub fn subscribe_raw(&self) -> broadcast::Receiver<EventEnvelope> {
        let rx = self.tx.subscribe();
        let registrations = self.registered.borrow().saturating_add(1);
        self.registered.send_replace(registrations);
        debug!(subscribers = self.tx.receiver_count(), "subscriber attached");
        rx
    }

    /// Resolve once at least one subscription has ever been registered.
    ///
    /// Live runs hold here before their first suite starts, so a caller
    /// that subscribes right after launching a run cannot miss its first
    /// events. A subscriber that only attaches after the run was released
    /// can still miss early events.
    pub async fn ready(&self) {
        if *self.registered.borrow() > 0 {
            return;
        }

        let mut registrations = self.registered.subscribe();
        // wait_for inspects the current value before parking, so a
        // registration racing this call is not missed
        let _ = registrations.wait_for(|count| *count > 0).await;
    }
}

/// Register a handler invoked once per broadcast envelope.
///
/// Each invocation's future is spawned independently of the bus loop.
/// The returned guard unsubscribes when dropped. Must be called from
/// within a Tokio runtime.
pub fn subscribe<H, F>(mut handler: H) -> Subscription
where
    H: FnMut(EventEnvelope) -> F + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let mut rx = global().subscribe_raw();

    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    tokio::spawn(handler(envelope));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Subscription { task }
}

/// Active live-sink subscription.
///
/// Unsubscribing stops delivery of further envelopes; handler work already
/// spawned keeps running to completion. Idempotent, and also triggered by
/// dropping the guard.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Remove the handler. Safe to call more than once.
    pub fn unsubscribe(&self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Event;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn envelope(suite: &str) -> EventEnvelope {
        EventEnvelope::new(
            Uuid::new_v4(),
            Event::Complete {
                suite: suite.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_returns_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(envelope("bus-nobody")), 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_raw_subscriber() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_raw();

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.publish(envelope("bus-counted")), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.suite(), Some("bus-counted"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_envelope() {
        let (tx, mut rx) = mpsc::channel(8);

        let subscription = subscribe(move |envelope: EventEnvelope| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(envelope).await;
            }
        });

        // The forwarding task subscribes before `subscribe` returns, so
        // this publish cannot be missed
        global().publish(envelope("bus-delivery"));

        let received = loop {
            let received = timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("no envelope delivered")
                .expect("channel closed");
            if received.event.suite() == Some("bus-delivery") {
                break received;
            }
        };

        assert_eq!(received.event.suite(), Some("bus-delivery"));
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let subscription = subscribe(|_envelope: EventEnvelope| async {});

        subscription.unsubscribe();
        subscription.unsubscribe();
        drop(subscription);
    }

    #[tokio::test]
    async fn test_unsubscribed_handler_stops_receiving() {
        let (tx, mut rx) = mpsc::channel(8);

        let subscription = subscribe(move |envelope: EventEnvelope| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(envelope).await;
            }
        });

        subscription.unsubscribe();
        // Give the abort a moment to take effect
        tokio::time::sleep(Duration::from_millis(50)).await;

        global().publish(envelope("bus-after-unsubscribe"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        while let Ok(received) = rx.try_recv() {
            assert_ne!(received.event.suite(), Some("bus-after-unsubscribe"));
        }
    }

    #[tokio::test]
    async fn test_ready_resolves_once_a_subscriber_registers() {
        let bus = Arc::new(EventBus::new());

        let waiter_bus = bus.clone();
        let waiter = tokio::spawn(async move { waiter_bus.ready().await });
        tokio::task::yield_now().await;

        let _rx = bus.subscribe_raw();

        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ready did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_ready_returns_immediately_when_already_subscribed() {
        let bus = EventBus::new();
        let _rx = bus.subscribe_raw();

        timeout(Duration::from_millis(100), bus.ready())
            .await
            .expect("ready did not resolve");
    }
}
