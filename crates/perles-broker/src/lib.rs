#![deny(missing_docs)]
//! # perles-broker — non-blocking topic-based pub/sub
//!
//! A generic broker parameterized by payload type (`spec.md` §4.2).
//! `subscribe` returns a channel that yields `(topic, payload)` events
//! and closes when the caller's [`CancellationToken`] fires.
//! `publish` fans out to every live subscriber without blocking: a
//! subscriber whose channel is full simply misses that message.
//!
//! There is no ordering guarantee *between* subscribers, but delivery
//! to any single subscriber preserves publish order.

use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One delivered event: the topic it was published on, plus payload.
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// The topic the payload was published on.
    pub topic: String,
    /// The payload itself.
    pub payload: T,
}

struct Subscription<T> {
    id: u64,
    tx: mpsc::Sender<Event<T>>,
}

/// Default per-subscriber channel capacity when none is configured.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A topic broker. Cheap to clone (wrap in `Arc`); subscribe/publish are
/// the only two operations.
pub struct Broker<T> {
    subscribers: Mutex<Vec<Subscription<T>>>,
    next_id: AtomicU64,
    channel_capacity: usize,
}

impl<T> Broker<T>
where
    T: Clone + Send + 'static,
{
    /// Create a broker whose subscriber channels hold up to
    /// `channel_capacity` buffered events before messages start
    /// dropping for that subscriber.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Subscribe to every topic published on this broker. The returned
    /// receiver closes once `cancel` is triggered; until then it yields
    /// every event this broker publishes that this subscriber's buffer
    /// had room for.
    pub fn subscribe(self: &Arc<Self>, cancel: CancellationToken) -> mpsc::Receiver<Event<T>> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().expect("broker mutex poisoned").push(Subscription { id, tx });

        let broker = Arc::clone(self);
        tokio::spawn(async move {
            cancel.cancelled().await;
            broker
                .subscribers
                .lock()
                .expect("broker mutex poisoned")
                .retain(|s| s.id != id);
        });

        rx
    }

    /// Publish `payload` on `topic`. Delivery to each subscriber is
    /// non-blocking: a subscriber at capacity drops this message but
    /// stays subscribed. Subscribers whose receiver has been dropped
    /// (cancelled, or simply gone out of scope) are pruned here.
    pub fn publish(&self, topic: impl Into<String>, payload: T) {
        let topic = topic.into();
        let mut subs = self.subscribers.lock().expect("broker mutex poisoned");
        subs.retain(|s| match s.tx.try_send(Event { topic: topic.clone(), payload: payload.clone() }) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(topic = %topic, "broker: subscriber at capacity, dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Number of currently live subscribers. Useful for diagnostics and
    /// tests; not part of the delivery contract.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("broker mutex poisoned").len()
    }
}

impl<T> Default for Broker<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn delivers_published_events_to_subscriber() {
        let broker = Arc::new(Broker::<i32>::new(8));
        let mut rx = broker.subscribe(CancellationToken::new());

        broker.publish("topic-a", 1);
        broker.publish("topic-b", 2);

        let first = rx.recv().await.unwrap();
        assert_eq!((first.topic.as_str(), first.payload), ("topic-a", 1));
        let second = rx.recv().await.unwrap();
        assert_eq!((second.topic.as_str(), second.payload), ("topic-b", 2));
    }

    #[tokio::test]
    async fn cancelling_context_closes_the_channel() {
        let broker = Arc::new(Broker::<i32>::new(8));
        let cancel = CancellationToken::new();
        let mut rx = broker.subscribe(cancel.clone());

        cancel.cancel();
        // Give the cleanup task a chance to run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(broker.subscriber_count(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn slow_subscriber_drops_messages_without_blocking_publish() {
        let broker = Arc::new(Broker::<i32>::new(1));
        let rx = broker.subscribe(CancellationToken::new());

        // Fill the one-slot channel, then publish again: publish must
        // not block, and the second subscriber should be unaffected.
        broker.publish("t", 1);
        broker.publish("t", 2); // dropped: rx's buffer (cap 1) is full

        drop(rx); // avoid an unused-must-use warning on the oldest buffered item
        assert_eq!(broker.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn per_subscriber_order_matches_publish_order() {
        let broker = Arc::new(Broker::<i32>::new(16));
        let mut rx = broker.subscribe(CancellationToken::new());

        for i in 0..5 {
            broker.publish("t", i);
        }
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(rx.recv().await.unwrap().payload);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_every_event() {
        let broker = Arc::new(Broker::<i32>::new(16));
        let mut rx1 = broker.subscribe(CancellationToken::new());
        let mut rx2 = broker.subscribe(CancellationToken::new());

        broker.publish("t", 42);

        assert_eq!(rx1.recv().await.unwrap().payload, 42);
        assert_eq!(rx2.recv().await.unwrap().payload, 42);
    }
}
