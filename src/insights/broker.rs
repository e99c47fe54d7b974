//! Insight broker
//!
//! In-process fan-out for "insight ready" notifications with a short-lived
//! replay cache. SSE handlers subscribe per check; whatever computed the
//! insight publishes once.
//!
//! One mutex guards the listener and cache maps; it is held only for
//! bookkeeping. Publishes use non-blocking sends, so a stuck subscriber is
//! skipped rather than blocking fan-out.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// How long a published payload stays replayable for late subscribers
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct Listener {
    token: u64,
    tx: mpsc::Sender<Value>,
}

struct Cached {
    payload: Value,
    published_at: Instant,
}

#[derive(Default)]
struct BrokerState {
    listeners: HashMap<Uuid, Vec<Listener>>,
    cache: HashMap<Uuid, Cached>,
    next_token: u64,
}

/// Process-wide insight notification broker.
///
/// In-memory only: a restart drops pending notifications, which is
/// acceptable because SSE clients reconnect and the replay cache covers the
/// gap for recent publishes.
pub struct InsightBroker {
    state: Mutex<BrokerState>,
    ttl: Duration,
}

impl InsightBroker {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_TTL)
    }

    /// Custom replay TTL; tests use short ones
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            ttl,
        }
    }

    /// Subscribe to the next insight for `check_id`.
    ///
    /// The subscription's channel is buffered with capacity 1. If a publish
    /// for the same check happened within the replay TTL, the cached payload
    /// is pre-loaded into the channel and the subscriber is NOT registered
    /// as a live listener: its first receive yields the replay and the
    /// channel then closes.
    pub fn subscribe(self: &Arc<Self>, check_id: Uuid) -> InsightSubscription {
        let (tx, rx) = mpsc::channel(1);

        let mut state = self.state.lock().expect("broker lock poisoned");

        if let Some(cached) = state.cache.get(&check_id) {
            if cached.published_at.elapsed() < self.ttl {
                // Buffered slot is empty, the send cannot fail
                let _ = tx.try_send(cached.payload.clone());
                debug!("Replayed cached insight for check {}", check_id);
                return InsightSubscription {
                    rx,
                    registration: None,
                };
            }
        }

        let token = state.next_token;
        state.next_token += 1;
        state
            .listeners
            .entry(check_id)
            .or_default()
            .push(Listener { token, tx });

        InsightSubscription {
            rx,
            registration: Some((Arc::clone(self), check_id, token)),
        }
    }

    /// Deliver `payload` to every live subscriber of `check_id` and cache it
    /// for late subscribers. Subscribers whose buffer is full are skipped.
    pub fn publish(&self, check_id: Uuid, payload: Value) {
        let mut state = self.state.lock().expect("broker lock poisoned");

        if let Some(listeners) = state.listeners.get(&check_id) {
            for listener in listeners {
                if listener.tx.try_send(payload.clone()).is_err() {
                    debug!(
                        "Skipping slow insight subscriber {} on check {}",
                        listener.token, check_id
                    );
                }
            }
        }

        state.cache.insert(
            check_id,
            Cached {
                payload,
                published_at: Instant::now(),
            },
        );
    }

    fn unsubscribe(&self, check_id: Uuid, token: u64) {
        let mut state = self.state.lock().expect("broker lock poisoned");

        let drained = match state.listeners.get_mut(&check_id) {
            Some(listeners) => {
                listeners.retain(|l| l.token != token);
                listeners.is_empty()
            }
            None => false,
        };
        if drained {
            state.listeners.remove(&check_id);
        }
    }

    #[cfg(test)]
    fn listener_count(&self, check_id: Uuid) -> usize {
        let state = self.state.lock().expect("broker lock poisoned");
        state.listeners.get(&check_id).map_or(0, |l| l.len())
    }
}

impl Default for InsightBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// A live (or replayed) subscription to a check's insight notifications.
///
/// Dropping the subscription unsubscribes; the broker drops its sender and
/// the channel closes.
pub struct InsightSubscription {
    rx: mpsc::Receiver<Value>,
    registration: Option<(Arc<InsightBroker>, Uuid, u64)>,
}

impl InsightSubscription {
    /// Next notification; `None` once the channel is closed and drained
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Unregister from the broker. Receives already buffered still drain;
    /// afterwards `recv` returns `None`.
    pub fn unsubscribe(&mut self) {
        if let Some((broker, check_id, token)) = self.registration.take() {
            broker.unsubscribe(check_id, token);
        }
    }
}

impl Drop for InsightSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_live_subscriber() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let mut sub = broker.subscribe(check);
        broker.publish(check, json!({"title": "t"}));

        assert_eq!(sub.recv().await, Some(json!({"title": "t"})));
    }

    #[tokio::test]
    async fn replay_within_ttl_preloads_channel() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        broker.publish(check, json!({"title": "t"}));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut sub = broker.subscribe(check);
        // No further publish needed; the payload was pre-loaded
        assert_eq!(sub.recv().await, Some(json!({"title": "t"})));
        // A replayed subscriber is not a live listener
        assert_eq!(broker.listener_count(check), 0);
        // ... and its channel closes after the replay drains
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn replayed_subscriber_misses_later_publishes() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        broker.publish(check, json!(1));
        let mut sub = broker.subscribe(check);
        assert_eq!(sub.recv().await, Some(json!(1)));

        broker.publish(check, json!(2));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn expired_cache_is_treated_as_absent() {
        let broker = Arc::new(InsightBroker::with_ttl(Duration::from_millis(20)));
        let check = Uuid::new_v4();

        broker.publish(check, json!(1));
        tokio::time::sleep(Duration::from_millis(40)).await;

        let mut sub = broker.subscribe(check);
        // Registered live, nothing replayed
        assert_eq!(broker.listener_count(check), 1);

        broker.publish(check, json!(2));
        assert_eq!(sub.recv().await, Some(json!(2)));
    }

    #[tokio::test]
    async fn unsubscribe_closes_channel_and_stops_delivery() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let mut sub = broker.subscribe(check);
        sub.unsubscribe();
        assert_eq!(broker.listener_count(check), 0);

        broker.publish(check, json!(1));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let sub = broker.subscribe(check);
        assert_eq!(broker.listener_count(check), 1);
        drop(sub);
        assert_eq!(broker.listener_count(check), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_is_skipped_not_blocked() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let mut sub = broker.subscribe(check);
        broker.publish(check, json!(1));
        // Buffer full: this publish skips the subscriber instead of blocking
        broker.publish(check, json!(2));

        assert_eq!(sub.recv().await, Some(json!(1)));

        // Still live; the next publish is delivered
        broker.publish(check, json!(3));
        assert_eq!(sub.recv().await, Some(json!(3)));
    }

    #[tokio::test]
    async fn single_subscriber_observes_publish_order() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let mut sub = broker.subscribe(check);
        broker.publish(check, json!(1));
        assert_eq!(sub.recv().await, Some(json!(1)));
        broker.publish(check, json!(2));
        assert_eq!(sub.recv().await, Some(json!(2)));
    }

    #[tokio::test]
    async fn fan_out_reaches_every_live_subscriber() {
        let broker = Arc::new(InsightBroker::new());
        let check = Uuid::new_v4();

        let mut first = broker.subscribe(check);
        let mut second = broker.subscribe(check);
        broker.publish(check, json!("x"));

        assert_eq!(first.recv().await, Some(json!("x")));
        assert_eq!(second.recv().await, Some(json!("x")));
    }

    #[tokio::test]
    async fn checks_are_isolated() {
        let broker = Arc::new(InsightBroker::new());
        let mut sub = broker.subscribe(Uuid::new_v4());

        broker.publish(Uuid::new_v4(), json!("other"));

        sub.unsubscribe();
        assert_eq!(sub.recv().await, None);
    }
}
