//! Broadcast channels with scoped subscriptions.
//!
//! A [`Channel`] fans an event out to every live [`Subscription`]. Each
//! subscription owns its queue; the subscriber drains it from the owner
//! thread whenever it chooses to observe events. Dropping a subscription
//! detaches it - the channel holds only weak references and prunes dead
//! queues on the next broadcast, so there is no manual unsubscribe step
//! to forget.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

struct SubscriberQueue<T> {
    events: Mutex<VecDeque<T>>,
}

/// A multi-subscriber broadcast channel.
pub struct Channel<T: Clone> {
    subscribers: Mutex<Vec<Weak<SubscriberQueue<T>>>>,
}

impl<T: Clone> Channel<T> {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Attach a new subscription.
    ///
    /// The subscription receives every event broadcast after this call
    /// until it is dropped.
    pub fn subscribe(&self) -> Subscription<T> {
        let queue = Arc::new(SubscriberQueue {
            events: Mutex::new(VecDeque::new()),
        });
        self.subscribers.lock().push(Arc::downgrade(&queue));
        Subscription { queue }
    }

    /// Deliver an event to every live subscription.
    pub fn broadcast(&self, event: T) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| match weak.upgrade() {
            Some(queue) => {
                queue.events.lock().push_back(event.clone());
                true
            }
            None => false,
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| weak.strong_count() > 0);
        subscribers.len()
    }
}

impl<T: Clone> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's end of a [`Channel`].
///
/// Events accumulate in the subscription's queue until drained. Dropping
/// the subscription detaches it from the channel.
pub struct Subscription<T> {
    queue: Arc<SubscriberQueue<T>>,
}

impl<T> Subscription<T> {
    /// Take all queued events, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.queue.events.lock().drain(..).collect()
    }

    /// Whether any events are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.events.lock().is_empty()
    }
}
