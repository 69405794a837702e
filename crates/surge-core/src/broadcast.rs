//! Fan-out of market updates to live subscribers.
//!
//! Every subscriber owns a bounded queue. [`BroadcastHub::publish`]
//! serializes a message once and offers the payload to every queue without
//! blocking; when a queue is full its oldest entry is discarded. A slow or
//! dead subscriber therefore never delays the tick loop or other
//! subscribers.
//!
//! The subscriber set and each queue sit behind their own mutex. A queue is
//! closed under its own mutex, so once [`BroadcastHub::unsubscribe`] returns
//! nothing further is enqueued for that subscriber.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised by the hub itself. Slow or disconnected subscribers are
/// never an error.
#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// The message could not be serialized to JSON.
    #[error("failed to serialize broadcast message: {source}")]
    Serialization {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

/// Opaque identity of one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the payload was offered to.
    pub delivered: usize,
    /// Subscribers whose queue was full, so their oldest entry was dropped.
    pub dropped: usize,
}

/// Hub-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Current number of subscribers.
    pub subscribers: usize,
    /// Messages published since startup.
    pub published: u64,
    /// Queued payloads discarded by drop-oldest since startup.
    pub dropped: u64,
}

#[derive(Debug)]
struct SubscriberQueue {
    buffer: Mutex<VecDeque<Arc<str>>>,
    notify: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl SubscriberQueue {
    fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        }
    }

    /// Returns `None` if the queue is closed, otherwise whether an entry was
    /// dropped to make room.
    fn offer(&self, payload: &Arc<str>, capacity: usize) -> Option<bool> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        let mut overflowed = false;
        while buffer.len() >= capacity {
            buffer.pop_front();
            overflowed = true;
        }
        buffer.push_back(Arc::clone(payload));
        drop(buffer);
        if overflowed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
        Some(overflowed)
    }

    fn close(&self) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        self.closed.store(true, Ordering::Release);
        buffer.clear();
        drop(buffer);
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<Arc<str>> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

#[derive(Debug)]
struct HubInner {
    subscribers: Mutex<HashMap<SubscriberId, Arc<SubscriberQueue>>>,
    capacity: usize,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        match removed {
            Some(queue) => {
                queue.close();
                true
            }
            None => false,
        }
    }
}

/// Registry of subscribers and their outbound queues.
///
/// Cloning is cheap and every clone refers to the same subscriber set.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// A hub whose subscribers buffer up to `capacity` messages each
    /// (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> SubscriberHandle {
        let id = SubscriberId::new();
        let queue = Arc::new(SubscriberQueue::new(self.inner.capacity));
        let count = {
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.insert(id, Arc::clone(&queue));
            subscribers.len()
        };
        info!(subscriber = %id, subscribers = count, "Subscriber registered");
        SubscriberHandle {
            id,
            queue,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber and close its queue.
    ///
    /// Returns `false` if the subscriber was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            info!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    /// Serialize `message` once and offer it to every subscriber.
    pub fn publish<T: Serialize>(&self, message: &T) -> Result<PublishReport, BroadcastError> {
        let payload: Arc<str> = Arc::from(serde_json::to_string(message)?);
        Ok(self.publish_payload(&payload))
    }

    /// Offer an already serialized payload to every subscriber.
    pub fn publish_payload(&self, payload: &Arc<str>) -> PublishReport {
        let queues: Vec<Arc<SubscriberQueue>> = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut report = PublishReport::default();
        for queue in &queues {
            if let Some(overflowed) = queue.offer(payload, self.inner.capacity) {
                report.delivered = report.delivered.saturating_add(1);
                if overflowed {
                    report.dropped = report.dropped.saturating_add(1);
                }
            }
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        if report.dropped > 0 {
            self.inner
                .dropped
                .fetch_add(u64::try_from(report.dropped).unwrap_or(u64::MAX), Ordering::Relaxed);
            warn!(
                lagging = report.dropped,
                "Subscribers lagging, oldest updates dropped"
            );
        }
        debug!(delivered = report.delivered, "Update published");
        report
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Hub-wide counters.
    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscriber_count(),
            published: self.inner.published.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Receiving end of one subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct SubscriberHandle {
    id: SubscriberId,
    queue: Arc<SubscriberQueue>,
    hub: Weak<HubInner>,
}

impl SubscriberHandle {
    /// This subscriber's identity.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next payload. Returns `None` once unsubscribed.
    pub async fn recv(&self) -> Option<Arc<str>> {
        loop {
            let notified = self.queue.notify.notified();
            if let Some(payload) = self.queue.try_pop() {
                return Some(payload);
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Take the next payload if one is queued.
    pub fn try_recv(&self) -> Option<Arc<str>> {
        self.queue.try_pop()
    }

    /// Whether the hub has closed this subscription.
    pub fn is_closed(&self) -> bool {
        self.queue.closed.load(Ordering::Acquire)
    }

    /// Payloads this subscriber lost to drop-oldest.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade()
            && hub.remove(self.id)
        {
            debug!(subscriber = %self.id, "Subscriber handle dropped");
        }
    }
}
