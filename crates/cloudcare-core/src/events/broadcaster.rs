//! Emergency event broadcaster.
//!
//! The `EmergencyBroadcaster` is the single process-wide delivery point
//! between the write-side alert handlers and the streaming endpoint. It is
//! constructed once by the service's composition root and cloned into every
//! place that publishes or subscribes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};

use super::subscription::{FrameSource, Subscription};
use super::types::EmergencyEvent;

/// Default keepalive window: a ping is emitted after this long without an event.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// How published events reach subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// One FIFO queue shared by every subscriber. Each event is handed to
    /// exactly one waiting subscriber, and events published while nobody is
    /// connected stay queued until someone attaches.
    #[default]
    Shared,
    /// One queue per subscriber. Every subscriber connected at publish time
    /// receives every event; events published with no subscribers are dropped.
    Fanout,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Shared => "shared",
            DeliveryMode::Fanout => "fanout",
        }
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BroadcasterOptions {
    pub keepalive: Duration,
    pub delivery: DeliveryMode,
}

impl Default for BroadcasterOptions {
    fn default() -> Self {
        Self {
            keepalive: DEFAULT_KEEPALIVE,
            delivery: DeliveryMode::default(),
        }
    }
}

pub(crate) enum Delivery {
    Shared {
        sender: mpsc::UnboundedSender<EmergencyEvent>,
        queue: Arc<Mutex<mpsc::UnboundedReceiver<EmergencyEvent>>>,
    },
    Fanout {
        queues: DashMap<u64, mpsc::UnboundedSender<EmergencyEvent>>,
    },
}

pub(crate) struct BroadcasterInner {
    pub(crate) delivery: Delivery,
    pub(crate) keepalive: Duration,
    next_subscriber_id: AtomicU64,
    pub(crate) subscribers: AtomicUsize,
    published: AtomicU64,
}

impl BroadcasterInner {
    /// Called when a subscription is dropped.
    pub(crate) fn release(&self, subscriber_id: u64) {
        if let Delivery::Fanout { queues } = &self.delivery {
            queues.remove(&subscriber_id);
        }
        let remaining = self.subscribers.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(
            subscriber_id,
            subscribers = remaining,
            "Emergency stream subscriber detached"
        );
    }
}

/// Delivery point for emergency events.
///
/// Cheap to clone; all clones share the same queue(s).
///
/// # Example
///
/// ```
/// use cloudcare_core::events::{EmergencyBroadcaster, EmergencyEvent};
///
/// let broadcaster = EmergencyBroadcaster::new();
/// let event = EmergencyEvent::try_from(serde_json::json!({"alert_id": "A1"})).unwrap();
/// broadcaster.publish(event);
///
/// // Each streaming connection takes its own subscription:
/// let _subscription = broadcaster.subscribe();
/// ```
#[derive(Clone)]
pub struct EmergencyBroadcaster {
    inner: Arc<BroadcasterInner>,
}

impl EmergencyBroadcaster {
    /// Create a broadcaster with a 30 second keepalive and shared delivery.
    pub fn new() -> Self {
        Self::with_options(BroadcasterOptions::default())
    }

    pub fn with_options(options: BroadcasterOptions) -> Self {
        let delivery = match options.delivery {
            DeliveryMode::Shared => {
                let (sender, receiver) = mpsc::unbounded_channel();
                Delivery::Shared {
                    sender,
                    queue: Arc::new(Mutex::new(receiver)),
                }
            }
            DeliveryMode::Fanout => Delivery::Fanout {
                queues: DashMap::new(),
            },
        };

        Self {
            inner: Arc::new(BroadcasterInner {
                delivery,
                keepalive: options.keepalive,
                next_subscriber_id: AtomicU64::new(1),
                subscribers: AtomicUsize::new(0),
                published: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue an event for delivery. Never blocks and never fails.
    pub fn publish(&self, event: EmergencyEvent) {
        self.inner.published.fetch_add(1, Ordering::Relaxed);

        match &self.inner.delivery {
            Delivery::Shared { sender, .. } => {
                // The receiver lives inside `inner`, so the channel cannot be closed here.
                let _ = sender.send(event);
            }
            Delivery::Fanout { queues } => {
                if queues.is_empty() {
                    tracing::debug!(
                        alert_id = event.alert_id().unwrap_or_default(),
                        "No emergency stream subscribers, event dropped"
                    );
                    return;
                }

                let mut closed = Vec::new();
                for entry in queues.iter() {
                    if entry.value().send(event.clone()).is_err() {
                        closed.push(*entry.key());
                    }
                }
                for id in closed {
                    queues.remove(&id);
                }
            }
        }
    }

    /// Open a subscription for one streaming connection.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);

        let source = match &self.inner.delivery {
            Delivery::Shared { queue, .. } => FrameSource::Shared(queue.clone()),
            Delivery::Fanout { queues } => {
                let (sender, receiver) = mpsc::unbounded_channel();
                queues.insert(id, sender);
                FrameSource::Own(receiver)
            }
        };

        let count = self.inner.subscribers.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            subscriber_id = id,
            subscribers = count,
            delivery = %self.delivery_mode(),
            "Emergency stream subscriber attached"
        );

        Subscription::new(id, source, self.inner.clone())
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.load(Ordering::SeqCst)
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Total number of `publish` calls since construction.
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    pub fn keepalive(&self) -> Duration {
        self.inner.keepalive
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        match self.inner.delivery {
            Delivery::Shared { .. } => DeliveryMode::Shared,
            Delivery::Fanout { .. } => DeliveryMode::Fanout,
        }
    }
}

impl Default for EmergencyBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EmergencyBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmergencyBroadcaster")
            .field("delivery", &self.delivery_mode())
            .field("keepalive", &self.keepalive())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
