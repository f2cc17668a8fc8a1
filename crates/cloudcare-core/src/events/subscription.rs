//! Per-connection subscriber loop.

use std::sync::Arc;
use std::time::Duration;

use futures_util::Stream;
use futures_util::stream;
use tokio::sync::{Mutex, mpsc};

use super::broadcaster::BroadcasterInner;
use super::connection::ConnectionLiveness;
use super::types::{EmergencyEvent, StreamFrame};
use crate::error::{CoreError, Result};

pub(crate) enum FrameSource {
    /// Shared FIFO; whoever holds the lock receives the next event.
    Shared(Arc<Mutex<mpsc::UnboundedReceiver<EmergencyEvent>>>),
    /// Private queue registered with the broadcaster.
    Own(mpsc::UnboundedReceiver<EmergencyEvent>),
}

impl FrameSource {
    // Both branches are cancel-safe: dropping the future never loses an event.
    async fn recv(&mut self) -> Option<EmergencyEvent> {
        match self {
            FrameSource::Shared(queue) => queue.lock().await.recv().await,
            FrameSource::Own(receiver) => receiver.recv().await,
        }
    }
}

/// One streaming connection's view of the broadcaster.
///
/// Dropping the subscription releases its slot (and its private queue in
/// fanout mode).
pub struct Subscription {
    id: u64,
    source: FrameSource,
    keepalive: Duration,
    broadcaster: Arc<BroadcasterInner>,
}

impl Subscription {
    pub(crate) fn new(id: u64, source: FrameSource, broadcaster: Arc<BroadcasterInner>) -> Self {
        Self {
            id,
            keepalive: broadcaster.keepalive,
            source,
            broadcaster,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event, at most one keepalive window.
    ///
    /// Returns a ping frame when the window elapses without an event.
    pub async fn next_frame(&mut self) -> Result<StreamFrame> {
        match tokio::time::timeout(self.keepalive, self.source.recv()).await {
            Ok(Some(event)) => Ok(StreamFrame::Alert(event)),
            Ok(None) => Err(CoreError::QueueClosed),
            Err(_elapsed) => Ok(StreamFrame::ping()),
        }
    }

    /// Turn the subscription into the lazy, unending frame sequence for one
    /// connection.
    ///
    /// The sequence ends when `connection` reports the client gone (checked
    /// before every wait and raced against the wait itself) or when waiting
    /// fails; failures are logged and never propagate.
    pub fn into_frames<C>(self, connection: C) -> impl Stream<Item = StreamFrame> + Send
    where
        C: ConnectionLiveness,
    {
        stream::unfold((self, connection), |(mut subscription, connection)| async move {
            if !connection.is_connected() {
                tracing::debug!(
                    subscriber_id = subscription.id,
                    "Emergency stream client disconnected"
                );
                return None;
            }

            let next = tokio::select! {
                biased;
                _ = connection.disconnected() => None,
                frame = subscription.next_frame() => Some(frame),
            };

            match next {
                Some(Ok(frame)) => Some((frame, (subscription, connection))),
                Some(Err(e)) => {
                    tracing::warn!(
                        subscriber_id = subscription.id,
                        error = %e,
                        "Emergency stream failed, closing"
                    );
                    None
                }
                None => {
                    tracing::debug!(
                        subscriber_id = subscription.id,
                        "Emergency stream client disconnected while waiting"
                    );
                    None
                }
            }
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.release(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}
