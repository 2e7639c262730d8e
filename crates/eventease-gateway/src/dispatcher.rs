use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use eventease_types::events::{ChangeEvent, Watch};

use crate::stream::ChangeStream;

/// Capacity of the change ring. Slow subscribers that fall further behind
/// see a lag marker instead of the dropped events.
const CHANNEL_CAPACITY: usize = 1024;

/// Fans row-change events out to every subscriber.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for change events. Every subscription holds a
    /// receiver and filters on its own watch.
    broadcast_tx: broadcast::Sender<ChangeEvent>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to changes matching `watch`. Dropping the stream
    /// unsubscribes.
    pub fn subscribe(&self, watch: Watch) -> ChangeStream {
        let id = Uuid::new_v4();
        trace!("Subscription {} opened on {}", id, watch.table);
        ChangeStream::new(id, watch, self.inner.broadcast_tx.subscribe())
    }

    /// Publish a change to all subscribers. Returns how many receivers were
    /// live; zero is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        trace!("Publishing {:?} on {}", event.kind, event.table);
        self.inner.broadcast_tx.send(event).unwrap_or(0)
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}
