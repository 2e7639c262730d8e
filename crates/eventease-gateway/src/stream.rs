use futures_util::Stream;
use futures_util::stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};
use uuid::Uuid;

use eventease_types::events::{ChangeEvent, Watch};

/// What a subscriber gets from its feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    /// A change matching the subscription's watch.
    Change(ChangeEvent),
    /// The subscriber fell behind and this many events were dropped. The
    /// contents are unknown, so consumers should resynchronize.
    Lagged(u64),
}

/// One subscription on the change feed, scoped to a [`Watch`].
pub struct ChangeStream {
    id: Uuid,
    watch: Watch,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeStream {
    pub(crate) fn new(id: Uuid, watch: Watch, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { id, watch, rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn watch(&self) -> &Watch {
        &self.watch
    }

    /// Next matching item, or `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<FeedItem> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.watch.matches(&event) => return Some(FeedItem::Change(event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscription {} lagged, {} change(s) dropped", self.id, skipped);
                    return Some(FeedItem::Lagged(skipped));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = FeedItem> + Send + Unpin {
        Box::pin(stream::unfold(self, |mut sub| async move {
            let item = sub.recv().await?;
            Some((item, sub))
        }))
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        trace!("Subscription {} on {} closed", self.id, self.watch.table);
    }
}
