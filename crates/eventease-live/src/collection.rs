use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{Stream, StreamExt, select_all};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use eventease_api::{Backend, BackendError};
use eventease_gateway::{ChangeStream, FeedItem};
use eventease_types::api::Session;
use eventease_types::events::Watch;
use eventease_types::models::Draft;
use eventease_types::query::{Patch, Query};
use eventease_types::Record;

use crate::error::LiveError;
use crate::notice::Notices;

/// Per-entity configuration of a [`LiveCollection`].
pub trait LiveSpec: Send + Sync + 'static {
    type Row: Record;

    /// Everything derived from one fetch: the rows plus per-user partitions.
    type View: Clone + Default + Send + Sync + 'static;

    /// Plural used in log lines.
    const NAME: &'static str;

    /// Success notices for writes. `None` writes silently.
    const CREATED: Option<&'static str>;
    const UPDATED: Option<&'static str>;
    const DELETED: Option<&'static str>;

    /// Change feeds whose activity invalidates the view.
    fn watches(&self, user: Uuid) -> Vec<Watch>;

    /// Fetch the full collection (and any related rows) and derive the view.
    fn fetch<B: Backend>(
        &self,
        backend: &B,
        user: Uuid,
    ) -> impl Future<Output = Result<Self::View, BackendError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    /// Last fetch failed. The previous view is still served and push
    /// notifications are ignored until a manual trigger.
    Error,
}

/// All rows of a table, plus the ones the session user owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Owned<R> {
    pub all: Vec<R>,
    pub mine: Vec<R>,
}

impl<R> Default for Owned<R> {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            mine: Vec::new(),
        }
    }
}

impl<R: Record> Owned<R> {
    pub fn partition(all: Vec<R>, user: Uuid) -> Self {
        let mine = all.iter().filter(|r| r.owner() == user).cloned().collect();
        Self { all, mine }
    }

    pub fn find(&self, id: Uuid) -> Option<&R> {
        self.all.iter().find(|r| r.id() == id)
    }
}

struct State<V> {
    phase: Phase,
    view: V,
    error: Option<String>,
}

pub(crate) struct Shared<B, S: LiveSpec> {
    backend: B,
    spec: S,
    user: Uuid,
    notices: Notices,
    state: RwLock<State<S::View>>,
}

impl<B: Backend, S: LiveSpec> Shared<B, S> {
    async fn load(&self) -> Result<(), BackendError> {
        self.state.write().await.phase = Phase::Loading;

        // Overlapping loads are not coordinated: whichever finishes last
        // leaves its view behind.
        let result = self.spec.fetch(&self.backend, self.user).await;

        let mut state = self.state.write().await;
        match result {
            Ok(view) => {
                state.view = view;
                state.phase = Phase::Ready;
                state.error = None;
                debug!("Loaded {}", S::NAME);
                Ok(())
            }
            Err(e) => {
                state.phase = Phase::Error;
                state.error = Some(e.to_string());
                drop(state);

                self.notices.error(e.to_string());
                Err(e)
            }
        }
    }
}

/// A local, continuously resynchronized view of one backend table.
///
/// Mounting subscribes to the change feeds named by the [`LiveSpec`] and
/// performs the first load. Every mutation re-fetches on success, and so
/// does every change notification from any client. Dropping the collection
/// tears the subscriptions down.
pub struct LiveCollection<B: Backend, S: LiveSpec> {
    shared: Arc<Shared<B, S>>,
    watcher: JoinHandle<()>,
}

impl<B: Backend, S: LiveSpec> LiveCollection<B, S> {
    /// `backend` must act as `session`'s user.
    pub async fn mount(
        backend: B,
        spec: S,
        session: &Session,
        notices: Notices,
    ) -> Result<Self, LiveError> {
        let user = session.user_id();

        let streams = spec
            .watches(user)
            .into_iter()
            .map(|watch| backend.subscribe(watch).map(ChangeStream::into_stream))
            .collect::<Result<Vec<_>, _>>()?;

        let shared = Arc::new(Shared {
            backend,
            spec,
            user,
            notices,
            state: RwLock::new(State {
                phase: Phase::Uninitialized,
                view: S::View::default(),
                error: None,
            }),
        });

        let watcher = tokio::spawn(follow_changes(shared.clone(), streams));
        let collection = Self { shared, watcher };

        // A failed first load is recorded in the state, not returned.
        let _ = collection.load().await;
        Ok(collection)
    }

    pub async fn load(&self) -> Result<(), BackendError> {
        self.shared.load().await
    }

    pub async fn refetch(&self) -> Result<(), BackendError> {
        self.load().await
    }

    /// Insert a new row owned by the session user.
    pub async fn create<D>(&self, draft: D) -> Option<S::Row>
    where
        D: Draft<Record = S::Row>,
    {
        let record = draft.into_record(self.shared.user);
        self.commit(S::CREATED, self.shared.backend.insert(record))
            .await
    }

    /// Patch one of the session user's rows. Rows owned by someone else are
    /// left alone and still count as success.
    pub async fn update(&self, id: Uuid, patch: Patch) -> bool {
        let query = self.owned(id);
        let affected = self
            .commit(
                S::UPDATED,
                self.shared.backend.update::<S::Row>(query, patch),
            )
            .await;
        self.report_unmatched(id, affected)
    }

    /// Delete one of the session user's rows. Rows owned by someone else are
    /// left alone and still count as success.
    pub async fn remove(&self, id: Uuid) -> bool {
        let query = self.owned(id);
        let affected = self
            .commit(S::DELETED, self.shared.backend.delete::<S::Row>(query))
            .await;
        self.report_unmatched(id, affected)
    }

    pub async fn phase(&self) -> Phase {
        self.shared.state.read().await.phase
    }

    pub async fn is_loading(&self) -> bool {
        self.phase().await == Phase::Loading
    }

    /// Message of the last failed load, cleared by the next success.
    pub async fn error(&self) -> Option<String> {
        self.shared.state.read().await.error.clone()
    }

    /// The last successfully loaded view.
    pub async fn view(&self) -> S::View {
        self.shared.state.read().await.view.clone()
    }

    pub fn user(&self) -> Uuid {
        self.shared.user
    }

    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Whether the change-feed task is still running.
    pub fn is_following(&self) -> bool {
        !self.watcher.is_finished()
    }

    /// `id = ? AND owner = me`
    pub(crate) fn owned(&self, id: Uuid) -> Query {
        let table = <S::Row as Record>::TABLE;
        Query::new()
            .eq("id", id)
            .eq(table.owner_column(), self.shared.user)
    }

    /// Await a write. On success emit `success` (if any) and resync; on
    /// failure emit an error notice and leave the view alone.
    pub(crate) async fn commit<T>(
        &self,
        success: Option<&str>,
        write: impl Future<Output = Result<T, BackendError>>,
    ) -> Option<T> {
        match write.await {
            Ok(value) => {
                if let Some(message) = success {
                    self.shared.notices.success(message);
                }
                let _ = self.load().await;
                Some(value)
            }
            Err(e) => {
                self.shared.notices.error(e.to_string());
                None
            }
        }
    }

    fn report_unmatched(&self, id: Uuid, affected: Option<usize>) -> bool {
        match affected {
            Some(0) => {
                debug!("No {} row {} owned by {}", S::NAME, id, self.shared.user);
                true
            }
            Some(_) => true,
            None => false,
        }
    }
}

impl<B: Backend, S: LiveSpec> Drop for LiveCollection<B, S> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

async fn follow_changes<B, S, St>(shared: Arc<Shared<B, S>>, streams: Vec<St>)
where
    B: Backend,
    S: LiveSpec,
    St: Stream<Item = FeedItem> + Send + Unpin + 'static,
{
    let mut feed = select_all(streams);

    while let Some(item) = feed.next().await {
        match &item {
            FeedItem::Change(event) => {
                debug!("{:?} on {}, refreshing {}", event.kind, event.table, S::NAME)
            }
            FeedItem::Lagged(missed) => {
                warn!("{} feed lagged by {} change(s), refreshing", S::NAME, missed)
            }
        }

        if shared.state.read().await.phase == Phase::Error {
            debug!("Ignoring change while {} is in error", S::NAME);
            continue;
        }

        let _ = shared.load().await;
    }

    debug!("Change feed for {} closed", S::NAME);
}
