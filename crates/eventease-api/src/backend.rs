use std::future::Future;

use eventease_gateway::ChangeStream;
use eventease_types::Record;
use eventease_types::events::Watch;
use eventease_types::query::{Patch, Query};

use crate::error::BackendError;

/// Client view of the hosted backend: row queries, equality-filtered writes
/// and change subscriptions. Implementations apply their own row-level
/// authorization; callers still scope writes to the session user so that a
/// write against someone else's row matches nothing.
pub trait Backend: Send + Sync + 'static {
    /// Rows of `R`'s table matching `query`, in the requested order.
    fn select<R: Record>(
        &self,
        query: Query,
    ) -> impl Future<Output = Result<Vec<R>, BackendError>> + Send;

    /// Insert a row and return it as stored.
    fn insert<R: Record>(&self, record: R) -> impl Future<Output = Result<R, BackendError>> + Send;

    /// Update rows matching `query.filters`. Returns the affected count,
    /// which is zero when nothing matched or nothing was visible.
    fn update<R: Record>(
        &self,
        query: Query,
        patch: Patch,
    ) -> impl Future<Output = Result<usize, BackendError>> + Send;

    /// Delete rows matching `query.filters`. Returns the affected count.
    fn delete<R: Record>(
        &self,
        query: Query,
    ) -> impl Future<Output = Result<usize, BackendError>> + Send;

    /// Open a change subscription. Dropping the stream closes it.
    fn subscribe(&self, watch: Watch) -> Result<ChangeStream, BackendError>;
}
