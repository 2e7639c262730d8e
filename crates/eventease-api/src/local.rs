use std::sync::Arc;

use serde_json::Value as Json;
use tracing::{debug, error, warn};
use uuid::Uuid;

use eventease_db::Database;
use eventease_gateway::{ChangeStream, Dispatcher};
use eventease_types::api::Session;
use eventease_types::events::{ChangeEvent, ChangeKind, Watch};
use eventease_types::models::{NewNotification, Notification};
use eventease_types::query::{Filter, Patch, Query, Value};
use eventease_types::schema::ReadPolicy;
use eventease_types::{Record, Table};

use crate::backend::Backend;
use crate::error::BackendError;
use crate::token;

/// Identity a [`LocalBackend`] handle acts as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Bypasses row-level policies. Used for server-side work such as
    /// delivering notifications.
    Service,
    User(Uuid),
}

/// SQLite-backed implementation of [`Backend`] with row-level policies:
/// owner-only reads on private tables, inserts only as yourself, and an
/// owner filter folded into every update and delete.
#[derive(Clone)]
pub struct LocalBackend {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    jwt_secret: Arc<str>,
    role: Role,
}

impl LocalBackend {
    /// A service-role handle. Derive user handles with [`Self::for_session`].
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            dispatcher,
            jwt_secret: jwt_secret.into(),
            role: Role::Service,
        }
    }

    /// A handle acting as the session's user, after checking its token.
    pub fn for_session(&self, session: &Session) -> Result<Self, BackendError> {
        let claims = token::verify_token(&self.jwt_secret, &session.access_token).map_err(|e| {
            warn!("Rejected session token: {}", e);
            BackendError::Unauthenticated
        })?;

        if claims.sub != session.user.id {
            warn!("Session user {} does not match token subject {}", session.user.id, claims.sub);
            return Err(BackendError::Unauthenticated);
        }

        Ok(self.as_user(claims.sub))
    }

    /// A handle acting as `user_id` without a token check. For callers that
    /// already authenticated the user.
    pub fn as_user(&self, user_id: Uuid) -> Self {
        Self {
            role: Role::User(user_id),
            ..self.clone()
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Deliver a notification to its recipient. Service role only.
    pub async fn notify(&self, draft: NewNotification) -> Result<Notification, BackendError> {
        if self.role != Role::Service {
            return Err(BackendError::Forbidden(
                "notifications are delivered by the service role".into(),
            ));
        }

        self.insert(draft.into_notification()).await
    }

    /// Run a store call off the async runtime.
    async fn blocking<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                BackendError::Store(e.to_string())
            })?
            .map_err(BackendError::classify)
    }

    fn scope_read(&self, table: Table, query: Query) -> Query {
        match (self.role, table.read_policy()) {
            (Role::User(user), ReadPolicy::OwnerOnly) => query.eq(table.owner_column(), user),
            _ => query,
        }
    }

    fn scope_write(&self, table: Table, query: Query) -> Query {
        match self.role {
            Role::User(user) => query.eq(table.owner_column(), user),
            Role::Service => query,
        }
    }

    fn publish(&self, table: Table, kind: ChangeKind, rows: Vec<Json>) -> usize {
        let count = rows.len();
        for record in rows {
            self.dispatcher.publish(ChangeEvent { table, kind, record });
        }
        count
    }
}

impl Backend for LocalBackend {
    async fn select<R: Record>(&self, query: Query) -> Result<Vec<R>, BackendError> {
        let query = self.scope_read(R::TABLE, query);
        let rows = self.blocking(move |db| db.select::<R>(&query)).await?;
        debug!("Selected {} row(s) from {}", rows.len(), R::TABLE);
        Ok(rows)
    }

    async fn insert<R: Record>(&self, record: R) -> Result<R, BackendError> {
        if let Role::User(user) = self.role {
            if record.owner() != user {
                return Err(BackendError::Forbidden(format!(
                    "cannot insert into {} on behalf of another user",
                    R::TABLE
                )));
            }
        }

        let row = serde_json::to_value(&record)
            .map_err(|e| BackendError::InvalidQuery(e.to_string()))?;
        let stored = self.blocking(move |db| db.insert_row(R::TABLE, &row)).await?;

        let inserted: R = serde_json::from_value(stored.clone())
            .map_err(|e| BackendError::Store(e.to_string()))?;
        self.publish(R::TABLE, ChangeKind::Insert, vec![stored]);
        debug!("Inserted {} into {}", inserted.id(), R::TABLE);

        Ok(inserted)
    }

    async fn update<R: Record>(&self, query: Query, patch: Patch) -> Result<usize, BackendError> {
        let table = R::TABLE;
        if self.role != Role::Service {
            if let Some((column, _)) = patch
                .sets
                .iter()
                .find(|(c, _)| *c == "id" || *c == table.owner_column())
            {
                return Err(BackendError::Forbidden(format!(
                    "column '{}' of {} cannot be changed",
                    column, table
                )));
            }
        }

        let query = self.scope_write(table, query);
        let rows = self
            .blocking(move |db| db.update_rows(table, &query, &patch))
            .await?;

        let affected = self.publish(table, ChangeKind::Update, rows);
        debug!("Updated {} row(s) in {}", affected, table);
        Ok(affected)
    }

    async fn delete<R: Record>(&self, query: Query) -> Result<usize, BackendError> {
        let table = R::TABLE;
        let query = self.scope_write(table, query);
        let rows = self.blocking(move |db| db.delete_rows(table, &query)).await?;

        let affected = self.publish(table, ChangeKind::Delete, rows);
        debug!("Deleted {} row(s) from {}", affected, table);
        Ok(affected)
    }

    fn subscribe(&self, watch: Watch) -> Result<ChangeStream, BackendError> {
        // Private tables only stream the subscriber's own rows.
        let watch = match (self.role, watch.table.read_policy()) {
            (Role::User(user), ReadPolicy::OwnerOnly) => {
                let owner = watch.table.owner_column();
                let foreign = watch
                    .filter
                    .as_ref()
                    .is_some_and(|f| f.column == owner && f.value != Value::from(user));
                if foreign {
                    return Err(BackendError::Forbidden(format!(
                        "cannot follow another user's {}",
                        watch.table
                    )));
                }
                Watch::filtered(watch.table, Filter::eq(owner, user))
            }
            _ => watch,
        };

        Ok(self.dispatcher.subscribe(watch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use eventease_gateway::FeedItem;
    use eventease_types::models::{Draft, Event, NewEvent, NewRegistration, Registration};

    fn backend() -> LocalBackend {
        let db = Arc::new(Database::open_in_memory().unwrap());
        LocalBackend::new(db, Dispatcher::new(), "test-secret")
    }

    fn new_event(name: &str) -> NewEvent {
        NewEvent {
            name: name.into(),
            event_type: "Conference".into(),
            description: None,
            event_date: Utc::now() + Duration::days(1),
            location: "Main Hall".into(),
            budget: None,
            max_attendees: None,
        }
    }

    #[tokio::test]
    async fn users_cannot_insert_for_someone_else() {
        let service = backend();
        let alice = service.as_user(Uuid::new_v4());

        let err = alice
            .insert(new_event("x").into_record(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Forbidden(_)));
    }

    #[tokio::test]
    async fn non_owner_delete_matches_nothing() {
        let service = backend();
        let alice_id = Uuid::new_v4();
        let alice = service.as_user(alice_id);
        let bob = service.as_user(Uuid::new_v4());

        let event = alice.insert(new_event("Tech Conf").into_record(alice_id)).await.unwrap();

        // Bob omits the owner filter; the policy adds it anyway.
        let removed = bob.delete::<Event>(Query::new().eq("id", event.id)).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(bob.select::<Event>(Query::new()).await.unwrap().len(), 1);

        let removed = alice.delete::<Event>(Query::new().eq("id", event.id)).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let service = backend();
        let user = Uuid::new_v4();
        let alice = service.as_user(user);
        let event = alice.insert(new_event("conf").into_record(user)).await.unwrap();

        let reg = NewRegistration { event_id: event.id };
        alice.insert(reg.into_record(user)).await.unwrap();
        let err = alice.insert(reg.into_record(user)).await.unwrap_err();

        assert!(matches!(err, BackendError::Conflict(_)));
        assert_eq!(alice.select::<Registration>(Query::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notifications_are_private() {
        let service = backend();
        let alice_id = Uuid::new_v4();
        let bob_id = Uuid::new_v4();

        for user_id in [alice_id, bob_id] {
            service
                .notify(NewNotification {
                    user_id,
                    title: "Welcome".into(),
                    message: "Hello".into(),
                    kind: None,
                    link: None,
                })
                .await
                .unwrap();
        }

        let seen: Vec<Notification> =
            service.as_user(alice_id).select(Query::new()).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].user_id, alice_id);

        let all: Vec<Notification> = service.select(Query::new()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn users_cannot_deliver_notifications() {
        let service = backend();
        let alice = service.as_user(Uuid::new_v4());
        let err = alice
            .notify(NewNotification {
                user_id: Uuid::new_v4(),
                title: "spam".into(),
                message: "spam".into(),
                kind: None,
                link: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Forbidden(_)));
    }

    #[tokio::test]
    async fn owner_column_cannot_be_reassigned() {
        let service = backend();
        let user = Uuid::new_v4();
        let alice = service.as_user(user);
        let event = alice.insert(new_event("conf").into_record(user)).await.unwrap();

        let patch = Patch::new().set("creator_id", Uuid::new_v4());
        let err = alice
            .update::<Event>(Query::new().eq("id", event.id), patch)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Forbidden(_)));
    }

    #[tokio::test]
    async fn writes_are_published_as_changes() {
        let service = backend();
        let user = Uuid::new_v4();
        let alice = service.as_user(user);
        let mut feed = alice.subscribe(Watch::table(Table::Events)).unwrap();

        let event = alice.insert(new_event("conf").into_record(user)).await.unwrap();

        match feed.recv().await {
            Some(FeedItem::Change(change)) => {
                assert_eq!(change.kind, ChangeKind::Insert);
                assert_eq!(change.record["id"], serde_json::json!(event.id));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_columns_are_invalid_queries() {
        let service = backend();
        let err = service
            .select::<Event>(Query::new().ascending("1; DROP TABLE events"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn subscribing_to_another_users_notifications_is_refused() {
        let service = backend();
        let alice = service.as_user(Uuid::new_v4());
        let watch = Watch::filtered(Table::Notifications, Filter::eq("user_id", Uuid::new_v4()));
        assert!(matches!(alice.subscribe(watch), Err(BackendError::Forbidden(_))));
    }
}
