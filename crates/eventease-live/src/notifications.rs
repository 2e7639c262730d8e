use uuid::Uuid;

use eventease_api::{Backend, BackendError};
use eventease_types::Table;
use eventease_types::events::Watch;
use eventease_types::models::Notification;
use eventease_types::query::{Filter, Patch, Query};

use crate::collection::{LiveCollection, LiveSpec};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationsView {
    /// Newest first.
    pub all: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationsView {
    pub fn derive(all: Vec<Notification>) -> Self {
        let unread_count = all.iter().filter(|n| !n.is_read).count();
        Self { all, unread_count }
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.all.iter().filter(|n| !n.is_read)
    }
}

/// The session user's own notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationsSpec;

impl LiveSpec for NotificationsSpec {
    type Row = Notification;
    type View = NotificationsView;

    const NAME: &'static str = "notifications";
    const CREATED: Option<&'static str> = Some("Notification sent");
    const UPDATED: Option<&'static str> = None;
    const DELETED: Option<&'static str> = None;

    fn watches(&self, user: Uuid) -> Vec<Watch> {
        vec![Watch::filtered(
            Table::Notifications,
            Filter::eq("user_id", user),
        )]
    }

    async fn fetch<B: Backend>(&self, backend: &B, user: Uuid) -> Result<NotificationsView, BackendError> {
        let query = Query::new()
            .eq("user_id", user)
            .descending("created_at");
        let notifications = backend.select::<Notification>(query).await?;
        Ok(NotificationsView::derive(notifications))
    }
}

pub type NotificationCollection<B> = LiveCollection<B, NotificationsSpec>;

impl<B: Backend> LiveCollection<B, NotificationsSpec> {
    pub async fn mark_as_read(&self, id: Uuid) -> bool {
        let patch = Patch::new().set("is_read", true);
        self.commit(None, self.backend().update::<Notification>(self.owned(id), patch))
            .await
            .is_some()
    }

    pub async fn mark_all_as_read(&self) -> bool {
        let query = Query::new()
            .eq("user_id", self.user())
            .eq("is_read", false);
        let patch = Patch::new().set("is_read", true);
        self.commit(
            Some("All notifications marked as read"),
            self.backend().update::<Notification>(query, patch),
        )
        .await
        .is_some()
    }
}
