use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use eventease_api::{Backend, BackendError};
use eventease_types::Table;
use eventease_types::events::Watch;
use eventease_types::models::{Draft, Event, NewRegistration, Registration};
use eventease_types::query::Query;

use crate::collection::{LiveCollection, LiveSpec};

/// An event with its registration data for the session user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEntry {
    #[serde(flatten)]
    pub event: Event,
    pub registration_count: usize,
    pub is_registered: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventsView {
    /// Every event, soonest first.
    pub all: Vec<EventEntry>,
    pub mine: Vec<EventEntry>,
    pub registered: Vec<EventEntry>,
}

impl EventsView {
    pub fn derive(events: Vec<Event>, registrations: &[Registration], user: Uuid) -> Self {
        let all: Vec<EventEntry> = events
            .into_iter()
            .map(|event| {
                let mut registration_count = 0;
                let mut is_registered = false;
                for r in registrations.iter().filter(|r| r.event_id == event.id) {
                    registration_count += 1;
                    is_registered |= r.user_id == user;
                }

                EventEntry {
                    event,
                    registration_count,
                    is_registered,
                }
            })
            .collect();

        let mine = all
            .iter()
            .filter(|e| e.event.creator_id == user)
            .cloned()
            .collect();
        let registered = all.iter().filter(|e| e.is_registered).cloned().collect();

        Self {
            all,
            mine,
            registered,
        }
    }

    pub fn find(&self, id: Uuid) -> Option<&EventEntry> {
        self.all.iter().find(|e| e.event.id == id)
    }
}

/// Events, joined with the registrations table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventsSpec;

impl LiveSpec for EventsSpec {
    type Row = Event;
    type View = EventsView;

    const NAME: &'static str = "events";
    const CREATED: Option<&'static str> = Some("Event created successfully!");
    const UPDATED: Option<&'static str> = Some("Event updated");
    const DELETED: Option<&'static str> = Some("Event deleted");

    fn watches(&self, _user: Uuid) -> Vec<Watch> {
        vec![
            Watch::table(Table::Events),
            Watch::table(Table::EventRegistrations),
        ]
    }

    async fn fetch<B: Backend>(&self, backend: &B, user: Uuid) -> Result<EventsView, BackendError> {
        let events = backend
            .select::<Event>(Query::new().ascending("event_date"))
            .await?;
        let registrations = backend.select::<Registration>(Query::new()).await?;

        debug!(
            "Fetched {} event(s) and {} registration(s)",
            events.len(),
            registrations.len()
        );
        Ok(EventsView::derive(events, &registrations, user))
    }
}

pub type EventCollection<B> = LiveCollection<B, EventsSpec>;

impl<B: Backend> LiveCollection<B, EventsSpec> {
    /// Register the session user for an event. A second registration for
    /// the same event is refused by the backend.
    pub async fn register(&self, event_id: Uuid) -> bool {
        let registration = NewRegistration { event_id }.into_record(self.user());
        self.commit(
            Some("Registered for event!"),
            self.backend().insert(registration),
        )
        .await
        .is_some()
    }

    pub async fn unregister(&self, event_id: Uuid) -> bool {
        let query = Query::new()
            .eq("event_id", event_id)
            .eq("user_id", self.user());
        self.commit(
            Some("Unregistered from event"),
            self.backend().delete::<Registration>(query),
        )
        .await
        .is_some()
    }
}

/// Browse filters for the events list. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Case-insensitive match against name, location and description.
    pub search: String,
    pub event_type: Option<String>,
    pub upcoming_only: bool,
}

impl EventFilter {
    pub fn matches(&self, entry: &EventEntry, now: DateTime<Utc>) -> bool {
        let event = &entry.event;

        if self.upcoming_only && event.event_date < now {
            return false;
        }

        if let Some(kind) = &self.event_type {
            if !event.event_type.eq_ignore_ascii_case(kind) {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || event.name.to_lowercase().contains(&needle)
            || event.location.to_lowercase().contains(&needle)
            || event
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    pub fn apply<'a>(&self, entries: &'a [EventEntry], now: DateTime<Utc>) -> Vec<&'a EventEntry> {
        entries.iter().filter(|e| self.matches(e, now)).collect()
    }
}
