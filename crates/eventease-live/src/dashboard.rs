use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::events::{EventEntry, EventsView};
use crate::notifications::NotificationsView;

/// How far ahead "upcoming" looks.
const UPCOMING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_events: usize,
    /// Events in the next 30 days.
    pub upcoming_events: usize,
    pub registered_events: usize,
    /// Events the user created this calendar month.
    pub created_this_month: usize,
    pub unread_notifications: usize,
}

impl DashboardStats {
    pub fn compute(events: &EventsView, notifications: &NotificationsView, now: DateTime<Utc>) -> Self {
        let horizon = now + Duration::days(UPCOMING_WINDOW_DAYS);

        Self {
            total_events: events.all.len(),
            upcoming_events: events
                .all
                .iter()
                .filter(|e| e.event.event_date >= now && e.event.event_date <= horizon)
                .count(),
            registered_events: events.registered.len(),
            created_this_month: events
                .mine
                .iter()
                .filter(|e| {
                    e.event.created_at.year() == now.year()
                        && e.event.created_at.month() == now.month()
                })
                .count(),
            unread_notifications: notifications.unread_count,
        }
    }
}

/// Events grouped by the (UTC) day they take place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calendar {
    days: BTreeMap<NaiveDate, Vec<EventEntry>>,
}

impl Calendar {
    pub fn build(entries: &[EventEntry]) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<EventEntry>> = BTreeMap::new();
        for entry in entries {
            days.entry(entry.event.event_date.date_naive())
                .or_default()
                .push(entry.clone());
        }

        for day in days.values_mut() {
            day.sort_by_key(|e| e.event.event_date);
        }
        Self { days }
    }

    pub fn events_on(&self, date: NaiveDate) -> &[EventEntry] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or_default()
    }

    /// Days with at least one event, in order.
    pub fn busy_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// Events of one month in date order. An invalid month yields nothing.
    pub fn events_in_month(&self, year: i32, month: u32) -> Vec<&EventEntry> {
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Vec::new();
        };
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };

        let range = match next {
            Some(next) => self.days.range(first..next),
            None => self.days.range(first..),
        };
        range.flat_map(|(_, entries)| entries).collect()
    }
}
