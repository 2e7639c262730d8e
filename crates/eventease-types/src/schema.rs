use serde::{Deserialize, Serialize};

/// Tables exposed by the backend. Column names match the serde names of the
/// record structs in [`crate::models`], so rows travel as JSON objects keyed
/// by column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Events,
    EventRegistrations,
    Vendors,
    Venues,
    Notifications,
}

/// Who may see a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Every authenticated user.
    Public,
    /// Only the user named by the owner column.
    OwnerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Integer,
    Real,
    Bool,
    /// RFC 3339 instant, stored with fixed microsecond precision.
    Timestamp,
    /// Arbitrary JSON (string lists), stored as text.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, nullable: false }
}

const fn opt(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind, nullable: true }
}

use ColumnKind::*;

const EVENTS: &[Column] = &[
    col("id", Uuid),
    col("creator_id", Uuid),
    col("name", Text),
    col("type", Text),
    opt("description", Text),
    col("event_date", Timestamp),
    col("location", Text),
    opt("budget", Real),
    opt("max_attendees", Integer),
    opt("image_url", Text),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const EVENT_REGISTRATIONS: &[Column] = &[
    col("id", Uuid),
    col("event_id", Uuid),
    col("user_id", Uuid),
    col("registered_at", Timestamp),
];

const VENDORS: &[Column] = &[
    col("id", Uuid),
    col("creator_id", Uuid),
    col("name", Text),
    col("type", Text),
    opt("description", Text),
    opt("email", Text),
    opt("phone", Text),
    opt("price_range", Text),
    opt("rating", Real),
    opt("image_url", Text),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const VENUES: &[Column] = &[
    col("id", Uuid),
    col("creator_id", Uuid),
    col("name", Text),
    col("address", Text),
    col("city", Text),
    col("capacity", Integer),
    opt("price_per_hour", Real),
    opt("description", Text),
    opt("amenities", Json),
    opt("image_url", Text),
    col("is_available", Bool),
    col("created_at", Timestamp),
    col("updated_at", Timestamp),
];

const NOTIFICATIONS: &[Column] = &[
    col("id", Uuid),
    col("user_id", Uuid),
    col("title", Text),
    col("message", Text),
    col("type", Text),
    col("is_read", Bool),
    opt("link", Text),
    col("created_at", Timestamp),
];

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Events,
        Table::EventRegistrations,
        Table::Vendors,
        Table::Venues,
        Table::Notifications,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::EventRegistrations => "event_registrations",
            Self::Vendors => "vendors",
            Self::Venues => "venues",
            Self::Notifications => "notifications",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Self::Events => EVENTS,
            Self::EventRegistrations => EVENT_REGISTRATIONS,
            Self::Vendors => VENDORS,
            Self::Venues => VENUES,
            Self::Notifications => NOTIFICATIONS,
        }
    }

    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    /// The column binding a row to the user allowed to mutate it.
    pub fn owner_column(self) -> &'static str {
        match self {
            Self::Events | Self::Vendors | Self::Venues => "creator_id",
            Self::EventRegistrations | Self::Notifications => "user_id",
        }
    }

    pub fn read_policy(self) -> ReadPolicy {
        match self {
            Self::Notifications => ReadPolicy::OwnerOnly,
            _ => ReadPolicy::Public,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
