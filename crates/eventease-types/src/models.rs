use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::Table;

/// A row of one backend table.
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: Table;

    fn id(&self) -> Uuid;

    /// Value of the table's owner column.
    fn owner(&self) -> Uuid;
}

/// Client-side input for a new row. The owner is always the session user,
/// never part of the input.
pub trait Draft: Send + 'static {
    type Record: Record;

    fn into_record(self, owner: Uuid) -> Self::Record;
}

macro_rules! record {
    ($ty:ty, $table:expr, $owner:ident) => {
        impl Record for $ty {
            const TABLE: Table = $table;

            fn id(&self) -> Uuid {
                self.id
            }

            fn owner(&self) -> Uuid {
                self.$owner
            }
        }
    };
}

// -- Events --

pub const EVENT_TYPES: &[&str] = &[
    "Conference",
    "Workshop",
    "Meetup",
    "Party",
    "Wedding",
    "Corporate",
    "Concert",
    "Festival",
    "Sports",
    "Other",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub budget: Option<f64>,
    pub max_attendees: Option<u32>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

record!(Event, Table::Events, creator_id);

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub event_type: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub budget: Option<f64>,
    pub max_attendees: Option<u32>,
}

impl Draft for NewEvent {
    type Record = Event;

    fn into_record(self, owner: Uuid) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            creator_id: owner,
            name: self.name,
            event_type: self.event_type,
            description: self.description,
            event_date: self.event_date,
            location: self.location,
            budget: self.budget,
            max_attendees: self.max_attendees,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
}

record!(Registration, Table::EventRegistrations, user_id);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRegistration {
    pub event_id: Uuid,
}

impl Draft for NewRegistration {
    type Record = Registration;

    fn into_record(self, owner: Uuid) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            user_id: owner,
            registered_at: Utc::now(),
        }
    }
}

// -- Vendors --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorType {
    Caterer,
    Decorator,
    Photographer,
    Musician,
    Florist,
    Planner,
    Other,
}

impl VendorType {
    pub const ALL: [VendorType; 7] = [
        Self::Caterer,
        Self::Decorator,
        Self::Photographer,
        Self::Musician,
        Self::Florist,
        Self::Planner,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caterer => "caterer",
            Self::Decorator => "decorator",
            Self::Photographer => "photographer",
            Self::Musician => "musician",
            Self::Florist => "florist",
            Self::Planner => "planner",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for VendorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown vendor type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: VendorType,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub price_range: Option<String>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

record!(Vendor, Table::Vendors, creator_id);

#[derive(Debug, Clone, PartialEq)]
pub struct NewVendor {
    pub name: String,
    pub vendor_type: VendorType,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub price_range: Option<String>,
}

impl Draft for NewVendor {
    type Record = Vendor;

    fn into_record(self, owner: Uuid) -> Vendor {
        let now = Utc::now();
        Vendor {
            id: Uuid::new_v4(),
            creator_id: owner,
            name: self.name,
            vendor_type: self.vendor_type,
            description: self.description,
            email: self.email,
            phone: self.phone,
            price_range: self.price_range,
            rating: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// -- Venues --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: u32,
    pub price_per_hour: Option<f64>,
    pub description: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

record!(Venue, Table::Venues, creator_id);

#[derive(Debug, Clone, PartialEq)]
pub struct NewVenue {
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: u32,
    pub price_per_hour: Option<f64>,
    pub description: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub is_available: bool,
}

impl Draft for NewVenue {
    type Record = Venue;

    fn into_record(self, owner: Uuid) -> Venue {
        let now = Utc::now();
        Venue {
            id: Uuid::new_v4(),
            creator_id: owner,
            name: self.name,
            address: self.address,
            city: self.city,
            capacity: self.capacity,
            price_per_hour: self.price_per_hour,
            description: self.description,
            amenities: self.amenities,
            image_url: None,
            is_available: self.is_available,
            created_at: now,
            updated_at: now,
        }
    }
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

record!(Notification, Table::Notifications, user_id);

/// Notifications are addressed to a user other than the author, so the
/// draft carries its recipient and is inserted with the service role.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: Option<String>,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn into_notification(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind: self.kind.unwrap_or_else(|| "info".to_string()),
            is_read: false,
            link: self.link,
            created_at: Utc::now(),
        }
    }
}
