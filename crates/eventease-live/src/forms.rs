//! Raw form input and its conversion into drafts.
//!
//! Text fields are trimmed; optional fields left blank become `None`.
//! Event date and time are taken as UTC.

use chrono::{NaiveDate, NaiveTime};

use eventease_api::auth::looks_like_email;
use eventease_types::models::{EVENT_TYPES, NewEvent, NewVendor, NewVenue, VendorType};

use crate::error::FormError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventForm {
    pub name: String,
    pub event_type: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    /// "HH:MM"
    pub time: String,
    pub location: String,
    pub budget: String,
    pub max_attendees: String,
}

impl EventForm {
    pub fn parse(&self) -> Result<NewEvent, FormError> {
        let name = text("name", &self.name, 3, 100)?;

        let event_type = self.event_type.trim();
        if event_type.is_empty() {
            return Err(FormError::new("type", "Please select an event type"));
        }
        let event_type = EVENT_TYPES
            .iter()
            .find(|t| t.eq_ignore_ascii_case(event_type))
            .ok_or_else(|| FormError::new("type", format!("Unknown event type '{}'", event_type)))?;

        let date = self
            .date
            .ok_or_else(|| FormError::new("event_date", "Please select a date and time"))?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M")
            .map_err(|_| FormError::new("event_time", "Please select a time"))?;

        Ok(NewEvent {
            name,
            event_type: event_type.to_string(),
            description: optional_text("description", &self.description, 500)?,
            event_date: date.and_time(time).and_utc(),
            location: text("location", &self.location, 3, 200)?,
            budget: optional_number("budget", &self.budget)?,
            max_attendees: optional_count("max_attendees", &self.max_attendees)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueForm {
    pub name: String,
    pub address: String,
    pub city: String,
    pub capacity: String,
    pub price_per_hour: String,
    pub description: String,
    /// Comma separated.
    pub amenities: String,
    pub is_available: bool,
}

impl Default for VenueForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            city: String::new(),
            capacity: String::new(),
            price_per_hour: String::new(),
            description: String::new(),
            amenities: String::new(),
            is_available: true,
        }
    }
}

impl VenueForm {
    pub fn parse(&self) -> Result<NewVenue, FormError> {
        if self.capacity.trim().is_empty() {
            return Err(FormError::new("capacity", "Capacity is required"));
        }
        let capacity = optional_count("capacity", &self.capacity)?
            .filter(|c| *c > 0)
            .ok_or_else(|| FormError::new("capacity", "Capacity must be a positive number"))?;

        let amenities: Vec<String> = self
            .amenities
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        Ok(NewVenue {
            name: text("name", &self.name, 2, 100)?,
            address: text("address", &self.address, 5, 200)?,
            city: text("city", &self.city, 2, 100)?,
            capacity,
            price_per_hour: optional_number("price_per_hour", &self.price_per_hour)?,
            description: optional_text("description", &self.description, 500)?,
            amenities: (!amenities.is_empty()).then_some(amenities),
            is_available: self.is_available,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorForm {
    pub name: String,
    pub vendor_type: String,
    pub description: String,
    pub email: String,
    pub phone: String,
    pub price_range: String,
}

impl VendorForm {
    pub fn parse(&self) -> Result<NewVendor, FormError> {
        let vendor_type: VendorType = self
            .vendor_type
            .parse()
            .map_err(|e: String| FormError::new("type", e))?;

        let email = optional_text("email", &self.email, 255)?;
        if let Some(email) = &email {
            if !looks_like_email(email) {
                return Err(FormError::new("email", "Invalid email"));
            }
        }

        Ok(NewVendor {
            name: text("name", &self.name, 2, 100)?,
            vendor_type,
            description: optional_text("description", &self.description, 500)?,
            email,
            phone: optional_text("phone", &self.phone, 20)?,
            price_range: optional_text("price_range", &self.price_range, 50)?,
        })
    }
}

fn text(field: &'static str, raw: &str, min: usize, max: usize) -> Result<String, FormError> {
    let value = raw.trim();
    let len = value.chars().count();
    if len < min {
        return Err(FormError::new(
            field,
            format!("Must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(FormError::new(
            field,
            format!("Must be at most {} characters", max),
        ));
    }
    Ok(value.to_string())
}

fn optional_text(field: &'static str, raw: &str, max: usize) -> Result<Option<String>, FormError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    text(field, raw, 1, max).map(Some)
}

fn optional_number(field: &'static str, raw: &str) -> Result<Option<f64>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        _ => Err(FormError::new(field, "Must be a non-negative number")),
    }
}

fn optional_count(field: &'static str, raw: &str) -> Result<Option<u32>, FormError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| FormError::new(field, "Must be a whole number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn event_form() -> EventForm {
        EventForm {
            name: "  Tech Conf ".into(),
            event_type: "Conference".into(),
            date: NaiveDate::from_ymd_opt(2030, 5, 17),
            time: "10:00".into(),
            location: "Main Hall".into(),
            ..Default::default()
        }
    }

    #[test]
    fn event_form_combines_date_and_time() {
        let event = event_form().parse().unwrap();
        assert_eq!(event.name, "Tech Conf");
        assert_eq!(event.event_date.day(), 17);
        assert_eq!(event.event_date.hour(), 10);
        assert_eq!(event.description, None);
        assert_eq!(event.budget, None);
    }

    #[test]
    fn event_type_is_stored_in_canonical_case() {
        let mut form = event_form();
        form.event_type = " conference ".into();
        assert_eq!(form.parse().unwrap().event_type, "Conference");

        form.event_type = "Rave".into();
        assert_eq!(form.parse().unwrap_err().field, "type");
    }

    #[test]
    fn event_form_rejects_bad_fields() {
        let mut form = event_form();
        form.name = "TC".into();
        assert_eq!(form.parse().unwrap_err().field, "name");

        let mut form = event_form();
        form.time = "25:00".into();
        assert_eq!(form.parse().unwrap_err().field, "event_time");

        let mut form = event_form();
        form.max_attendees = "lots".into();
        assert_eq!(form.parse().unwrap_err().field, "max_attendees");

        let mut form = event_form();
        form.date = None;
        assert_eq!(form.parse().unwrap_err().field, "event_date");
    }

    #[test]
    fn venue_capacity_must_be_positive() {
        let mut form = VenueForm {
            name: "Harbor Loft".into(),
            address: "12 Dock Road".into(),
            city: "Lisbon".into(),
            capacity: "150".into(),
            amenities: "wifi, , projector ,parking".into(),
            ..Default::default()
        };
        let venue = form.parse().unwrap();
        assert_eq!(venue.capacity, 150);
        assert_eq!(
            venue.amenities,
            Some(vec!["wifi".to_string(), "projector".into(), "parking".into()])
        );
        assert!(venue.is_available);

        for bad in ["0", "-5", "ten", ""] {
            form.capacity = bad.into();
            assert_eq!(form.parse().unwrap_err().field, "capacity", "{bad:?}");
        }
    }

    #[test]
    fn vendor_email_is_optional_but_checked() {
        let mut form = VendorForm {
            name: "Bloom & Co".into(),
            vendor_type: "Florist".into(),
            ..Default::default()
        };
        let vendor = form.parse().unwrap();
        assert_eq!(vendor.vendor_type, VendorType::Florist);
        assert_eq!(vendor.email, None);

        form.email = "not-an-email".into();
        assert_eq!(form.parse().unwrap_err().field, "email");

        form.email = String::new();
        form.vendor_type = "juggler".into();
        assert_eq!(form.parse().unwrap_err().field, "type");
    }
}
