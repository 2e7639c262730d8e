use uuid::Uuid;

use eventease_api::{Backend, BackendError};
use eventease_types::Table;
use eventease_types::events::Watch;
use eventease_types::models::Venue;
use eventease_types::query::Query;

use crate::collection::{LiveCollection, LiveSpec, Owned};

#[derive(Debug, Clone, Copy, Default)]
pub struct VenuesSpec;

impl LiveSpec for VenuesSpec {
    type Row = Venue;
    type View = Owned<Venue>;

    const NAME: &'static str = "venues";
    const CREATED: Option<&'static str> = Some("Venue added successfully!");
    const UPDATED: Option<&'static str> = Some("Venue updated");
    const DELETED: Option<&'static str> = Some("Venue deleted");

    fn watches(&self, _user: Uuid) -> Vec<Watch> {
        vec![Watch::table(Table::Venues)]
    }

    async fn fetch<B: Backend>(&self, backend: &B, user: Uuid) -> Result<Owned<Venue>, BackendError> {
        let venues = backend
            .select::<Venue>(Query::new().descending("created_at"))
            .await?;
        Ok(Owned::partition(venues, user))
    }
}

pub type VenueCollection<B> = LiveCollection<B, VenuesSpec>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VenueFilter {
    /// Case-insensitive city name.
    pub city: Option<String>,
    pub min_capacity: Option<u32>,
    pub available_only: bool,
}

impl VenueFilter {
    pub fn matches(&self, venue: &Venue) -> bool {
        self.city
            .as_deref()
            .is_none_or(|city| venue.city.trim().eq_ignore_ascii_case(city.trim()))
            && self.min_capacity.is_none_or(|min| venue.capacity >= min)
            && (!self.available_only || venue.is_available)
    }

    pub fn apply<'a>(&self, venues: &'a [Venue]) -> Vec<&'a Venue> {
        venues.iter().filter(|v| self.matches(v)).collect()
    }
}
