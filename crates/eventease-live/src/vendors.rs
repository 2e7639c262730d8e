use uuid::Uuid;

use eventease_api::{Backend, BackendError};
use eventease_types::Table;
use eventease_types::events::Watch;
use eventease_types::models::{Vendor, VendorType};
use eventease_types::query::Query;

use crate::collection::{LiveCollection, LiveSpec, Owned};

#[derive(Debug, Clone, Copy, Default)]
pub struct VendorsSpec;

impl LiveSpec for VendorsSpec {
    type Row = Vendor;
    type View = Owned<Vendor>;

    const NAME: &'static str = "vendors";
    const CREATED: Option<&'static str> = Some("Vendor added successfully!");
    const UPDATED: Option<&'static str> = Some("Vendor updated");
    const DELETED: Option<&'static str> = Some("Vendor deleted");

    fn watches(&self, _user: Uuid) -> Vec<Watch> {
        vec![Watch::table(Table::Vendors)]
    }

    async fn fetch<B: Backend>(&self, backend: &B, user: Uuid) -> Result<Owned<Vendor>, BackendError> {
        let vendors = backend
            .select::<Vendor>(Query::new().descending("created_at"))
            .await?;
        Ok(Owned::partition(vendors, user))
    }
}

pub type VendorCollection<B> = LiveCollection<B, VendorsSpec>;

/// Vendors of one type, or all of them.
pub fn by_type(vendors: &[Vendor], vendor_type: Option<VendorType>) -> Vec<&Vendor> {
    vendors
        .iter()
        .filter(|v| vendor_type.is_none_or(|t| v.vendor_type == t))
        .collect()
}
