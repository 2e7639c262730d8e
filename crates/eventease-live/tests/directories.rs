mod common;

use eventease_live::forms::{VendorForm, VenueForm};
use eventease_live::notice::{Level, Notices};
use eventease_live::vendors::by_type;
use eventease_live::venues::VenueFilter;
use eventease_live::{LiveCollection, VendorsSpec, VenuesSpec};
use eventease_types::models::VendorType;
use eventease_types::query::Patch;

use common::{Harness, drain, ready, settle};

fn harbor_loft() -> VenueForm {
    VenueForm {
        name: "Harbor Loft".into(),
        address: "12 Dock Road".into(),
        city: "Lisbon".into(),
        capacity: "150".into(),
        price_per_hour: "80.5".into(),
        amenities: "wifi, stage".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn venue_capacity_round_trips() {
    let harness = Harness::new();
    let (session, backend) = harness.user("Ana").await;
    let (notices, mut rx) = Notices::channel();
    let venues = LiveCollection::mount(backend, VenuesSpec, &session, notices)
        .await
        .unwrap();

    let created = venues.create(harbor_loft().parse().unwrap()).await.unwrap();
    assert_eq!(created.creator_id, session.user.id);

    let view = settle(&venues, |v| v.find(created.id).is_some()).await;
    let venue = view.find(created.id).unwrap();
    assert_eq!(venue.capacity, 150);
    assert_eq!(venue.price_per_hour, Some(80.5));
    assert_eq!(
        venue.amenities.as_deref(),
        Some(&["wifi".to_string(), "stage".to_string()][..])
    );
    assert!(venue.is_available);
    assert_eq!(view.mine.len(), 1);

    let filter = VenueFilter {
        min_capacity: Some(100),
        ..Default::default()
    };
    assert_eq!(filter.apply(&view.all).len(), 1);

    assert_eq!(drain(&mut rx)[0].message, "Venue added successfully!");
}

#[tokio::test]
async fn venues_are_shared_but_only_owners_edit() {
    let harness = Harness::new();
    let (ana, ana_backend) = harness.user("Ana").await;
    let (ben, ben_backend) = harness.user("Ben").await;

    let ana_venues = LiveCollection::mount(ana_backend, VenuesSpec, &ana, Notices::log_only())
        .await
        .unwrap();
    let ben_venues = LiveCollection::mount(ben_backend, VenuesSpec, &ben, Notices::log_only())
        .await
        .unwrap();

    let venue = ana_venues.create(harbor_loft().parse().unwrap()).await.unwrap();
    let ben_view = settle(&ben_venues, |v| v.all.len() == 1).await;
    assert!(ben_view.mine.is_empty());

    assert!(ben_venues.update(venue.id, Patch::new().set("is_available", false)).await);
    assert!(ben_venues.remove(venue.id).await);
    assert!(ana_venues.view().await.find(venue.id).unwrap().is_available);

    assert!(ana_venues.update(venue.id, Patch::new().set("capacity", 200u32)).await);
    settle(&ben_venues, |v| v.find(venue.id).is_some_and(|v| v.capacity == 200)).await;
}

#[tokio::test]
async fn vendors_partition_by_owner() {
    let harness = Harness::new();
    let (ana, ana_backend) = harness.user("Ana").await;
    let (ben, ben_backend) = harness.user("Ben").await;

    let ana_vendors = LiveCollection::mount(ana_backend, VendorsSpec, &ana, Notices::log_only())
        .await
        .unwrap();
    let ben_vendors = LiveCollection::mount(ben_backend, VendorsSpec, &ben, Notices::log_only())
        .await
        .unwrap();

    let bloom = VendorForm {
        name: "Bloom & Co".into(),
        vendor_type: "florist".into(),
        email: "hello@bloom.example".into(),
        ..Default::default()
    };
    let snap = VendorForm {
        name: "Snapshot".into(),
        vendor_type: "photographer".into(),
        ..Default::default()
    };
    ana_vendors.create(bloom.parse().unwrap()).await.unwrap();
    ben_vendors.create(snap.parse().unwrap()).await.unwrap();

    let view = settle(&ana_vendors, |v| v.all.len() == 2).await;
    assert_eq!(view.mine.len(), 1);
    assert_eq!(view.mine[0].name, "Bloom & Co");
    // Newest first.
    assert_eq!(view.all[0].name, "Snapshot");

    let florists = by_type(&view.all, Some(VendorType::Florist));
    assert_eq!(florists.len(), 1);
    assert_eq!(florists[0].email.as_deref(), Some("hello@bloom.example"));
}

#[tokio::test]
async fn invalid_rows_fail_without_touching_the_view() {
    let harness = Harness::new();
    let (session, backend) = harness.user("Ana").await;
    let (notices, mut rx) = Notices::channel();
    let venues = LiveCollection::mount(backend, VenuesSpec, &session, notices)
        .await
        .unwrap();
    let venue = venues.create(harbor_loft().parse().unwrap()).await.unwrap();
    drain(&mut rx);

    // Capacity must stay positive; the store refuses the write.
    assert!(!venues.update(venue.id, Patch::new().set("capacity", 0u32)).await);
    ready(&venues).await;
    assert_eq!(venues.view().await.find(venue.id).unwrap().capacity, 150);

    // So are unknown columns.
    assert!(!venues.update(venue.id, Patch::new().set("seats", 10u32)).await);

    let notices = drain(&mut rx);
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.level == Level::Error));
}
