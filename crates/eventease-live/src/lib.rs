pub mod collection;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod forms;
pub mod notice;
pub mod notifications;
pub mod preferences;
pub mod session;
pub mod vendors;
pub mod venues;

pub use collection::{LiveCollection, LiveSpec, Owned, Phase};
pub use error::{FormError, LiveError, PreferencesError};
pub use events::{EventCollection, EventsSpec, EventsView};
pub use notice::{Notice, Notices};
pub use notifications::{NotificationCollection, NotificationsSpec, NotificationsView};
pub use session::{Gate, Route, SessionGuard};
pub use vendors::{VendorCollection, VendorsSpec};
pub use venues::{VenueCollection, VenuesSpec};
