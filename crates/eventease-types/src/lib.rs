pub mod api;
pub mod events;
pub mod models;
pub mod query;
pub mod schema;

pub use models::Record;
pub use schema::Table;
