//! Database row types that have no public record counterpart.
//! Table rows exposed through the backend travel as JSON, see `rows`.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub created_at: String,
}
