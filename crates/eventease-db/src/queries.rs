use crate::models::UserRow;
use crate::rows::{self, column};
use crate::Database;
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::Value as Json;
use tracing::debug;

use eventease_types::query::{Direction, Filter, Patch, Query};
use eventease_types::{Record, Table};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<()> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, full_name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, email, password_hash, full_name, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Table rows --

    /// Rows matching every filter, as JSON objects keyed by column.
    pub fn select_rows(&self, table: Table, query: &Query) -> Result<Vec<Json>> {
        self.with_conn(|conn| select_where(conn, table, query))
    }

    pub fn select<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        self.select_rows(R::TABLE, query)?
            .into_iter()
            .map(|row| Ok(serde_json::from_value(row)?))
            .collect()
    }

    /// Insert one row and return it as stored.
    pub fn insert_row(&self, table: Table, row: &Json) -> Result<Json> {
        let params = rows::row_params(table, row)?;
        let id = row
            .get("id")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("row for {} has no id", table))?;

        self.with_conn(|conn| {
            let names = quoted_columns(table);
            let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table.name(),
                names,
                placeholders.join(", ")
            );
            conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;

            let by_id = Query::new().eq("id", json_text(&id));
            select_where(conn, table, &by_id)?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("inserted row vanished from {}", table))
        })
    }

    pub fn insert<R: Record>(&self, record: &R) -> Result<R> {
        let stored = self.insert_row(R::TABLE, &serde_json::to_value(record)?)?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Apply `patch` to every row matching the filters of `query`. Returns
    /// the rows as they are after the update; an empty vec when nothing
    /// matched.
    pub fn update_rows(&self, table: Table, query: &Query, patch: &Patch) -> Result<Vec<Json>> {
        if patch.is_empty() {
            return Ok(vec![]);
        }

        let mut sets = Vec::with_capacity(patch.sets.len() + 1);
        let mut params = Vec::with_capacity(patch.sets.len() + query.filters.len() + 1);
        for (name, value) in &patch.sets {
            let c = column(table, name)?;
            sets.push(format!("\"{}\" = ?{}", c.name, params.len() + 1));
            params.push(rows::value_to_sql(table, c, value)?);
        }

        // Mirror an `updated_at` trigger unless the caller set it.
        let touches_updated_at = patch.sets.iter().any(|(name, _)| *name == "updated_at");
        if table.column("updated_at").is_some() && !touches_updated_at {
            sets.push(format!("\"updated_at\" = ?{}", params.len() + 1));
            params.push(SqlValue::Text(
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ));
        }

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let ids = matching_ids(&tx, table, &query.filters)?;
            if ids.is_empty() {
                return Ok(vec![]);
            }

            let offset = params.len();
            let (clause, filter_params) = where_clause(table, &query.filters, offset)?;
            let sql = format!("UPDATE {} SET {}{}", table.name(), sets.join(", "), clause);
            let all: Vec<SqlValue> = params.iter().cloned().chain(filter_params).collect();
            let changed = tx.execute(&sql, rusqlite::params_from_iter(all.iter()))?;
            debug!("Updated {} row(s) in {}", changed, table);

            let mut updated = Vec::with_capacity(ids.len());
            for id in ids {
                let by_id = Query::new().eq("id", id);
                updated.extend(select_where(&tx, table, &by_id)?);
            }

            tx.commit()?;
            Ok(updated)
        })
    }

    /// Delete every row matching the filters of `query`. Returns the removed
    /// rows.
    pub fn delete_rows(&self, table: Table, query: &Query) -> Result<Vec<Json>> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let filters_only = Query { filters: query.filters.clone(), order: None };
            let removed = select_where(&tx, table, &filters_only)?;
            if removed.is_empty() {
                return Ok(removed);
            }

            let (clause, params) = where_clause(table, &query.filters, 0)?;
            let sql = format!("DELETE FROM {}{}", table.name(), clause);
            let changed = tx.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            debug!("Deleted {} row(s) from {}", changed, table);

            tx.commit()?;
            Ok(removed)
        })
    }
}

fn quoted_columns(table: Table) -> String {
    table
        .columns()
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn json_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// ` WHERE a IS ?n AND b IS ?n+1`, numbering placeholders after `offset`.
/// `IS` keeps NULL filters meaningful.
fn where_clause(table: Table, filters: &[Filter], offset: usize) -> Result<(String, Vec<SqlValue>)> {
    if filters.is_empty() {
        return Ok((String::new(), vec![]));
    }

    let mut terms = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for filter in filters {
        let c = column(table, filter.column)?;
        params.push(rows::value_to_sql(table, c, &filter.value)?);
        terms.push(format!("\"{}\" IS ?{}", c.name, offset + params.len()));
    }

    Ok((format!(" WHERE {}", terms.join(" AND ")), params))
}

fn select_where(conn: &Connection, table: Table, query: &Query) -> Result<Vec<Json>> {
    let (clause, params) = where_clause(table, &query.filters, 0)?;

    let order = match query.order {
        Some(order) => {
            let c = column(table, order.column)?;
            let dir = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            // Equal keys fall back to insertion order, in the same direction.
            format!(" ORDER BY \"{}\" {}, rowid {}", c.name, dir, dir)
        }
        None => " ORDER BY rowid".to_string(),
    };

    let sql = format!(
        "SELECT {} FROM {}{}{}",
        quoted_columns(table),
        table.name(),
        clause,
        order
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut cursor = stmt.query(rusqlite::params_from_iter(params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = cursor.next()? {
        out.push(rows::read_row(table, row)?);
    }

    Ok(out)
}

fn matching_ids(conn: &Connection, table: Table, filters: &[Filter]) -> Result<Vec<String>> {
    let (clause, params) = where_clause(table, filters, 0)?;
    let sql = format!("SELECT id FROM {}{} ORDER BY rowid", table.name(), clause);

    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(ids)
}

fn query_user(conn: &Connection, key: &str, value: &str) -> Result<Option<UserRow>> {
    // `key` is one of two literals chosen by the callers above.
    let sql = format!(
        "SELECT id, email, password, full_name, created_at FROM users WHERE {} = ?1",
        key
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                full_name: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use eventease_types::models::{
        Draft, Event, NewEvent, NewRegistration, NewVenue, Registration, Venue,
    };
    use uuid::Uuid;

    fn event(owner: Uuid, name: &str, days: i64) -> Event {
        NewEvent {
            name: name.into(),
            event_type: "Meetup".into(),
            description: None,
            event_date: Utc::now() + Duration::days(days),
            location: "Main Hall".into(),
            budget: Some(250.5),
            max_attendees: None,
        }
        .into_record(owner)
    }

    #[test]
    fn select_orders_by_requested_column() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        db.insert(&event(owner, "later", 5)).unwrap();
        db.insert(&event(owner, "sooner", 1)).unwrap();

        let asc: Vec<Event> = db.select(&Query::new().ascending("event_date")).unwrap();
        let names: Vec<_> = asc.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["sooner", "later"]);
        assert_eq!(asc[0].budget, Some(250.5));
    }

    #[test]
    fn filtered_delete_only_touches_matching_rows() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let stored = db.insert(&event(owner, "mine", 1)).unwrap();

        let stranger = Query::new().eq("id", stored.id).eq("creator_id", Uuid::new_v4());
        assert!(db.delete_rows(Table::Events, &stranger).unwrap().is_empty());

        let own = Query::new().eq("id", stored.id).eq("creator_id", owner);
        assert_eq!(db.delete_rows(Table::Events, &own).unwrap().len(), 1);
        assert!(db.select::<Event>(&Query::new()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_registration_violates_uniqueness() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        let stored = db.insert(&event(user, "conf", 1)).unwrap();

        db.insert(&NewRegistration { event_id: stored.id }.into_record(user)).unwrap();
        let err = db
            .insert(&NewRegistration { event_id: stored.id }.into_record(user))
            .unwrap_err();

        let sqlite = err.downcast_ref::<rusqlite::Error>().expect("sqlite error");
        assert_eq!(
            sqlite.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        assert_eq!(db.select::<Registration>(&Query::new()).unwrap().len(), 1);
    }

    #[test]
    fn update_returns_changed_rows_and_bumps_updated_at() {
        let db = Database::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let venue = NewVenue {
            name: "Hall".into(),
            address: "1 Main Street".into(),
            city: "Dublin".into(),
            capacity: 150,
            price_per_hour: None,
            description: None,
            amenities: Some(vec!["wifi".into()]),
            is_available: true,
        }
        .into_record(owner);
        let stored = db.insert(&venue).unwrap();
        assert_eq!(stored.capacity, 150);
        assert_eq!(stored.amenities, Some(vec!["wifi".to_string()]));

        let patch = Patch::new().set("is_available", false);
        let updated = db
            .update_rows(Table::Venues, &Query::new().eq("id", stored.id), &patch)
            .unwrap();
        assert_eq!(updated.len(), 1);

        let venue: Venue = serde_json::from_value(updated[0].clone()).unwrap();
        assert!(!venue.is_available);
        assert!(venue.updated_at >= stored.updated_at);
    }

    #[test]
    fn deleting_an_event_cascades_to_registrations() {
        let db = Database::open_in_memory().unwrap();
        let user = Uuid::new_v4();
        let stored = db.insert(&event(user, "conf", 1)).unwrap();
        db.insert(&NewRegistration { event_id: stored.id }.into_record(user)).unwrap();

        db.delete_rows(Table::Events, &Query::new().eq("id", stored.id)).unwrap();
        assert!(db.select::<Registration>(&Query::new()).unwrap().is_empty());
    }

    #[test]
    fn users_are_looked_up_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "Ana@Example.com", "hash", Some("Ana")).unwrap();

        let row = db.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_eq!(row.id, "u1");
        assert!(db.get_user_by_id("nope").unwrap().is_none());
    }
}
