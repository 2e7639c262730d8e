//! Conversion between JSON rows (the shape records serialize to) and SQLite
//! values, driven by the column metadata in `eventease_types::schema`.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Number, Value as Json};

use eventease_types::query::Value;
use eventease_types::schema::{Column, ColumnKind, Table};

/// A request that does not fit the table schema. Kept distinct from store
/// failures so callers can report it as a bad query.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("unknown column '{column}' on table {table}")]
    UnknownColumn { table: Table, column: String },

    #[error("column '{column}' on table {table} does not accept {found}")]
    TypeMismatch {
        table: Table,
        column: &'static str,
        found: String,
    },

    #[error("column '{column}' on table {table} is not nullable")]
    NotNullable { table: Table, column: &'static str },
}

pub fn column(table: Table, name: &str) -> Result<&'static Column, SchemaError> {
    table.column(name).ok_or_else(|| SchemaError::UnknownColumn {
        table,
        column: name.to_string(),
    })
}

fn mismatch(table: Table, column: &Column, found: impl std::fmt::Display) -> SchemaError {
    SchemaError::TypeMismatch {
        table,
        column: column.name,
        found: found.to_string(),
    }
}

fn normalize_timestamp(table: Table, column: &Column, raw: &str) -> Result<String, SchemaError> {
    let parsed = DateTime::parse_from_rfc3339(raw).map_err(|_| mismatch(table, column, raw))?;
    Ok(parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// JSON field → SQL parameter.
pub fn to_sql(table: Table, column: &Column, json: &Json) -> Result<SqlValue, SchemaError> {
    if json.is_null() {
        return if column.nullable {
            Ok(SqlValue::Null)
        } else {
            Err(SchemaError::NotNullable { table, column: column.name })
        };
    }

    let value = match (column.kind, json) {
        (ColumnKind::Uuid | ColumnKind::Text, Json::String(s)) => SqlValue::Text(s.clone()),
        (ColumnKind::Timestamp, Json::String(s)) => {
            SqlValue::Text(normalize_timestamp(table, column, s)?)
        }
        (ColumnKind::Integer, Json::Number(n)) => {
            SqlValue::Integer(n.as_i64().ok_or_else(|| mismatch(table, column, n))?)
        }
        (ColumnKind::Real, Json::Number(n)) => {
            SqlValue::Real(n.as_f64().ok_or_else(|| mismatch(table, column, n))?)
        }
        (ColumnKind::Bool, Json::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        (ColumnKind::Json, other) => SqlValue::Text(other.to_string()),
        (_, other) => return Err(mismatch(table, column, other)),
    };

    Ok(value)
}

/// Filter or patch value → SQL parameter.
pub fn value_to_sql(table: Table, column: &Column, value: &Value) -> Result<SqlValue, SchemaError> {
    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Real(f) => Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| mismatch(table, column, f))?,
        // JSON columns take their text form as-is.
        Value::Text(s) if column.kind == ColumnKind::Json => return Ok(SqlValue::Text(s.clone())),
        Value::Text(s) => Json::String(s.clone()),
    };

    // Filters compare with `IS`, so a NULL filter on a required column is
    // legal and simply matches nothing.
    if json.is_null() {
        return Ok(SqlValue::Null);
    }

    to_sql(table, column, &json)
}

/// SQL value → JSON field.
pub fn from_sql(table: Table, column: &Column, value: SqlValue) -> Result<Json> {
    let json = match (column.kind, value) {
        (_, SqlValue::Null) => Json::Null,
        (ColumnKind::Bool, SqlValue::Integer(i)) => Json::Bool(i != 0),
        (_, SqlValue::Integer(i)) => Json::Number(i.into()),
        (_, SqlValue::Real(f)) => Number::from_f64(f)
            .map(Json::Number)
            .ok_or_else(|| mismatch(table, column, f))?,
        (ColumnKind::Json, SqlValue::Text(s)) => serde_json::from_str(&s)?,
        (_, SqlValue::Text(s)) => Json::String(s),
        (_, SqlValue::Blob(_)) => return Err(mismatch(table, column, "blob").into()),
    };

    Ok(json)
}

/// Serialized record → one SQL parameter per table column, in column order.
pub fn row_params(table: Table, row: &Json) -> Result<Vec<SqlValue>, SchemaError> {
    let object = row.as_object();
    table
        .columns()
        .iter()
        .map(|c| {
            let field = object.and_then(|o| o.get(c.name)).unwrap_or(&Json::Null);
            to_sql(table, c, field)
        })
        .collect()
}

/// Read a full row (selected in column order) back into a JSON object.
pub fn read_row(table: Table, row: &rusqlite::Row<'_>) -> Result<Json> {
    let mut object = Map::with_capacity(table.columns().len());
    for (idx, c) in table.columns().iter().enumerate() {
        let raw: SqlValue = row.get(idx)?;
        object.insert(c.name.to_string(), from_sql(table, c, raw)?);
    }
    Ok(Json::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_are_stored_with_fixed_precision() {
        let c = column(Table::Events, "event_date").unwrap();
        let stored = to_sql(Table::Events, c, &json!("2026-10-19T10:00:00+02:00")).unwrap();
        assert_eq!(stored, SqlValue::Text("2026-10-19T08:00:00.000000Z".into()));
    }

    #[test]
    fn bools_round_trip_through_integers() {
        let c = column(Table::Venues, "is_available").unwrap();
        let stored = to_sql(Table::Venues, c, &json!(true)).unwrap();
        assert_eq!(stored, SqlValue::Integer(1));
        assert_eq!(from_sql(Table::Venues, c, stored).unwrap(), json!(true));
    }

    #[test]
    fn amenities_are_json_text() {
        let c = column(Table::Venues, "amenities").unwrap();
        let stored = to_sql(Table::Venues, c, &json!(["wifi", "parking"])).unwrap();
        assert_eq!(stored, SqlValue::Text(r#"["wifi","parking"]"#.into()));
        assert_eq!(from_sql(Table::Venues, c, stored).unwrap(), json!(["wifi", "parking"]));
    }

    #[test]
    fn required_columns_reject_null() {
        let c = column(Table::Venues, "capacity").unwrap();
        let err = to_sql(Table::Venues, c, &Json::Null).unwrap_err();
        assert!(matches!(err, SchemaError::NotNullable { .. }));
    }

    #[test]
    fn unknown_columns_are_schema_errors() {
        assert!(matches!(
            column(Table::Venues, "capacity; DROP TABLE venues"),
            Err(SchemaError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let c = column(Table::Venues, "capacity").unwrap();
        assert!(to_sql(Table::Venues, c, &json!("150")).is_err());
    }
}
