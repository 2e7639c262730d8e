use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// A scalar used in equality filters and patches.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Compare against a column of a JSON row, the shape rows take in
    /// change events.
    pub fn matches(&self, json: &serde_json::Value) -> bool {
        match (self, json) {
            (Self::Null, serde_json::Value::Null) => true,
            (Self::Bool(a), serde_json::Value::Bool(b)) => a == b,
            (Self::Integer(a), serde_json::Value::Number(n)) => n.as_i64() == Some(*a),
            (Self::Real(a), serde_json::Value::Number(n)) => n.as_f64() == Some(*a),
            (Self::Text(a), serde_json::Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Text(v.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// `column = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self { column, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub direction: Direction,
}

/// Row selection: every filter must hold, results sorted by `order`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn ascending(mut self, column: &'static str) -> Self {
        self.order = Some(Order { column, direction: Direction::Ascending });
        self
    }

    pub fn descending(mut self, column: &'static str) -> Self {
        self.order = Some(Order { column, direction: Direction::Descending });
        self
    }

    pub fn has_filter(&self, column: &str) -> bool {
        self.filters.iter().any(|f| f.column == column)
    }
}

/// Column assignments for an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub sets: Vec<(&'static str, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
