use serde::{Deserialize, Serialize};

use crate::query::Filter;
use crate::schema::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row mutation published on the change feed. `record` is the row after
/// the change, or the removed row for deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub record: serde_json::Value,
}

impl ChangeEvent {
    pub fn column(&self, name: &str) -> Option<&serde_json::Value> {
        self.record.get(name)
    }
}

/// Subscription scope: one table, optionally narrowed to rows where a
/// column equals a value (e.g. notifications for one user).
#[derive(Debug, Clone, PartialEq)]
pub struct Watch {
    pub table: Table,
    pub filter: Option<Filter>,
}

impl Watch {
    pub fn table(table: Table) -> Self {
        Self { table, filter: None }
    }

    pub fn filtered(table: Table, filter: Filter) -> Self {
        Self { table, filter: Some(filter) }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }

        match &self.filter {
            None => true,
            Some(f) => event
                .column(f.column)
                .is_some_and(|v| f.value.matches(v)),
        }
    }
}
