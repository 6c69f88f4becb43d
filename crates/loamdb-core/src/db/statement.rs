use crate::{
    db::query::{plan::SelectSpec, predicate::Predicate},
    value::Value,
};
use derive_more::{Deref, DerefMut};
use std::collections::BTreeMap;

///
/// Record
///
/// One row keyed by column name. The storage boundary deals in records,
/// never in entity types.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, PartialEq)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

///
/// RowSet
///

pub type RowSet = Vec<Record>;

///
/// LockMode
///
/// Pass-through row-lock request; held by the storage backend for the
/// duration of the unit of work.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LockMode {
    #[default]
    None,
    PessimisticRead,
}

///
/// Statement
///
/// Structured write/read statement executed by a storage backend. This is
/// the full wire surface between the mapper and storage; backends execute
/// statements atomically and provide read-your-writes within one unit of
/// work.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Insert {
        table: &'static str,
        key: Value,
        row: Record,
    },
    Update {
        table: &'static str,
        key: Value,
        /// Changed columns only; one update per instance per flush.
        assignments: Vec<(String, Value)>,
        /// Optimistic guard: (column, expected stored value).
        expected_version: Option<(String, u64)>,
    },
    Delete {
        table: &'static str,
        key: Value,
    },
    Select {
        table: &'static str,
        spec: SelectSpec,
        lock: LockMode,
    },
    Count {
        table: &'static str,
        predicate: Predicate,
    },
    /// Predicate-based mass mutation; bypasses the change tracker.
    BulkUpdate {
        table: &'static str,
        predicate: Predicate,
        ops: Vec<FieldOp>,
    },
}

impl Statement {
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. }
            | Self::Select { table, .. }
            | Self::Count { table, .. }
            | Self::BulkUpdate { table, .. } => table,
        }
    }

    /// True for statements that mutate rows.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Insert { .. } | Self::Update { .. } | Self::Delete { .. } | Self::BulkUpdate { .. }
        )
    }
}

///
/// FieldOp
///
/// Column mutation applied by a bulk update.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldOp {
    Set(String, Value),
    /// Numeric add with saturation; applies to Int and Uint columns.
    Add(String, i64),
}

impl FieldOp {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Set(column, _) | Self::Add(column, _) => column,
        }
    }

    /// Apply to the current column value, if defined for its family.
    #[must_use]
    pub fn apply(&self, current: &Value) -> Option<Value> {
        match self {
            Self::Set(_, value) => Some(value.clone()),
            Self::Add(_, delta) => match current {
                Value::Int(n) => Some(Value::Int(n.saturating_add(*delta))),
                Value::Uint(n) => {
                    let next = if *delta >= 0 {
                        n.saturating_add(delta.unsigned_abs())
                    } else {
                        n.saturating_sub(delta.unsigned_abs())
                    };
                    Some(Value::Uint(next))
                }
                _ => None,
            },
        }
    }
}

///
/// TESTS
///
