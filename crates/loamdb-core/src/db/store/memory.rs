use crate::{
    db::{
        query::predicate::{Predicate, eval as eval_predicate},
        statement::{LockMode, Record, RowSet, Statement},
        store::{SessionToken, StorageBackend},
    },
    error::InternalError,
    value::Value,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

///
/// RowKey
///
/// Primary-key value with the cross-family total order, so a table iterates
/// in deterministic key order regardless of key kind.
///

#[derive(Clone, Debug)]
struct RowKey(Value);

impl PartialEq for RowKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowKey {}

impl PartialOrd for RowKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.rank_order(&other.0)
    }
}

type Table = BTreeMap<RowKey, Record>;

///
/// MemoryStore
///
/// In-memory storage backend: one ordered table per entity, per-table key
/// sequences, and a row-lock ledger keyed by session token. Batches stage
/// against a table snapshot so a failed flush leaves nothing applied.
///

#[derive(Default)]
pub struct MemoryStore {
    tables: BTreeMap<&'static str, Table>,
    sequences: BTreeMap<&'static str, u64>,
    locks: HashMap<(&'static str, Value), SessionToken>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count across all tables (diagnostics and tests).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.tables.clear();
        self.sequences.clear();
        self.locks.clear();
    }

    fn table_mut(&mut self, table: &'static str) -> &mut Table {
        self.tables.entry(table).or_default()
    }

    fn scan(&self, table: &str, predicate: &Predicate) -> Vec<Record> {
        self.tables.get(table).map_or_else(Vec::new, |rows| {
            rows.values()
                .filter(|row| eval_predicate(*row, predicate))
                .cloned()
                .collect()
        })
    }

    fn check_lockable(
        &self,
        table: &'static str,
        key: &Value,
        session: SessionToken,
    ) -> Result<(), InternalError> {
        match self.locks.get(&(table, key.clone())) {
            Some(owner) if *owner != session => Err(InternalError::store_conflict(format!(
                "row {table}:{key:?} is locked by another unit of work"
            ))),
            _ => Ok(()),
        }
    }

    fn apply_one(&mut self, stmt: &Statement, session: SessionToken) -> Result<RowSet, InternalError> {
        match stmt {
            Statement::Insert { table, key, row } => {
                let rows = self.table_mut(table);
                let row_key = RowKey(key.clone());
                if rows.contains_key(&row_key) {
                    return Err(InternalError::store_conflict(format!(
                        "duplicate key {key:?} in table '{table}'"
                    )));
                }
                rows.insert(row_key, row.clone());

                Ok(Vec::new())
            }

            Statement::Update {
                table,
                key,
                assignments,
                expected_version,
            } => {
                self.check_lockable(table, key, session)?;

                let rows = self.table_mut(table);
                let row = rows.get_mut(&RowKey(key.clone())).ok_or_else(|| {
                    InternalError::store_not_found(format!("{table}:{key:?}"))
                })?;

                if let Some((column, expected)) = expected_version {
                    let stored = row.get(column).and_then(Value::as_uint);
                    if stored != Some(*expected) {
                        return Err(InternalError::store_conflict(format!(
                            "stale version for {table}:{key:?}: expected {expected}, stored {stored:?}"
                        )));
                    }
                }

                for (column, value) in assignments {
                    row.insert(column.clone(), value.clone());
                }

                Ok(Vec::new())
            }

            Statement::Delete { table, key } => {
                self.check_lockable(table, key, session)?;
                self.table_mut(table).remove(&RowKey(key.clone()));

                Ok(Vec::new())
            }

            Statement::Select { table, spec, lock } => {
                let mut rows = self.scan(table, &Predicate::True);
                spec.apply_post_access(&mut rows);

                if *lock == LockMode::PessimisticRead {
                    // locks attach to the row keys surviving post-access
                    let keys: Vec<Value> = rows
                        .iter()
                        .filter_map(|row| pk_of(self.tables.get(table), row))
                        .collect();
                    for key in keys {
                        self.lock_row(table, &key, session)?;
                    }
                }

                if let Some(column) = &spec.projection {
                    let projected = rows
                        .into_iter()
                        .map(|row| {
                            let mut out = Record::new();
                            out.insert(
                                column.clone(),
                                row.get(column).cloned().unwrap_or(Value::Null),
                            );
                            out
                        })
                        .collect();
                    return Ok(projected);
                }

                Ok(rows)
            }

            Statement::Count { .. } | Statement::BulkUpdate { .. } => Err(
                InternalError::store_invariant("counting statement routed to execute"),
            ),
        }
    }
}

// Recover the stored key for a result row by identity of its record.
fn pk_of(table: Option<&Table>, row: &Record) -> Option<Value> {
    table.and_then(|rows| {
        rows.iter()
            .find(|(_, stored)| *stored == row)
            .map(|(key, _)| key.0.clone())
    })
}

impl StorageBackend for MemoryStore {
    fn execute(
        &mut self,
        stmt: &Statement,
        session: SessionToken,
    ) -> Result<RowSet, InternalError> {
        self.apply_one(stmt, session)
    }

    fn execute_count(
        &mut self,
        stmt: &Statement,
        session: SessionToken,
    ) -> Result<u64, InternalError> {
        match stmt {
            Statement::Count { table, predicate } => Ok(self.scan(table, predicate).len() as u64),

            Statement::BulkUpdate {
                table,
                predicate,
                ops,
            } => {
                let keys: Vec<RowKey> = self
                    .tables
                    .get(table)
                    .map_or_else(Vec::new, |rows| {
                        rows.iter()
                            .filter(|(_, row)| eval_predicate(*row, predicate))
                            .map(|(key, _)| key.clone())
                            .collect()
                    });

                for key in &keys {
                    self.check_lockable(table, &key.0, session)?;
                }

                let rows = self.table_mut(table);
                for key in &keys {
                    // unwrap is safe: keys were collected from this table
                    let row = rows.get_mut(key).unwrap();
                    for op in ops {
                        let current = row.get(op.column()).cloned().unwrap_or(Value::Null);
                        let next = op.apply(&current).ok_or_else(|| {
                            InternalError::store_internal(format!(
                                "bulk op on '{}' does not apply to {current:?}",
                                op.column()
                            ))
                        })?;
                        row.insert(op.column().to_string(), next);
                    }
                }

                Ok(keys.len() as u64)
            }

            Statement::Delete { table, key } => {
                self.check_lockable(table, key, session)?;
                let removed = self.table_mut(table).remove(&RowKey(key.clone()));

                Ok(u64::from(removed.is_some()))
            }

            _ => Err(InternalError::store_invariant(
                "row statement routed to execute_count",
            )),
        }
    }

    fn apply_batch(
        &mut self,
        stmts: &[Statement],
        session: SessionToken,
    ) -> Result<(), InternalError> {
        let snapshot = self.tables.clone();

        for stmt in stmts {
            if let Err(err) = self.apply_one(stmt, session) {
                self.tables = snapshot;
                return Err(err);
            }
        }

        Ok(())
    }

    fn lock_row(
        &mut self,
        table: &'static str,
        key: &Value,
        session: SessionToken,
    ) -> Result<(), InternalError> {
        self.check_lockable(table, key, session)?;
        self.locks.insert((table, key.clone()), session);

        Ok(())
    }

    fn release_locks(&mut self, session: SessionToken) {
        self.locks.retain(|_, owner| *owner != session);
    }

    fn next_sequence(&mut self, table: &'static str) -> u64 {
        let next = self.sequences.entry(table).or_insert(0);
        *next += 1;
        *next
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::plan::{OrderDirection, OrderSpec, PageSpec, SelectSpec};
    use crate::db::statement::FieldOp;

    const SESSION: SessionToken = SessionToken(1);
    const OTHER: SessionToken = SessionToken(2);

    fn player_row(id: u64, username: &str, age: i64) -> Record {
        let mut row = Record::new();
        row.insert("player_id", Value::Uint(id));
        row.insert("username", Value::Text(username.into()));
        row.insert("age", Value::Int(age));
        row
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        for (id, name, age) in [(1, "a", 10), (2, "b", 19), (3, "c", 20), (4, "d", 21), (5, "e", 40)]
        {
            store
                .execute(
                    &Statement::Insert {
                        table: "player",
                        key: Value::Uint(id),
                        row: player_row(id, name, age),
                    },
                    SESSION,
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn insert_rejects_duplicate_keys() {
        let mut store = seeded();
        let err = store
            .execute(
                &Statement::Insert {
                    table: "player",
                    key: Value::Uint(1),
                    row: player_row(1, "dup", 1),
                },
                SESSION,
            )
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[test]
    fn select_orders_and_pages() {
        let mut store = seeded();
        let spec = SelectSpec::new(Predicate::gte("age", Value::Int(19)))
            .order(OrderSpec::by("age", OrderDirection::Desc))
            .page(PageSpec {
                limit: Some(2),
                offset: 1,
            });

        let rows = store
            .execute(
                &Statement::Select {
                    table: "player",
                    spec,
                    lock: LockMode::None,
                },
                SESSION,
            )
            .unwrap();

        let ages: Vec<_> = rows.iter().map(|r| r.get("age").cloned().unwrap()).collect();
        assert_eq!(ages, vec![Value::Int(21), Value::Int(20)]);
    }

    #[test]
    fn projection_returns_single_column_records() {
        let mut store = seeded();
        let mut spec = SelectSpec::new(Predicate::True);
        spec.projection = Some("username".to_string());

        let rows = store
            .execute(
                &Statement::Select {
                    table: "player",
                    spec,
                    lock: LockMode::None,
                },
                SESSION,
            )
            .unwrap();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0].get("username"), Some(&Value::Text("a".into())));
    }

    #[test]
    fn update_checks_expected_version() {
        let mut store = MemoryStore::new();
        let mut row = player_row(1, "a", 10);
        row.insert("rev", Value::Uint(1));
        store
            .execute(
                &Statement::Insert {
                    table: "player",
                    key: Value::Uint(1),
                    row,
                },
                SESSION,
            )
            .unwrap();

        let stale = Statement::Update {
            table: "player",
            key: Value::Uint(1),
            assignments: vec![("age".to_string(), Value::Int(11))],
            expected_version: Some(("rev".to_string(), 7)),
        };
        assert!(store.execute(&stale, SESSION).unwrap_err().is_conflict());

        let fresh = Statement::Update {
            table: "player",
            key: Value::Uint(1),
            assignments: vec![
                ("age".to_string(), Value::Int(11)),
                ("rev".to_string(), Value::Uint(2)),
            ],
            expected_version: Some(("rev".to_string(), 1)),
        };
        store.execute(&fresh, SESSION).unwrap();
    }

    #[test]
    fn bulk_update_counts_affected_rows() {
        let mut store = seeded();
        let affected = store
            .execute_count(
                &Statement::BulkUpdate {
                    table: "player",
                    predicate: Predicate::gte("age", Value::Int(20)),
                    ops: vec![FieldOp::Add("age".to_string(), 1)],
                },
                SESSION,
            )
            .unwrap();

        assert_eq!(affected, 3);

        let count = store
            .execute_count(
                &Statement::Count {
                    table: "player",
                    predicate: Predicate::gte("age", Value::Int(41)),
                },
                SESSION,
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn apply_batch_is_all_or_nothing() {
        let mut store = seeded();
        let batch = [
            Statement::Update {
                table: "player",
                key: Value::Uint(1),
                assignments: vec![("age".to_string(), Value::Int(99))],
                expected_version: None,
            },
            Statement::Update {
                table: "player",
                key: Value::Uint(404),
                assignments: vec![("age".to_string(), Value::Int(1))],
                expected_version: None,
            },
        ];

        let err = store.apply_batch(&batch, SESSION).unwrap_err();
        assert!(err.is_not_found());

        // the first update must not have survived
        let rows = store
            .execute(
                &Statement::Select {
                    table: "player",
                    spec: SelectSpec::new(Predicate::eq("player_id", Value::Uint(1))),
                    lock: LockMode::None,
                },
                SESSION,
            )
            .unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Int(10)));
    }

    #[test]
    fn locks_conflict_across_sessions_and_release() {
        let mut store = seeded();
        store.lock_row("player", &Value::Uint(1), SESSION).unwrap();

        // same session may re-lock
        store.lock_row("player", &Value::Uint(1), SESSION).unwrap();

        let err = store.lock_row("player", &Value::Uint(1), OTHER).unwrap_err();
        assert!(err.is_conflict());

        // a locked row rejects writes from other sessions
        let update = Statement::Update {
            table: "player",
            key: Value::Uint(1),
            assignments: vec![("age".to_string(), Value::Int(11))],
            expected_version: None,
        };
        assert!(store.execute(&update, OTHER).unwrap_err().is_conflict());

        store.release_locks(SESSION);
        store.lock_row("player", &Value::Uint(1), OTHER).unwrap();
    }

    #[test]
    fn locking_select_locks_surviving_rows() {
        let mut store = seeded();
        let rows = store
            .execute(
                &Statement::Select {
                    table: "player",
                    spec: SelectSpec::new(Predicate::eq("username", Value::Text("a".into()))),
                    lock: LockMode::PessimisticRead,
                },
                SESSION,
            )
            .unwrap();
        assert_eq!(rows.len(), 1);

        let err = store.lock_row("player", &Value::Uint(1), OTHER).unwrap_err();
        assert!(err.is_conflict());
        store.lock_row("player", &Value::Uint(2), OTHER).unwrap();
    }

    #[test]
    fn sequences_are_per_table_and_monotonic() {
        let mut store = MemoryStore::new();
        assert_eq!(store.next_sequence("player"), 1);
        assert_eq!(store.next_sequence("player"), 2);
        assert_eq!(store.next_sequence("guild"), 1);
    }
}
