pub mod memory;

pub use memory::MemoryStore;

use crate::{
    db::statement::{RowSet, Statement},
    error::InternalError,
    value::Value,
};

///
/// SessionToken
/// Identifies one unit of work to the storage backend for lock ownership.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SessionToken(pub u64);

///
/// StorageBackend
///
/// The only component that may block. The mapper assumes transactional,
/// atomic single-statement execution and read-your-writes within one unit
/// of work; batch application is all-or-nothing.
///

pub trait StorageBackend {
    /// Execute one statement on behalf of a unit of work, returning matched
    /// rows for selects and an empty row set for writes. A select carrying a
    /// lock mode acquires row locks under the given session token.
    fn execute(&mut self, stmt: &Statement, session: SessionToken)
    -> Result<RowSet, InternalError>;

    /// Execute a counting statement (`Count`, `BulkUpdate`, `Delete`);
    /// returns the number of rows counted or affected.
    fn execute_count(
        &mut self,
        stmt: &Statement,
        session: SessionToken,
    ) -> Result<u64, InternalError>;

    /// Apply a flush batch atomically on behalf of a unit of work: if any
    /// statement fails, no statement in the batch remains applied.
    fn apply_batch(
        &mut self,
        stmts: &[Statement],
        session: SessionToken,
    ) -> Result<(), InternalError>;

    /// Acquire a row lock on behalf of a unit of work; conflicts with a
    /// lock held by another live unit of work are errors, never waits.
    fn lock_row(
        &mut self,
        table: &'static str,
        key: &Value,
        session: SessionToken,
    ) -> Result<(), InternalError>;

    /// Release every lock held by the unit of work (commit or rollback).
    fn release_locks(&mut self, session: SessionToken);

    /// Next value of the per-table key sequence.
    fn next_sequence(&mut self, table: &'static str) -> u64;
}
