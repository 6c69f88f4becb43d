pub mod audit;
pub mod identity;
pub mod query;
pub mod session;
pub mod statement;
pub mod store;
pub mod tracker;

pub use audit::{Clock, ManualClock, SystemClock};
pub use identity::{IdentityKey, IdentityMap, Managed};
pub use session::{Db, QueryHints, Session};
pub use statement::{FieldOp, LockMode, Record, RowSet, Statement};
pub use store::{MemoryStore, SessionToken, StorageBackend};
pub use tracker::{ChangeTracker, Snapshot};
