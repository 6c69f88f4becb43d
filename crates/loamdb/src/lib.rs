//! ## Crate layout
//! - `core`: runtime data model, values, sessions, derivation, tracking.
//! - `db`: the typed `Repository` facade over session operations.
//! - `error`: public error taxonomy wrapping core classifications.
//!
//! The `prelude` module mirrors the runtime surface used in application
//! code.

pub use loamdb_core as core;

pub mod db;
pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{
        db::Repository,
        error::{Error, ErrorKind},
    };
    pub use loamdb_core::{
        db::{
            Clock, Db, FieldOp, LockMode, ManualClock, Managed, MemoryStore, QueryHints, Session,
            SystemClock,
            query::{
                OrderDirection, OrderSpec, Page, PageRequest, Predicate, QueryDescriptor,
            },
        },
        model::{EntityModel, FieldKind, FieldModel, FieldRole, KeyPolicy, RelationModel},
        registry::SchemaRegistry,
        traits::{EntityKind as _, FieldValues as _},
        types::{Timestamp, Ulid},
        value::Value,
    };
}
