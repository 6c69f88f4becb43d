pub mod entity;
pub mod field;
pub mod relation;

pub use entity::{EntityModel, KeyPolicy};
pub use field::{FieldKind, FieldModel, FieldRole};
pub use relation::{Cardinality, FetchPolicy, RelationModel};
