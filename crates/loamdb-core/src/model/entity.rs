use crate::model::{
    field::{FieldModel, FieldRole},
    relation::RelationModel,
};

///
/// EntityModel
/// Static runtime model for one entity. Created once, immutable afterward.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified Rust type path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Stable external name used in identity keys and relation targets.
    pub entity_name: &'static str,
    /// Table name used in statements.
    pub table: &'static str,
    /// Primary key field (must name an entry in `fields`).
    pub primary_key: &'static str,
    pub key_policy: KeyPolicy,
    /// Ordered field list (authoritative for snapshots and flushing).
    pub fields: &'static [FieldModel],
    /// Owning-side relations (foreign keys live in this table).
    pub relations: &'static [RelationModel],
}

impl EntityModel {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&'static RelationModel> {
        self.relations.iter().find(|r| r.field == name)
    }

    #[must_use]
    pub fn pk_field(&self) -> Option<&'static FieldModel> {
        self.field(self.primary_key)
    }

    /// Column name for a field or relation, if mapped.
    #[must_use]
    pub fn column_for(&self, name: &str) -> Option<&'static str> {
        self.field(name)
            .map(|f| f.column)
            .or_else(|| self.relation(name).map(|r| r.column))
    }

    /// The field carrying the optimistic version, if declared.
    #[must_use]
    pub fn version_field(&self) -> Option<&'static FieldModel> {
        self.fields.iter().find(|f| f.role == FieldRole::Version)
    }

    /// Fields with the given audit role.
    pub fn fields_with_role(&self, role: FieldRole) -> impl Iterator<Item = &'static FieldModel> {
        self.fields.iter().filter(move |f| f.role == role)
    }

    /// Every persisted column: fields first, then relation foreign keys.
    pub fn persistent_columns(&self) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .map(|f| f.name)
            .chain(self.relations.iter().map(|r| r.field))
    }
}

///
/// KeyPolicy
///
/// How primary keys come into being on first save.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyPolicy {
    /// Caller assigns the key before save.
    Assigned,
    /// Store-issued monotonically increasing `Uint` per table.
    SequenceUint,
    /// Generated from the database handle's monotonic ULID generator.
    GeneratedUlid,
}

///
/// TESTS
///
