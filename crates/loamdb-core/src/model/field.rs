use crate::value::{Value, ValueTag};

///
/// FieldModel
/// Runtime field metadata used by derivation, validation and flushing.
///

#[derive(Debug)]
pub struct FieldModel {
    /// Field name as used in predicates and signature derivation.
    pub name: &'static str,
    /// Column name persisted in row records.
    pub column: &'static str,
    /// Runtime type shape.
    pub kind: FieldKind,
    pub nullable: bool,
    /// Auditing / versioning role, if any.
    pub role: FieldRole,
}

impl FieldModel {
    /// Plain column with no special role.
    #[must_use]
    pub const fn new(name: &'static str, column: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            column,
            kind,
            nullable: false,
            role: FieldRole::Plain,
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// True when `value` is storable in this field.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.nullable;
        }

        match (self.kind, value.tag()) {
            (FieldKind::Bool, ValueTag::Bool)
            | (FieldKind::Int, ValueTag::Int | ValueTag::Uint)
            | (FieldKind::Text, ValueTag::Text)
            | (FieldKind::Timestamp, ValueTag::Timestamp)
            | (FieldKind::Uint, ValueTag::Uint)
            | (FieldKind::Ulid, ValueTag::Ulid) => true,
            _ => false,
        }
    }
}

///
/// FieldKind
///
/// Minimal type surface needed by the registry and derivation engine.
/// Aligned with `Value` variants.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Bool,
    Int,
    Text,
    Timestamp,
    Uint,
    Ulid,
}

///
/// FieldRole
///
/// Auditing fields are stamped by the pre-insert/pre-update hooks; the
/// version field drives optimistic conflict detection on update.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldRole {
    Plain,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
    Version,
}

impl FieldRole {
    /// Roles written by the pre-insert hook.
    #[must_use]
    pub const fn stamped_on_insert(self) -> bool {
        matches!(
            self,
            Self::CreatedAt | Self::CreatedBy | Self::UpdatedAt | Self::UpdatedBy
        )
    }

    /// Roles written by the pre-update hook.
    #[must_use]
    pub const fn stamped_on_update(self) -> bool {
        matches!(self, Self::UpdatedAt | Self::UpdatedBy)
    }
}

///
/// TESTS
///
