use crate::{db::statement::Record, error::InternalError, model::EntityModel, value::Value};
use std::fmt::Debug;

///
/// FieldValues
///
/// Field access by name as runtime values. This is the standard runtime
/// entity interface; predicate evaluation, snapshots and audit stamping all
/// go through it.
///

pub trait FieldValues {
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Returns false when the field is unknown or the value shape does not
    /// fit; callers treat that as a mapping-level failure.
    fn set_value(&mut self, field: &str, value: Value) -> bool;
}

///
/// EntityKind
///
/// Binds a mapped struct to its static model. `Default` stands in for the
/// no-argument constructor a mapper needs to materialize rows.
///

pub trait EntityKind: FieldValues + Debug + Default + 'static {
    const MODEL: &'static EntityModel;

    /// Current primary-key value (`Null` when not yet assigned).
    fn key(&self) -> Value {
        self.get_value(Self::MODEL.primary_key)
            .unwrap_or(Value::Null)
    }

    fn set_key(&mut self, key: Value) -> bool {
        self.set_value(Self::MODEL.primary_key, key)
    }

    /// Project every mapped field and relation foreign key into a row record.
    fn to_record(&self) -> Record {
        let model = Self::MODEL;
        let mut record = Record::new();

        for name in model.persistent_columns() {
            // unwrap is safe: the name came from the model itself
            let column = model.column_for(name).unwrap_or(name);
            let value = self.get_value(name).unwrap_or(Value::Null);
            record.insert(column, value);
        }

        record
    }

    /// Materialize an instance from a row record.
    fn from_record(record: &Record) -> Result<Self, InternalError> {
        let model = Self::MODEL;
        let mut entity = Self::default();

        for name in model.persistent_columns() {
            // unwrap is safe: the name came from the model itself
            let column = model.column_for(name).unwrap_or(name);
            let value = record.get(column).cloned().ok_or_else(|| {
                InternalError::store_internal(format!(
                    "row for '{}' is missing column '{column}'",
                    model.entity_name
                ))
            })?;

            if !entity.set_value(name, value) {
                return Err(InternalError::mapping(format!(
                    "entity '{}' rejected value for field '{name}'",
                    model.entity_name
                )));
            }
        }

        Ok(entity)
    }
}

///
/// EntityDyn
///
/// Object-safe projection of `EntityKind`, used by the identity map and
/// change tracker to handle instances of mixed entity types uniformly.
///

pub trait EntityDyn: 'static {
    fn model(&self) -> &'static EntityModel;

    fn field(&self, name: &str) -> Option<Value>;

    fn set_field(&mut self, name: &str, value: Value) -> bool;

    fn key_value(&self) -> Value;
}

impl<E: EntityKind> EntityDyn for E {
    fn model(&self) -> &'static EntityModel {
        Self::MODEL
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.get_value(name)
    }

    fn set_field(&mut self, name: &str, value: Value) -> bool {
        self.set_value(name, value)
    }

    fn key_value(&self) -> Value {
        self.key()
    }
}

///
/// TESTS
///
