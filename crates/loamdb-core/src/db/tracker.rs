use crate::{db::identity::IdentityKey, traits::EntityDyn, value::Value};
use std::collections::HashMap;

///
/// Snapshot
///
/// Original-field capture taken at load/save time. Fields snapshot by
/// value; relations snapshot their foreign-key value, so relation dirtiness
/// is key equality, never instance identity.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    values: Vec<(&'static str, Value)>,
}

impl Snapshot {
    #[must_use]
    pub fn capture(entity: &dyn EntityDyn) -> Self {
        let model = entity.model();
        let values = model
            .persistent_columns()
            .map(|name| (name, entity.field(name).unwrap_or(Value::Null)))
            .collect();

        Self { values }
    }

    /// Field names whose live value differs from the snapshot.
    #[must_use]
    pub fn changed_fields(&self, entity: &dyn EntityDyn) -> Vec<&'static str> {
        self.values
            .iter()
            .filter(|(name, original)| {
                let live = entity.field(name).unwrap_or(Value::Null);
                live != *original
            })
            .map(|(name, _)| *name)
            .collect()
    }

    #[must_use]
    pub fn value_of(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }
}

///
/// ChangeTracker
///
/// Mutation detection for one unit of work. Tracked instances carry a
/// snapshot; flush walks them in identity-key insertion order and emits at
/// most one update per dirty instance. Read-only loads are simply never
/// tracked.
///

#[derive(Default)]
pub struct ChangeTracker {
    snapshots: HashMap<IdentityKey, Snapshot>,
    order: Vec<IdentityKey>,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a snapshot for a newly managed instance. A key that is
    /// already tracked keeps its original snapshot.
    pub fn track(&mut self, key: IdentityKey, entity: &dyn EntityDyn) {
        if self.snapshots.contains_key(&key) {
            return;
        }

        self.snapshots.insert(key.clone(), Snapshot::capture(entity));
        self.order.push(key);
    }

    #[must_use]
    pub fn is_tracked(&self, key: &IdentityKey) -> bool {
        self.snapshots.contains_key(key)
    }

    #[must_use]
    pub fn is_dirty(&self, key: &IdentityKey, entity: &dyn EntityDyn) -> bool {
        self.snapshots
            .get(key)
            .is_some_and(|snapshot| !snapshot.changed_fields(entity).is_empty())
    }

    #[must_use]
    pub fn snapshot(&self, key: &IdentityKey) -> Option<&Snapshot> {
        self.snapshots.get(key)
    }

    /// Re-capture after a successful flush so the next flush is a no-op.
    pub fn refresh(&mut self, key: &IdentityKey, entity: &dyn EntityDyn) {
        if let Some(snapshot) = self.snapshots.get_mut(key) {
            *snapshot = Snapshot::capture(entity);
        }
    }

    pub fn forget(&mut self, key: &IdentityKey) {
        if self.snapshots.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    /// Drop every snapshot for one entity (bulk-update invalidation).
    pub fn evict_entity(&mut self, entity: &str) {
        self.snapshots.retain(|key, _| key.entity != entity);
        self.order.retain(|key| key.entity != entity);
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.order.clear();
    }

    /// Tracked keys in insertion order (the flush order).
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.order.iter()
    }
}

///
/// TESTS
///
