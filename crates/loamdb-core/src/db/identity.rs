//! Identity map invariants:
//! - At most one managed instance per (entity, key) per unit of work.
//! - Insertion order is preserved; flush walks it deterministically.
//! - Evicted or cleared handles become detached; the session refuses to
//!   resolve relations through them.

use crate::{
    traits::{EntityDyn, EntityKind},
    value::Value,
};
use std::{any::Any, cell::RefCell, collections::HashMap, fmt, rc::Rc};

///
/// IdentityKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct IdentityKey {
    pub entity: &'static str,
    pub key: Value,
}

impl IdentityKey {
    #[must_use]
    pub const fn new(entity: &'static str, key: Value) -> Self {
        Self { entity, key }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.entity, self.key)
    }
}

///
/// Managed
///
/// Shared handle to a managed instance. The handle stays valid after the
/// unit of work detaches it; field reads then see the last cached state,
/// while relation loads through the session fail as detached.
///

pub struct Managed<E> {
    inner: Rc<RefCell<E>>,
}

impl<E> Managed<E> {
    #[must_use]
    pub fn new(entity: E) -> Self {
        Self {
            inner: Rc::new(RefCell::new(entity)),
        }
    }

    /// Read access to the instance.
    #[must_use]
    pub fn borrow(&self) -> std::cell::Ref<'_, E> {
        self.inner.borrow()
    }

    /// Mutate the instance; the change tracker picks the change up at the
    /// next flush.
    #[must_use]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, E> {
        self.inner.borrow_mut()
    }

    /// Identity-map law support: two handles to the same managed instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut E)) {
        f(&mut self.inner.borrow_mut());
    }
}

impl<E> Clone for Managed<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Managed<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Managed({:?})", self.inner.borrow())
    }
}

// One slot per identity key: the typed handle for downcasting plus the
// erased handle the tracker and audit hooks work through. Both point at the
// same cell.
struct Slot {
    typed: Box<dyn Any>,
    erased: Rc<RefCell<dyn EntityDyn>>,
}

///
/// IdentityMap
///

#[derive(Default)]
pub struct IdentityMap {
    slots: HashMap<IdentityKey, Slot>,
    order: Vec<IdentityKey>,
}

impl IdentityMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.slots.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Typed lookup; `None` when the key is unknown or of another type.
    #[must_use]
    pub fn get<E: EntityKind>(&self, key: &IdentityKey) -> Option<Managed<E>> {
        self.slots
            .get(key)
            .and_then(|slot| slot.typed.downcast_ref::<Managed<E>>())
            .cloned()
    }

    /// Erased lookup for the tracker and audit hooks.
    #[must_use]
    pub fn get_erased(&self, key: &IdentityKey) -> Option<Rc<RefCell<dyn EntityDyn>>> {
        self.slots.get(key).map(|slot| Rc::clone(&slot.erased))
    }

    /// Register a managed instance. The first handle for a key wins; a
    /// `put` after a `get` hit returns the already-registered instance.
    pub fn put<E: EntityKind>(&mut self, key: IdentityKey, handle: Managed<E>) -> Managed<E> {
        if let Some(existing) = self.get::<E>(&key) {
            return existing;
        }

        let erased: Rc<RefCell<dyn EntityDyn>> = handle.inner.clone();
        self.slots.insert(
            key.clone(),
            Slot {
                typed: Box::new(handle.clone()),
                erased,
            },
        );
        self.order.push(key);

        handle
    }

    /// Detach one instance.
    pub fn evict(&mut self, key: &IdentityKey) {
        if self.slots.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }

    /// Detach every instance of one entity, returning the affected keys.
    pub fn evict_entity(&mut self, entity: &str) -> Vec<IdentityKey> {
        let evicted: Vec<IdentityKey> = self
            .order
            .iter()
            .filter(|key| key.entity == entity)
            .cloned()
            .collect();

        for key in &evicted {
            self.slots.remove(key);
        }
        self.order.retain(|key| key.entity != entity);

        evicted
    }

    /// Detach everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.order.iter()
    }
}

///
/// TESTS
///
