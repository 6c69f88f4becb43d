use crate::{
    db::query::signature::{QueryDescriptor, derive},
    error::InternalError,
    model::EntityModel,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};
use xxhash_rust::xxh3::Xxh3;

///
/// ResolvedQuery
///
/// Outcome of signature resolution. Custom bodies are registered as-is and
/// bypass derivation; the projection pulls a single column instead of whole
/// rows.
///

#[derive(Clone, Debug)]
pub struct ResolvedQuery {
    pub descriptor: Rc<QueryDescriptor>,
    pub projection: Option<String>,
}

impl ResolvedQuery {
    #[must_use]
    pub fn derived(descriptor: Rc<QueryDescriptor>) -> Self {
        Self {
            descriptor,
            projection: None,
        }
    }
}

///
/// DescriptorCache
///
/// Query descriptors are immutable once built; derivation runs once per
/// (entity, signature) and every later invocation reuses the cached
/// descriptor. Named (pre-registered) queries take precedence over
/// derivation for the same signature.
///

#[derive(Default)]
pub struct DescriptorCache {
    named: RefCell<HashMap<u64, ResolvedQuery>>,
    derived: RefCell<HashMap<u64, Rc<QueryDescriptor>>>,
}

impl DescriptorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an explicit query body under a signature name.
    pub fn register_named(
        &self,
        entity_name: &str,
        descriptor: QueryDescriptor,
        projection: Option<String>,
    ) {
        let key = fingerprint(entity_name, &descriptor.signature);
        self.named.borrow_mut().insert(
            key,
            ResolvedQuery {
                descriptor: Rc::new(descriptor),
                projection,
            },
        );
    }

    /// Resolve a signature: named registration first, then the derivation
    /// cache, then a fresh derivation.
    pub fn resolve(
        &self,
        model: &'static EntityModel,
        signature: &str,
    ) -> Result<ResolvedQuery, InternalError> {
        let key = fingerprint(model.entity_name, signature);

        if let Some(named) = self.named.borrow().get(&key) {
            return Ok(named.clone());
        }

        if let Some(descriptor) = self.derived.borrow().get(&key) {
            return Ok(ResolvedQuery::derived(Rc::clone(descriptor)));
        }

        let descriptor = Rc::new(derive(model, signature).map_err(InternalError::from)?);
        self.derived.borrow_mut().insert(key, Rc::clone(&descriptor));

        Ok(ResolvedQuery::derived(descriptor))
    }
}

fn fingerprint(entity_name: &str, signature: &str) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.update(entity_name.as_bytes());
    hasher.update(&[0x00]);
    hasher.update(signature.as_bytes());
    hasher.digest()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::query::{
            plan::OrderSpec,
            predicate::{Operand, Predicate},
        },
        test_fixtures::Player,
        traits::EntityKind,
    };

    #[test]
    fn derivation_result_is_cached_and_shared() {
        let cache = DescriptorCache::new();

        let a = cache
            .resolve(Player::MODEL, "findByUsernameAndAgeGreaterThan")
            .unwrap();
        let b = cache
            .resolve(Player::MODEL, "findByUsernameAndAgeGreaterThan")
            .unwrap();

        assert!(Rc::ptr_eq(&a.descriptor, &b.descriptor));
    }

    #[test]
    fn named_queries_take_precedence_over_derivation() {
        let cache = DescriptorCache::new();

        // deliberately different from what derivation would produce
        let named = QueryDescriptor::custom(
            "findByUsername",
            Predicate::gt("age", Operand::param(0)),
            OrderSpec::none(),
            None,
        );
        cache.register_named(Player::MODEL.entity_name, named, None);

        let resolved = cache.resolve(Player::MODEL, "findByUsername").unwrap();
        assert_eq!(
            resolved.descriptor.predicate,
            Predicate::gt("age", Operand::param(0))
        );
    }

    #[test]
    fn unparsable_signature_surfaces_classified_error() {
        let cache = DescriptorCache::new();
        let err = cache.resolve(Player::MODEL, "findByNope").unwrap_err();

        assert_eq!(
            err.class,
            crate::error::ErrorClass::UnparsableSignature
        );
    }

    #[test]
    fn fingerprints_separate_entities() {
        assert_ne!(
            fingerprint("player", "findByUsername"),
            fingerprint("guild", "findByUsername")
        );
    }
}
