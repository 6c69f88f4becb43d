use crate::error::Error;
use loamdb_core::{
    db::{
        identity::Managed,
        query::{
            plan::{Page, PageRequest},
            predicate::Predicate,
        },
        session::{QueryHints, Session},
        statement::FieldOp,
        store::StorageBackend,
    },
    traits::EntityKind,
    value::Value,
};
use std::marker::PhantomData;

///
/// Repository
///
/// Typed facade over session operations for one entity. Repositories are
/// stateless; the unit of work is passed by reference through every call,
/// never held ambiently. Core errors convert into the public `Error`.
///

pub struct Repository<E: EntityKind> {
    _marker: PhantomData<E>,
}

impl<E: EntityKind> Repository<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    pub fn save<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        entity: E,
    ) -> Result<Managed<E>, Error> {
        Ok(session.save(entity)?)
    }

    pub fn find_by_id<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        key: impl Into<Value>,
    ) -> Result<Option<Managed<E>>, Error> {
        Ok(session.find_by_id::<E>(key)?)
    }

    pub fn find_all<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
    ) -> Result<Vec<Managed<E>>, Error> {
        Ok(session.find_all::<E>()?)
    }

    pub fn count<S: StorageBackend>(&self, session: &mut Session<'_, S>) -> Result<u64, Error> {
        Ok(session.count::<E>()?)
    }

    pub fn delete<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        handle: &Managed<E>,
    ) -> Result<(), Error> {
        Ok(session.delete(handle)?)
    }

    // ------------------------------------------------------------------
    // Derived and named signatures
    // ------------------------------------------------------------------

    pub fn invoke<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
    ) -> Result<Vec<Managed<E>>, Error> {
        Ok(session.invoke::<E>(signature, params)?)
    }

    pub fn invoke_with<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
        hints: QueryHints,
    ) -> Result<Vec<Managed<E>>, Error> {
        Ok(session.invoke_with::<E>(signature, params, hints)?)
    }

    pub fn invoke_one<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
    ) -> Result<Option<Managed<E>>, Error> {
        Ok(session.invoke_one::<E>(signature, params)?)
    }

    pub fn invoke_count<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
    ) -> Result<u64, Error> {
        Ok(session.invoke_count::<E>(signature, params)?)
    }

    pub fn invoke_delete<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
    ) -> Result<u64, Error> {
        Ok(session.invoke_delete::<E>(signature, params)?)
    }

    pub fn invoke_values<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
    ) -> Result<Vec<Value>, Error> {
        Ok(session.invoke_values::<E>(signature, params)?)
    }

    // ------------------------------------------------------------------
    // Paging, bulk updates, relations
    // ------------------------------------------------------------------

    pub fn page<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        signature: &str,
        params: &[Value],
        request: &PageRequest,
    ) -> Result<Page<Managed<E>>, Error> {
        Ok(session.page::<E>(signature, params, request)?)
    }

    pub fn page_where<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        predicate: Predicate,
        request: &PageRequest,
    ) -> Result<Page<Managed<E>>, Error> {
        Ok(session.page_where::<E>(predicate, request)?)
    }

    pub fn bulk_update<S: StorageBackend>(
        &self,
        session: &mut Session<'_, S>,
        predicate: Predicate,
        ops: Vec<FieldOp>,
    ) -> Result<u64, Error> {
        Ok(session.bulk_update::<E>(predicate, ops)?)
    }

    pub fn load_relation<S: StorageBackend, T: EntityKind>(
        &self,
        session: &mut Session<'_, S>,
        handle: &Managed<E>,
        relation: &str,
    ) -> Result<Option<Managed<T>>, Error> {
        Ok(session.load_relation::<E, T>(handle, relation)?)
    }
}

impl<E: EntityKind> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}
