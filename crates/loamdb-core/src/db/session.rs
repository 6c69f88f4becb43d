use crate::{
    db::{
        audit::{self, Clock, SystemClock},
        identity::{IdentityKey, IdentityMap, Managed},
        query::{
            cache::DescriptorCache,
            plan::{Page, PageRequest, SelectSpec},
            predicate::Predicate,
            signature::{QueryDescriptor, QueryVerb, lower_fields},
        },
        statement::{FieldOp, LockMode, Record, Statement},
        store::{SessionToken, StorageBackend},
        tracker::ChangeTracker,
    },
    error::InternalError,
    model::{EntityModel, KeyPolicy},
    obs::{ExecKind, MetricsEvent, MetricsSink},
    registry::SchemaRegistry,
    traits::EntityKind,
    types::UlidGenerator,
    value::Value,
};
use std::cell::{Cell, RefCell, RefMut};

///
/// Db
///
/// Process-wide handle: validated schema registry, descriptor cache, clock,
/// key generator, and the storage backend. Sessions borrow it; nothing here
/// is unit-of-work state.
///

pub struct Db<S: StorageBackend> {
    registry: SchemaRegistry,
    store: RefCell<S>,
    cache: DescriptorCache,
    clock: Box<dyn Clock>,
    ulids: RefCell<UlidGenerator>,
    next_session: Cell<u64>,
}

impl<S: StorageBackend> Db<S> {
    /// Validate the registry and bind it to a storage backend.
    pub fn new(registry: SchemaRegistry, store: S) -> Result<Self, InternalError> {
        registry.validate()?;

        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let seed = clock.now_millis();

        Ok(Self {
            registry,
            store: RefCell::new(store),
            cache: DescriptorCache::new(),
            clock,
            ulids: RefCell::new(UlidGenerator::new(seed)),
            next_session: Cell::new(1),
        })
    }

    /// Override the time source (tests pin it with a manual clock).
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Register an explicit query body; it takes precedence over derivation
    /// for the same signature.
    pub fn register_named_query(
        &self,
        entity_name: &str,
        descriptor: QueryDescriptor,
        projection: Option<String>,
    ) {
        self.cache.register_named(entity_name, descriptor, projection);
    }

    /// Open a fresh unit of work.
    pub fn session(&self) -> Session<'_, S> {
        let token = SessionToken(self.next_session.get());
        self.next_session.set(self.next_session.get() + 1);

        Session {
            db: self,
            token,
            identity: IdentityMap::new(),
            tracker: ChangeTracker::new(),
            actor: None,
            debug: false,
            metrics: None,
            open: true,
        }
    }
}

///
/// QueryHints
///
/// Per-invocation execution hints: read-only loads register in the identity
/// map but are never tracked; a pessimistic read lock passes through to the
/// storage backend and is held until the unit of work ends.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueryHints {
    pub read_only: bool,
    pub lock: LockMode,
}

impl QueryHints {
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            lock: LockMode::None,
        }
    }

    #[must_use]
    pub const fn pessimistic_read() -> Self {
        Self {
            read_only: false,
            lock: LockMode::PessimisticRead,
        }
    }
}

///
/// Session
///
/// One unit of work: its own identity map, change tracker and actor
/// context, all discarded at commit or rollback. Sessions are passed by
/// reference through every call; there is no ambient persistence context.
///

pub struct Session<'a, S: StorageBackend> {
    db: &'a Db<S>,
    token: SessionToken,
    identity: IdentityMap,
    tracker: ChangeTracker,
    actor: Option<String>,
    debug: bool,
    metrics: Option<&'static dyn MetricsSink>,
    open: bool,
}

impl<S: StorageBackend> Session<'_, S> {
    // ------------------------------------------------------------------
    // Session configuration
    // ------------------------------------------------------------------

    /// Bind the current actor for audit stamping. Set once per unit of
    /// work, read-only during it.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Enable debug logging for operations executed in this session.
    #[must_use]
    pub const fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Override the metrics sink for operations executed in this session.
    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    fn store(&self) -> RefMut<'_, S> {
        self.db.store.borrow_mut()
    }

    fn emit(&self, kind: ExecKind, entity: &'static str) {
        if let Some(sink) = self.metrics {
            sink.record(MetricsEvent { kind, entity });
        }
    }

    fn debug_log(&self, s: impl Into<String>) {
        if self.debug {
            println!("[debug] {}", s.into());
        }
    }

    // ------------------------------------------------------------------
    // Basic CRUD
    // ------------------------------------------------------------------

    /// Insert a new instance and manage it. New instances insert exactly
    /// once per save; a duplicate key is a storage conflict.
    pub fn save<E: EntityKind>(&mut self, mut entity: E) -> Result<Managed<E>, InternalError> {
        let model = self.checked_model::<E>()?;

        let key = self.assign_key(model, &mut entity)?;

        audit::apply_insert_stamps(&mut entity, self.db.clock.now(), self.actor.as_deref());
        if let Some(version) = model.version_field() {
            entity.set_value(version.name, Value::Uint(1));
        }

        for field in model.fields {
            let value = entity.get_value(field.name).unwrap_or(Value::Null);
            if !field.accepts(&value) {
                return Err(InternalError::mapping(format!(
                    "entity '{}' field '{}' cannot store {value:?}",
                    model.entity_name, field.name
                )));
            }
        }

        let stmt = Statement::Insert {
            table: model.table,
            key: key.clone(),
            row: entity.to_record(),
        };
        self.store().execute(&stmt, self.token)?;
        self.emit(ExecKind::Insert, model.entity_name);
        self.debug_log(format!("insert {}:{key:?}", model.entity_name));

        let ikey = IdentityKey::new(model.entity_name, key);
        let handle = self.identity.put(ikey.clone(), Managed::new(entity));
        self.tracker.track(ikey, &*handle.borrow());

        Ok(handle)
    }

    /// Single-row lookup; absence is `Ok(None)`, never an error.
    pub fn find_by_id<E: EntityKind>(
        &mut self,
        key: impl Into<Value>,
    ) -> Result<Option<Managed<E>>, InternalError> {
        let model = self.checked_model::<E>()?;
        let key = key.into();

        let ikey = IdentityKey::new(model.entity_name, key.clone());
        if let Some(existing) = self.identity.get::<E>(&ikey) {
            return Ok(Some(existing));
        }

        let pk_column = model.column_for(model.primary_key).unwrap_or(model.primary_key);
        let rows = self.run_select::<E>(
            SelectSpec::new(Predicate::eq(pk_column, key)),
            LockMode::None,
        )?;

        rows.into_iter()
            .next()
            .map(|row| self.manage_row::<E>(row, false))
            .transpose()
    }

    /// Every row, primary-key order.
    pub fn find_all<E: EntityKind>(&mut self) -> Result<Vec<Managed<E>>, InternalError> {
        let model = self.checked_model::<E>()?;

        let mut spec = SelectSpec::new(Predicate::True);
        let pk_column = model.column_for(model.primary_key).unwrap_or(model.primary_key);
        spec.order.push_tiebreaker(pk_column);

        let rows = self.run_select::<E>(spec, LockMode::None)?;
        rows.into_iter()
            .map(|row| self.manage_row::<E>(row, false))
            .collect()
    }

    pub fn count<E: EntityKind>(&mut self) -> Result<u64, InternalError> {
        let model = self.checked_model::<E>()?;

        let stmt = Statement::Count {
            table: model.table,
            predicate: Predicate::True,
        };
        let count = self.store().execute_count(&stmt, self.token)?;
        self.emit(ExecKind::Count, model.entity_name);

        Ok(count)
    }

    /// Delete a managed instance and detach it.
    pub fn delete<E: EntityKind>(&mut self, handle: &Managed<E>) -> Result<(), InternalError> {
        let model = self.checked_model::<E>()?;

        let key = handle.borrow().key();
        if key.is_null() {
            return Err(InternalError::session_unsupported(format!(
                "cannot delete transient '{}' instance",
                model.entity_name
            )));
        }

        let stmt = Statement::Delete {
            table: model.table,
            key: key.clone(),
        };
        self.store().execute(&stmt, self.token)?;
        self.emit(ExecKind::Delete, model.entity_name);

        let ikey = IdentityKey::new(model.entity_name, key);
        self.identity.evict(&ikey);
        self.tracker.forget(&ikey);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived and named queries
    // ------------------------------------------------------------------

    /// Run a finder signature (derived or named) and manage the results.
    pub fn invoke<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
    ) -> Result<Vec<Managed<E>>, InternalError> {
        self.invoke_with(signature, params, QueryHints::default())
    }

    /// Run a finder with execution hints (read-only, row locks).
    pub fn invoke_with<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
        hints: QueryHints,
    ) -> Result<Vec<Managed<E>>, InternalError> {
        let model = self.checked_model::<E>()?;
        let resolved = self.resolve(model, signature)?;

        if resolved.descriptor.verb != QueryVerb::Find {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' is not a finder"
            )));
        }
        if resolved.projection.is_some() {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' projects a column; call invoke_values"
            )));
        }

        let spec = resolved.descriptor.select_spec(model, params)?;
        let rows = self.run_select::<E>(spec, hints.lock)?;

        rows.into_iter()
            .map(|row| self.manage_row::<E>(row, hints.read_only))
            .collect()
    }

    /// Exactly-one finder: `Ok(None)` on no match, error on more than one.
    pub fn invoke_one<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
    ) -> Result<Option<Managed<E>>, InternalError> {
        let mut matches = self.invoke::<E>(signature, params)?;

        if matches.len() > 1 {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' matched {} rows, expected at most one",
                matches.len()
            )));
        }

        Ok(matches.pop())
    }

    /// Run a counting signature.
    pub fn invoke_count<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
    ) -> Result<u64, InternalError> {
        let model = self.checked_model::<E>()?;
        let resolved = self.resolve(model, signature)?;

        if resolved.descriptor.verb != QueryVerb::Count {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' is not a counter"
            )));
        }

        let spec = resolved.descriptor.select_spec(model, params)?;
        let stmt = Statement::Count {
            table: model.table,
            predicate: spec.predicate,
        };
        let count = self.store().execute_count(&stmt, self.token)?;
        self.emit(ExecKind::Count, model.entity_name);

        Ok(count)
    }

    /// Run a deleting signature; affected instances are detached.
    pub fn invoke_delete<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
    ) -> Result<u64, InternalError> {
        let model = self.checked_model::<E>()?;
        let resolved = self.resolve(model, signature)?;

        if resolved.descriptor.verb != QueryVerb::Delete {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' is not a deleter"
            )));
        }

        let spec = resolved.descriptor.select_spec(model, params)?;
        let rows = self.run_select_raw(model, spec, LockMode::None)?;

        let pk_column = model.column_for(model.primary_key).unwrap_or(model.primary_key);
        let mut affected = 0;
        for row in rows {
            let key = row.get(pk_column).cloned().ok_or_else(|| {
                InternalError::store_internal(format!(
                    "row for '{}' is missing its key column",
                    model.entity_name
                ))
            })?;

            let stmt = Statement::Delete {
                table: model.table,
                key: key.clone(),
            };
            affected += self.store().execute_count(&stmt, self.token)?;

            let ikey = IdentityKey::new(model.entity_name, key);
            self.identity.evict(&ikey);
            self.tracker.forget(&ikey);
        }
        self.emit(ExecKind::Delete, model.entity_name);

        Ok(affected)
    }

    /// Run a projecting custom query; returns raw column values.
    pub fn invoke_values<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
    ) -> Result<Vec<Value>, InternalError> {
        let model = self.checked_model::<E>()?;
        let resolved = self.resolve(model, signature)?;

        let Some(column) = resolved.projection.clone() else {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' has no projection"
            )));
        };

        let mut spec = resolved.descriptor.select_spec(model, params)?;
        spec.projection = Some(column.clone());

        let rows = self.run_select_raw(model, spec, LockMode::None)?;
        Ok(rows
            .into_iter()
            .map(|row| row.get(&column).cloned().unwrap_or(Value::Null))
            .collect())
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Page a finder signature: one bound predicate feeds both the content
    /// select and the total count.
    pub fn page<E: EntityKind>(
        &mut self,
        signature: &str,
        params: &[Value],
        request: &PageRequest,
    ) -> Result<Page<Managed<E>>, InternalError> {
        let model = self.checked_model::<E>()?;
        let resolved = self.resolve(model, signature)?;

        if resolved.descriptor.verb != QueryVerb::Find {
            return Err(InternalError::session_unsupported(format!(
                "signature '{signature}' is not a finder"
            )));
        }

        let (content, count_predicate) =
            resolved.descriptor.plan_page(model, params, request)?;
        self.run_page(model, content, count_predicate, request)
    }

    /// Page an explicit predicate (field names, already bound).
    pub fn page_where<E: EntityKind>(
        &mut self,
        predicate: Predicate,
        request: &PageRequest,
    ) -> Result<Page<Managed<E>>, InternalError> {
        let model = self.checked_model::<E>()?;

        let descriptor = QueryDescriptor::custom(
            format!("page:{}", model.entity_name),
            predicate,
            request.sort.clone(),
            None,
        );
        let (content, count_predicate) = descriptor.plan_page(model, &[], request)?;

        self.run_page(model, content, count_predicate, request)
    }

    fn run_page<E: EntityKind>(
        &mut self,
        model: &'static EntityModel,
        content: SelectSpec,
        count_predicate: Predicate,
        request: &PageRequest,
    ) -> Result<Page<Managed<E>>, InternalError> {
        let rows = self.run_select::<E>(content, LockMode::None)?;
        let items = rows
            .into_iter()
            .map(|row| self.manage_row::<E>(row, false))
            .collect::<Result<Vec<_>, _>>()?;

        let stmt = Statement::Count {
            table: model.table,
            predicate: count_predicate,
        };
        let total = self.store().execute_count(&stmt, self.token)?;
        self.emit(ExecKind::Count, model.entity_name);

        Ok(Page::new(items, request.index, request.size, total))
    }

    // ------------------------------------------------------------------
    // Bulk updates
    // ------------------------------------------------------------------

    /// Predicate-based mass mutation. Bypasses the change tracker and
    /// evicts every tracked instance of the entity: their snapshots are
    /// stale relative to storage the moment the statement runs.
    pub fn bulk_update<E: EntityKind>(
        &mut self,
        predicate: Predicate,
        ops: Vec<FieldOp>,
    ) -> Result<u64, InternalError> {
        let model = self.checked_model::<E>()?;

        let predicate = lower_fields(model, predicate)?;
        let ops = ops
            .into_iter()
            .map(|op| {
                let column = model.column_for(op.column()).ok_or_else(|| {
                    InternalError::mapping(format!(
                        "entity '{}' has no field '{}'",
                        model.entity_name,
                        op.column()
                    ))
                })?;
                Ok(match op {
                    FieldOp::Set(_, value) => FieldOp::Set(column.to_string(), value),
                    FieldOp::Add(_, delta) => FieldOp::Add(column.to_string(), delta),
                })
            })
            .collect::<Result<Vec<_>, InternalError>>()?;

        let stmt = Statement::BulkUpdate {
            table: model.table,
            predicate,
            ops,
        };
        let affected = self.store().execute_count(&stmt, self.token)?;
        self.emit(ExecKind::BulkUpdate, model.entity_name);
        self.debug_log(format!(
            "bulk update {} affected {affected} rows",
            model.entity_name
        ));

        // mandated invalidation, by contract not by accident
        self.identity.evict_entity(model.entity_name);
        self.tracker.evict_entity(model.entity_name);

        Ok(affected)
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Resolve a lazy many-to-one relation through the session. Fails as
    /// detached when the owning instance is no longer managed.
    pub fn load_relation<E: EntityKind, T: EntityKind>(
        &mut self,
        handle: &Managed<E>,
        relation: &str,
    ) -> Result<Option<Managed<T>>, InternalError> {
        let model = self.checked_model::<E>()?;

        let rel = model.relation(relation).ok_or_else(|| {
            InternalError::mapping(format!(
                "entity '{}' has no relation '{relation}'",
                model.entity_name
            ))
        })?;
        if rel.target != T::MODEL.entity_name {
            return Err(InternalError::mapping(format!(
                "relation '{relation}' targets '{}', not '{}'",
                rel.target,
                T::MODEL.entity_name
            )));
        }

        let key = handle.borrow().key();
        let ikey = IdentityKey::new(model.entity_name, key);
        if !self.identity.contains(&ikey) {
            return Err(InternalError::detached(format!(
                "instance {ikey} is detached; reload it before resolving '{relation}'"
            )));
        }

        let fk = handle.borrow().get_value(relation).unwrap_or(Value::Null);
        if fk.is_null() {
            return Ok(None);
        }

        self.find_by_id::<T>(fk)
    }

    // ------------------------------------------------------------------
    // Flush & lifecycle
    // ------------------------------------------------------------------

    /// Translate tracked dirty state into update statements, in identity-key
    /// insertion order, at most one statement per instance, applied as one
    /// atomic batch. Returns the number of statements emitted; a second
    /// flush without intervening mutation emits none.
    pub fn flush(&mut self) -> Result<usize, InternalError> {
        let now = self.db.clock.now();
        let mut statements = Vec::new();
        let mut flushed: Vec<IdentityKey> = Vec::new();

        for key in self.tracker.keys() {
            let Some(entity) = self.identity.get_erased(key) else {
                continue;
            };

            if !self.tracker.is_dirty(key, &*entity.borrow()) {
                continue;
            }

            // pre-update hook, at most once per flush per instance
            audit::apply_update_stamps(&mut *entity.borrow_mut(), now, self.actor.as_deref());

            let model = entity.borrow().model();
            // unwrap is safe: the key came from the tracker
            let snapshot = self.tracker.snapshot(key).unwrap();

            let expected_version = model.version_field().map(|version| {
                let current = snapshot
                    .value_of(version.name)
                    .and_then(Value::as_uint)
                    .unwrap_or_default();
                (version.column.to_string(), current)
            });
            if let Some((_, current)) = &expected_version {
                // unwrap is safe: expected_version implies a version field
                let version = model.version_field().unwrap();
                entity
                    .borrow_mut()
                    .set_field(version.name, Value::Uint(current + 1));
            }

            let assignments = snapshot
                .changed_fields(&*entity.borrow())
                .into_iter()
                .map(|field| {
                    let column = model.column_for(field).unwrap_or(field);
                    let value = entity.borrow().field(field).unwrap_or(Value::Null);
                    (column.to_string(), value)
                })
                .collect();

            statements.push(Statement::Update {
                table: model.table,
                key: key.key.clone(),
                assignments,
                expected_version,
            });
            flushed.push(key.clone());
        }

        if statements.is_empty() {
            return Ok(0);
        }

        self.store().apply_batch(&statements, self.token)?;

        for key in &flushed {
            if let Some(entity) = self.identity.get_erased(key) {
                let entity_ref = entity.borrow();
                self.tracker.refresh(key, &*entity_ref);
                self.emit(ExecKind::Update, entity_ref.model().entity_name);
            }
        }
        self.emit(ExecKind::Flush, "");
        self.debug_log(format!("flush emitted {} statements", statements.len()));

        Ok(statements.len())
    }

    /// Flush and close; locks release either way.
    pub fn commit(mut self) -> Result<(), InternalError> {
        let result = self.flush();
        self.close();

        result.map(|_| ())
    }

    /// Discard the unit of work without emitting any statements.
    pub fn rollback(mut self) {
        self.close();
    }

    /// Detach every managed instance; subsequent loads return fresh
    /// instances, and relation loads on old handles fail as detached.
    pub fn clear(&mut self) {
        self.identity.clear();
        self.tracker.clear();
    }

    /// Detach a single instance.
    pub fn evict<E: EntityKind>(&mut self, handle: &Managed<E>) {
        let ikey = IdentityKey::new(E::MODEL.entity_name, handle.borrow().key());
        self.identity.evict(&ikey);
        self.tracker.forget(&ikey);
    }

    /// True while the handle is managed by this unit of work.
    #[must_use]
    pub fn is_managed<E: EntityKind>(&self, handle: &Managed<E>) -> bool {
        let ikey = IdentityKey::new(E::MODEL.entity_name, handle.borrow().key());
        self.identity
            .get::<E>(&ikey)
            .is_some_and(|managed| managed.ptr_eq(handle))
    }

    fn close(&mut self) {
        if self.open {
            self.store().release_locks(self.token);
            self.open = false;
        }
        self.clear();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn checked_model<E: EntityKind>(&self) -> Result<&'static EntityModel, InternalError> {
        self.db.registry.try_get(E::MODEL.entity_name)
    }

    fn resolve(
        &self,
        model: &'static EntityModel,
        signature: &str,
    ) -> Result<crate::db::query::cache::ResolvedQuery, InternalError> {
        let resolved = self.db.cache.resolve(model, signature)?;
        self.emit(ExecKind::Derive, model.entity_name);

        Ok(resolved)
    }

    fn run_select_raw(
        &mut self,
        model: &'static EntityModel,
        spec: SelectSpec,
        lock: LockMode,
    ) -> Result<Vec<Record>, InternalError> {
        let stmt = Statement::Select {
            table: model.table,
            spec,
            lock,
        };
        let rows = self.store().execute(&stmt, self.token)?;
        self.emit(ExecKind::Load, model.entity_name);

        Ok(rows)
    }

    fn run_select<E: EntityKind>(
        &mut self,
        spec: SelectSpec,
        lock: LockMode,
    ) -> Result<Vec<Record>, InternalError> {
        self.run_select_raw(E::MODEL, spec, lock)
    }

    // Rows materialize through the identity map: an already-managed key
    // keeps its instance; fresh rows are registered and (unless read-only)
    // tracked.
    fn manage_row<E: EntityKind>(
        &mut self,
        row: Record,
        read_only: bool,
    ) -> Result<Managed<E>, InternalError> {
        let entity = E::from_record(&row)?;
        let ikey = IdentityKey::new(E::MODEL.entity_name, entity.key());

        if let Some(existing) = self.identity.get::<E>(&ikey) {
            return Ok(existing);
        }

        let handle = self.identity.put(ikey.clone(), Managed::new(entity));
        if !read_only {
            self.tracker.track(ikey, &*handle.borrow());
        }

        Ok(handle)
    }

    fn assign_key<E: EntityKind>(
        &mut self,
        model: &'static EntityModel,
        entity: &mut E,
    ) -> Result<Value, InternalError> {
        let current = entity.key();

        match model.key_policy {
            KeyPolicy::Assigned => {
                if current.is_null() {
                    return Err(InternalError::mapping(format!(
                        "entity '{}' uses assigned keys; set one before save",
                        model.entity_name
                    )));
                }
                Ok(current)
            }
            KeyPolicy::SequenceUint => {
                if current.is_null() {
                    let next = Value::Uint(self.store().next_sequence(model.table));
                    entity.set_key(next.clone());
                    Ok(next)
                } else {
                    Ok(current)
                }
            }
            KeyPolicy::GeneratedUlid => {
                if current.is_null() {
                    let now_ms = self.db.clock.now_millis();
                    let ulid = self
                        .db
                        .ulids
                        .borrow_mut()
                        .generate(now_ms)
                        .map_err(|err| InternalError::store_internal(err.to_string()))?;
                    let next = Value::Ulid(ulid);
                    entity.set_key(next.clone());
                    Ok(next)
                } else {
                    Ok(current)
                }
            }
        }
    }
}

impl<S: StorageBackend> Drop for Session<'_, S> {
    fn drop(&mut self) {
        if self.open
            && let Ok(mut store) = self.db.store.try_borrow_mut()
        {
            store.release_locks(self.token);
        }
    }
}

///
/// TESTS
///
