///
/// RelationModel
///
/// Owning-side relation metadata. The owning side persists the foreign key
/// in `column`; the target is referenced by entity name and resolved lazily
/// by the registry, so mutually-referential models register cleanly.
///

#[derive(Debug)]
pub struct RelationModel {
    /// Field name used in predicates and `load_relation` calls.
    pub field: &'static str,
    /// Foreign-key column persisted in row records.
    pub column: &'static str,
    /// Target entity name (resolved against the registry at validate time).
    pub target: &'static str,
    pub cardinality: Cardinality,
    pub fetch: FetchPolicy,
}

impl RelationModel {
    #[must_use]
    pub const fn many_to_one(
        field: &'static str,
        column: &'static str,
        target: &'static str,
    ) -> Self {
        Self {
            field,
            column,
            target,
            cardinality: Cardinality::ManyToOne,
            fetch: FetchPolicy::Lazy,
        }
    }

    #[must_use]
    pub const fn eager(mut self) -> Self {
        self.fetch = FetchPolicy::Eager;
        self
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    ManyToOne,
}

///
/// FetchPolicy
///
/// Lazy relations load only through an explicit `load_relation` call;
/// field access never silently triggers I/O.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchPolicy {
    Eager,
    Lazy,
}
