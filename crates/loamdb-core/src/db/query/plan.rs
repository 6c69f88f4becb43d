use crate::{
    db::{
        query::predicate::{Predicate, eval as eval_predicate},
        statement::Record,
    },
    value::Value,
};
use std::cmp::Ordering;

///
/// OrderDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

///
/// OrderSpec
/// Ordering specification applied after filtering.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderSpec {
    pub fields: Vec<(String, OrderDirection)>,
}

impl OrderSpec {
    #[must_use]
    pub const fn none() -> Self {
        Self { fields: Vec::new() }
    }

    #[must_use]
    pub fn by(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            fields: vec![(field.into(), direction)],
        }
    }

    #[must_use]
    pub fn then(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.fields.push((field.into(), direction));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a field unless it is already part of the ordering.
    pub fn push_tiebreaker(&mut self, field: &str) {
        if !self.fields.iter().any(|(name, _)| name == field) {
            self.fields.push((field.to_string(), OrderDirection::Asc));
        }
    }
}

///
/// PageSpec
/// Window applied after ordering.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageSpec {
    pub limit: Option<u32>,
    pub offset: u32,
}

///
/// SelectSpec
///
/// Fully bound, executor-ready select: residual predicate, ordering,
/// window, optional single-column projection. Filtering, ordering and
/// paging apply in exactly that sequence.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectSpec {
    pub predicate: Predicate,
    pub order: OrderSpec,
    pub page: Option<PageSpec>,
    pub projection: Option<String>,
}

impl SelectSpec {
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            order: OrderSpec::none(),
            page: None,
            projection: None,
        }
    }

    #[must_use]
    pub fn order(mut self, order: OrderSpec) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub const fn page(mut self, page: PageSpec) -> Self {
        self.page = Some(page);
        self
    }

    /// Apply predicate, ordering, and window to raw rows, in plan order.
    pub fn apply_post_access(&self, rows: &mut Vec<Record>) {
        rows.retain(|row| eval_predicate(row, &self.predicate));

        if !self.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &self.order));
        }

        if let Some(page) = self.page {
            let offset = page.offset as usize;
            if offset >= rows.len() {
                rows.clear();
            } else {
                rows.drain(..offset);
                if let Some(limit) = page.limit {
                    rows.truncate(limit as usize);
                }
            }
        }
    }
}

// Missing columns sort as Null; families order by rank so mixed columns
// still produce one consistent order.
fn compare_rows(a: &Record, b: &Record, order: &OrderSpec) -> Ordering {
    for (field, direction) in &order.fields {
        let left = a.get(field).cloned().unwrap_or(Value::Null);
        let right = b.get(field).cloned().unwrap_or(Value::Null);

        let ordering = match direction {
            OrderDirection::Asc => left.rank_order(&right),
            OrderDirection::Desc => right.rank_order(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

///
/// PageRequest
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageRequest {
    pub index: u32,
    pub size: u32,
    pub sort: OrderSpec,
}

impl PageRequest {
    #[must_use]
    pub const fn of(index: u32, size: u32) -> Self {
        Self {
            index,
            size,
            sort: OrderSpec::none(),
        }
    }

    #[must_use]
    pub fn sorted(index: u32, size: u32, sort: OrderSpec) -> Self {
        Self { index, size, sort }
    }

    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.index.saturating_mul(self.size)
    }
}

///
/// Page
///
/// One page of content plus the total row count computed by a separate
/// count query over the same predicate.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, page_index: u32, page_size: u32, total_elements: u64) -> Self {
        Self {
            items,
            page_index,
            page_size,
            total_elements,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }

        let size = u64::from(self.page_size);
        let pages = self.total_elements.div_ceil(size);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.page_index == 0
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.total_pages()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Map page content, preserving the paging envelope.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_elements: self.total_elements,
        }
    }
}

///
/// TESTS
///
