use crate::{
    db::statement::Record,
    error::InternalError,
    traits::FieldValues,
    value::Value,
};
use std::ops::{BitAnd, BitOr};

///
/// Predicate AST
///
/// Pure, schema-agnostic representation of query predicates. This layer
/// contains no type validation or execution semantics; interpretation
/// happens in later passes (binding, evaluation, storage filtering).
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Lte = 0x04,
    Gt = 0x05,
    Gte = 0x06,
    In = 0x07,
    NotIn = 0x08,
    Contains = 0x09,
    StartsWith = 0x0a,
    EndsWith = 0x0b,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

///
/// Operand
///
/// Right-hand side of a comparison: either a literal value or a positional
/// parameter slot bound at invocation time. Derived descriptors carry
/// `Param` slots so one cached descriptor serves every invocation.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Value(Value),
    Param(usize),
}

impl Operand {
    #[must_use]
    pub const fn param(index: usize) -> Self {
        Self::Param(index)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub field: String,
    pub op: CompareOp,
    pub operand: Operand,
}

impl ComparePredicate {
    #[must_use]
    pub fn new(field: impl Into<String>, op: CompareOp, operand: impl Into<Operand>) -> Self {
        Self {
            field: field.into(),
            op,
            operand: operand.into(),
        }
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
    IsNull { field: String },
    IsNotNull { field: String },
}

impl Predicate {
    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    #[expect(clippy::should_implement_trait)]
    #[must_use]
    pub fn not(pred: Self) -> Self {
        Self::Not(Box::new(pred))
    }

    #[must_use]
    pub fn eq(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Eq, operand))
    }

    #[must_use]
    pub fn ne(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Ne, operand))
    }

    #[must_use]
    pub fn lt(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Lt, operand))
    }

    #[must_use]
    pub fn lte(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Lte, operand))
    }

    #[must_use]
    pub fn gt(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Gt, operand))
    }

    #[must_use]
    pub fn gte(field: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Compare(ComparePredicate::new(field, CompareOp::Gte, operand))
    }

    #[must_use]
    pub fn in_(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Compare(ComparePredicate::new(
            field,
            CompareOp::In,
            Value::List(values),
        ))
    }

    #[must_use]
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::IsNotNull {
            field: field.into(),
        }
    }

    /// Number of parameter slots (highest index + 1).
    #[must_use]
    pub fn param_count(&self) -> usize {
        match self {
            Self::True | Self::False | Self::IsNull { .. } | Self::IsNotNull { .. } => 0,
            Self::And(children) | Self::Or(children) => children
                .iter()
                .map(Self::param_count)
                .max()
                .unwrap_or_default(),
            Self::Not(inner) => inner.param_count(),
            Self::Compare(cmp) => match cmp.operand {
                Operand::Param(index) => index + 1,
                Operand::Value(_) => 0,
            },
        }
    }

    /// Replace every `Param` slot with the corresponding positional value,
    /// producing a fully bound tree.
    pub fn bind(&self, params: &[Value]) -> Result<Self, InternalError> {
        let bound = match self {
            Self::True => Self::True,
            Self::False => Self::False,
            Self::IsNull { field } => Self::IsNull {
                field: field.clone(),
            },
            Self::IsNotNull { field } => Self::IsNotNull {
                field: field.clone(),
            },
            Self::And(children) => Self::And(
                children
                    .iter()
                    .map(|child| child.bind(params))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Or(children) => Self::Or(
                children
                    .iter()
                    .map(|child| child.bind(params))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Not(inner) => Self::Not(Box::new(inner.bind(params)?)),
            Self::Compare(cmp) => {
                let operand = match &cmp.operand {
                    Operand::Value(value) => value.clone(),
                    Operand::Param(index) => params.get(*index).cloned().ok_or_else(|| {
                        InternalError::session_unsupported(format!(
                            "predicate expects parameter {index} but {} were supplied",
                            params.len()
                        ))
                    })?,
                };

                Self::Compare(ComparePredicate::new(
                    cmp.field.clone(),
                    cmp.op,
                    Operand::Value(operand),
                ))
            }
        };

        Ok(bound)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::True
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

///
/// FieldPresence
///
/// Result of reading a field from a row during predicate evaluation. A
/// missing field is distinct from a present field whose value is `Null`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldPresence {
    /// Field exists and has a value (including `Value::Null`).
    Present(Value),
    /// Field is not present on the row.
    Missing,
}

///
/// Row
///
/// Abstraction over a row-like value that can expose fields by name. This
/// decouples predicate evaluation from concrete entity types.
///

pub trait Row {
    fn field(&self, name: &str) -> FieldPresence;
}

impl<T: FieldValues> Row for T {
    fn field(&self, name: &str) -> FieldPresence {
        match self.get_value(name) {
            Some(value) => FieldPresence::Present(value),
            None => FieldPresence::Missing,
        }
    }
}

impl Row for Record {
    fn field(&self, name: &str) -> FieldPresence {
        match self.get(name) {
            Some(value) => FieldPresence::Present(value.clone()),
            None => FieldPresence::Missing,
        }
    }
}

// Evaluate a field predicate only when the field is present.
fn on_present<R: Row + ?Sized>(row: &R, field: &str, f: impl FnOnce(&Value) -> bool) -> bool {
    match row.field(field) {
        FieldPresence::Present(value) => f(&value),
        FieldPresence::Missing => false,
    }
}

///
/// Evaluate a predicate against a single row.
///
/// Pure runtime evaluation: no schema access, no storage access. Any
/// unsupported or unbound comparison evaluates to `false`.
/// CONTRACT: internal-only; predicates must be bound before evaluation.
///
#[must_use]
pub fn eval<R: Row + ?Sized>(row: &R, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::True => true,
        Predicate::False => false,

        Predicate::And(children) => children.iter().all(|child| eval(row, child)),
        Predicate::Or(children) => children.iter().any(|child| eval(row, child)),
        Predicate::Not(inner) => !eval(row, inner),

        Predicate::Compare(cmp) => eval_compare(row, cmp),

        Predicate::IsNull { field } => {
            matches!(row.field(field), FieldPresence::Present(Value::Null))
        }

        Predicate::IsNotNull { field } => {
            matches!(row.field(field), FieldPresence::Present(value) if !value.is_null())
        }
    }
}

// Null never matches a comparison; absence is matched only by IsNull.
fn eval_compare<R: Row + ?Sized>(row: &R, cmp: &ComparePredicate) -> bool {
    let Operand::Value(expected) = &cmp.operand else {
        return false;
    };

    on_present(row, &cmp.field, |actual| {
        if actual.is_null() {
            return false;
        }

        match cmp.op {
            CompareOp::Eq => actual.compare_eq(expected),
            CompareOp::Ne => !actual.compare_eq(expected),
            CompareOp::Lt => actual
                .compare_order(expected)
                .is_some_and(std::cmp::Ordering::is_lt),
            CompareOp::Lte => actual
                .compare_order(expected)
                .is_some_and(std::cmp::Ordering::is_le),
            CompareOp::Gt => actual
                .compare_order(expected)
                .is_some_and(std::cmp::Ordering::is_gt),
            CompareOp::Gte => actual
                .compare_order(expected)
                .is_some_and(std::cmp::Ordering::is_ge),
            CompareOp::In => match expected {
                Value::List(candidates) => {
                    candidates.iter().any(|candidate| actual.compare_eq(candidate))
                }
                _ => false,
            },
            CompareOp::NotIn => match expected {
                Value::List(candidates) => {
                    candidates.iter().all(|candidate| !actual.compare_eq(candidate))
                }
                _ => false,
            },
            CompareOp::Contains => actual.text_contains(expected).unwrap_or(false),
            CompareOp::StartsWith => actual.text_starts_with(expected).unwrap_or(false),
            CompareOp::EndsWith => actual.text_ends_with(expected).unwrap_or(false),
        }
    })
}

///
/// TESTS
///
