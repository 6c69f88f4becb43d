use crate::types::{Timestamp, Ulid};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Value
/// can be used in WHERE clauses and row records
///
/// Null → the field's value is absent (i.e., SQL NULL).
/// Unit → internal placeholder for an unbound RHS; not a real value.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// Ordered list of values, used for `In`/`NotIn` transport.
    List(Vec<Self>),
    Null,
    Text(String),
    Timestamp(Timestamp),
    Uint(u64),
    Ulid(Ulid),
    Unit,
}

impl Value {
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::Bool(_) => ValueTag::Bool,
            Self::Int(_) => ValueTag::Int,
            Self::List(_) => ValueTag::List,
            Self::Null => ValueTag::Null,
            Self::Text(_) => ValueTag::Text,
            Self::Timestamp(_) => ValueTag::Timestamp,
            Self::Uint(_) => ValueTag::Uint,
            Self::Ulid(_) => ValueTag::Ulid,
            Self::Unit => ValueTag::Unit,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Value equality within a family; `Int` and `Uint` compare numerically.
    #[must_use]
    pub fn compare_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Uint(b)) => u64::try_from(*a).is_ok_and(|a| a == *b),
            (Self::Uint(a), Self::Int(b)) => u64::try_from(*b).is_ok_and(|b| *a == b),
            _ => self == other,
        }
    }

    /// Ordered comparison; `None` when the operands are from different
    /// families (and therefore have no defined order).
    #[must_use]
    pub fn compare_order(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Uint(a), Self::Uint(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Uint(b)) => Some(match u64::try_from(*a) {
                Ok(a) => a.cmp(b),
                Err(_) => Ordering::Less,
            }),
            (Self::Uint(a), Self::Int(b)) => Some(match u64::try_from(*b) {
                Ok(b) => a.cmp(&b),
                Err(_) => Ordering::Greater,
            }),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Ulid(a), Self::Ulid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Cross-family total order used only for stable row sorting. Families
    /// order by rank, values within a family by `compare_order`.
    #[must_use]
    pub fn rank_order(&self, other: &Self) -> Ordering {
        self.compare_order(other)
            .unwrap_or_else(|| self.tag().rank().cmp(&other.tag().rank()))
    }

    #[must_use]
    pub fn text_starts_with(&self, needle: &Self) -> Option<bool> {
        match (self, needle) {
            (Self::Text(a), Self::Text(b)) => Some(a.starts_with(b.as_str())),
            _ => None,
        }
    }

    #[must_use]
    pub fn text_ends_with(&self, needle: &Self) -> Option<bool> {
        match (self, needle) {
            (Self::Text(a), Self::Text(b)) => Some(a.ends_with(b.as_str())),
            _ => None,
        }
    }

    #[must_use]
    pub fn text_contains(&self, needle: &Self) -> Option<bool> {
        match (self, needle) {
            (Self::Text(a), Self::Text(b)) => Some(a.contains(b.as_str())),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(n) => Some(*n),
            Self::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Uint(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Ulid> for Value {
    fn from(u: Ulid) -> Self {
        Self::Ulid(u)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

///
/// ValueTag
///
/// Variant discriminant used for family checks and cross-family row
/// ordering. Rank order is part of the stable-sort contract; renumbering
/// changes observable row order for mixed-family columns.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Bool,
    Int,
    List,
    Null,
    Text,
    Timestamp,
    Uint,
    Ulid,
    Unit,
}

impl ValueTag {
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool => 1,
            Self::Int | Self::Uint => 2,
            Self::Timestamp => 3,
            Self::Ulid => 4,
            Self::Text => 5,
            Self::List => 6,
            Self::Unit => 7,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_uint_compare_numerically() {
        assert!(Value::Int(5).compare_eq(&Value::Uint(5)));
        assert!(!Value::Int(-5).compare_eq(&Value::Uint(5)));
        assert_eq!(
            Value::Int(-1).compare_order(&Value::Uint(0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Uint(1).compare_order(&Value::Int(-1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn cross_family_order_is_undefined() {
        assert_eq!(Value::Int(1).compare_order(&Value::Text("1".into())), None);
    }

    #[test]
    fn rank_order_is_total() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Null,
            Value::Uint(2),
            Value::Int(1),
            Value::Bool(true),
        ];
        values.sort_by(Value::rank_order);

        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Bool(true));
        assert_eq!(values[2], Value::Int(1));
        assert_eq!(values[3], Value::Uint(2));
        assert_eq!(values[4], Value::Text("b".into()));
    }

    #[test]
    fn text_predicates_only_apply_to_text() {
        let hay = Value::Text("username".into());
        assert_eq!(hay.text_starts_with(&Value::Text("user".into())), Some(true));
        assert_eq!(hay.text_ends_with(&Value::Text("name".into())), Some(true));
        assert_eq!(hay.text_contains(&Value::Text("erna".into())), Some(true));
        assert_eq!(hay.text_contains(&Value::Int(1)), None);
    }

    #[test]
    fn option_lifts_to_null() {
        let v: Value = Option::<u64>::None.into();
        assert!(v.is_null());

        let v: Value = Some(3_u64).into();
        assert_eq!(v, Value::Uint(3));
    }

    #[test]
    fn value_wire_roundtrip() {
        let v = Value::List(vec![
            Value::Int(-3),
            Value::Text("x".into()),
            Value::Ulid(Ulid::from_u128(5)),
            Value::Timestamp(crate::types::Timestamp::from_seconds(7)),
            Value::Null,
        ]);

        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn ulid_values_order_by_key_material() {
        let a = Value::Ulid(Ulid::from_u128(10));
        let b = Value::Ulid(Ulid::from_u128(20));
        assert_eq!(a.compare_order(&b), Some(Ordering::Less));
    }
}
