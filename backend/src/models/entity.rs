//! Entity abstraction shared by every persisted aggregate.
//!
//! The generic repository and the specification evaluator only ever talk to
//! entities through this trait: an integer identity plus the ability to read a
//! named field as a [`ScalarValue`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single column value lifted out of an entity.
///
/// Serialized untagged, so a list of values renders as plain JSON numbers and
/// strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Total ordering used for sorting and equality filters.
    ///
    /// Integers and floats compare numerically with each other, text compares
    /// lexicographically, and every number sorts before any text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }

    /// Equality under [`ScalarValue::compare`], so `Int(3)` matches `Float(3.0)`.
    pub fn matches(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }

    /// Consume the value and keep it only if it is text.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A persisted aggregate with an integer identity.
///
/// `Field` enumerates the columns a specification may filter, sort or project
/// on. Implementations must return the same variant of [`ScalarValue`] for a
/// given field on every instance.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Column selector for this entity.
    type Field: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// Human-readable entity name used in errors and logs.
    const NAME: &'static str;

    /// Identity assigned by the store; `0` until the entity is committed.
    fn id(&self) -> i32;

    fn set_id(&mut self, id: i32);

    /// Read one column.
    fn value_of(&self, field: Self::Field) -> ScalarValue;
}
