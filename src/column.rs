//! Typed column storage.
//!
//! A Column is an array-like random-access container of cells that all share
//! one `ColumnType`. Every column may hold explicit nulls: a cell that fails
//! to parse at load time, or a metric that is undefined for a group, is
//! stored as `ColumnValue::Null` rather than rejected.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
    /// Calendar date stored as days since 1970-01-01.
    Date,
}

impl ColumnType {
    /// Numeric and date columns can be range-filtered and used as ordered
    /// period keys.
    pub fn is_ordered_numeric(&self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64 | ColumnType::Date)
    }
}

/// Column value enum to support multiple types
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Date(i32),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            ColumnValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Like `as_f64` but also maps dates to their day number, which is what
    /// range filters and period ordering compare on.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ColumnValue::Date(days) => Some(*days as f64),
            other => other.as_f64(),
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<i32> {
        match self {
            ColumnValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Wraps an optional float, mapping `None` and non-finite results to null.
    pub fn from_metric(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => ColumnValue::Float64(v),
            _ => ColumnValue::Null,
        }
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Int64(_) => Some(ColumnType::Int64),
            ColumnValue::Float64(_) => Some(ColumnType::Float64),
            ColumnValue::String(_) => Some(ColumnType::String),
            ColumnValue::Bool(_) => Some(ColumnType::Bool),
            ColumnValue::Date(_) => Some(ColumnType::Date),
            ColumnValue::Null => None,
        }
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            ColumnValue::Int64(n) => serde_json::Value::Number((*n).into()),
            ColumnValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ColumnValue::String(s) => serde_json::Value::String(s.clone()),
            ColumnValue::Bool(b) => serde_json::Value::Bool(*b),
            ColumnValue::Date(days) => serde_json::Value::String(crate::table::format_date(*days)),
            ColumnValue::Null => serde_json::Value::Null,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            ColumnValue::Bool(_) => 0,
            ColumnValue::Int64(_) | ColumnValue::Float64(_) => 1,
            ColumnValue::Date(_) => 2,
            ColumnValue::String(_) => 3,
            ColumnValue::Null => 4,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int64(n) => write!(f, "{}", n),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(s) => f.write_str(s),
            ColumnValue::Bool(b) => write!(f, "{}", b),
            ColumnValue::Date(days) => f.write_str(&crate::table::format_date(*days)),
            ColumnValue::Null => Ok(()),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int64(v)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Float64(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::String(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::String(v)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

/// Orders two non-null values. Integers and floats compare numerically;
/// values of unrelated types fall back to a fixed type order so sorting is
/// deterministic.
pub(crate) fn compare_non_null(a: &ColumnValue, b: &ColumnValue) -> Ordering {
    match (a, b) {
        (ColumnValue::Int64(a), ColumnValue::Int64(b)) => a.cmp(b),
        (ColumnValue::String(a), ColumnValue::String(b)) => a.cmp(b),
        (ColumnValue::Bool(a), ColumnValue::Bool(b)) => a.cmp(b),
        (ColumnValue::Date(a), ColumnValue::Date(b)) => a.cmp(b),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.type_rank().cmp(&b.type_rank()),
        },
    }
}

/// Ascending order with nulls after every non-null value.
pub(crate) fn compare_nulls_last(a: &ColumnValue, b: &ColumnValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_non_null(a, b),
    }
}

/// Hashable wrapper giving `ColumnValue` exact-equality semantics for group
/// identity. Floats are compared bitwise after folding `-0.0` into `0.0`.
#[derive(Debug, Clone)]
pub(crate) struct GroupValue(pub ColumnValue);

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for GroupValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (ColumnValue::Float64(a), ColumnValue::Float64(b)) => canonical_bits(*a) == canonical_bits(*b),
            (a, b) => a == b,
        }
    }
}

impl Eq for GroupValue {}

impl Hash for GroupValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            ColumnValue::Int64(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            ColumnValue::Float64(v) => {
                1u8.hash(state);
                canonical_bits(*v).hash(state);
            }
            ColumnValue::String(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            ColumnValue::Bool(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            ColumnValue::Date(d) => {
                4u8.hash(state);
                d.hash(state);
            }
            ColumnValue::Null => 5u8.hash(state),
        }
    }
}

/// A named, typed sequence of cells.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<ColumnValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
            values: Vec::new(),
        }
    }

    /// Builds a column from cells, checking every cell against the type.
    pub fn from_values(
        name: impl Into<String>,
        column_type: ColumnType,
        values: Vec<ColumnValue>,
    ) -> Result<Self> {
        let mut column = Column::new(name, column_type);
        column.values.reserve(values.len());
        for value in values {
            column.push(value)?;
        }
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    /// Numeric view of a cell; nulls and non-numeric cells are `None`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|v| v.as_f64())
    }

    pub fn is_null_at(&self, index: usize) -> bool {
        self.values.get(index).map_or(true, |v| v.is_null())
    }

    /// Validate and convert value to the column type
    fn validate_value(&self, value: ColumnValue) -> Result<ColumnValue> {
        match (value, self.column_type) {
            (ColumnValue::Null, _) => Ok(ColumnValue::Null),
            (v @ ColumnValue::Int64(_), ColumnType::Int64) => Ok(v),
            (v @ ColumnValue::Float64(_), ColumnType::Float64) => Ok(v),
            (ColumnValue::Int64(n), ColumnType::Float64) => Ok(ColumnValue::Float64(n as f64)),
            (v @ ColumnValue::String(_), ColumnType::String) => Ok(v),
            (v @ ColumnValue::Bool(_), ColumnType::Bool) => Ok(v),
            (v @ ColumnValue::Date(_), ColumnType::Date) => Ok(v),
            (v, expected) => Err(Error::InvalidArgument(format!(
                "type mismatch in column '{}': expected {:?}, got {:?}",
                self.name, expected, v
            ))),
        }
    }

    pub fn push(&mut self, value: ColumnValue) -> Result<()> {
        let value = self.validate_value(value)?;
        self.values.push(value);
        Ok(())
    }

    /// New column holding the cells at `indices`, in that order.
    pub(crate) fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            values: indices
                .iter()
                .map(|&i| self.values.get(i).cloned().unwrap_or(ColumnValue::Null))
                .collect(),
        }
    }
}
