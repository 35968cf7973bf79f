//! Scalar cells and the two table shapes the container exchanges.
//!
//! - [`Scalar`] is one typed cell value.
//! - [`LongTable`] is an observation-per-row table with named columns. It is
//!   only an interchange shape for [`crate::transcode`].
//! - [`MetaTable`] is a label-indexed table used for per-row and per-column
//!   descriptors. Its index is the axis label sequence of the container.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use sumexp_core::{Result, SumExpError};

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// Free-text value.
    Text(String),
    /// Floating-point value.
    Float(f64),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// Absent value.
    Missing,
}

/// Hashable identity of a [`Scalar`], used for distinct-value counting.
///
/// All `NaN` payloads collapse to one key and `-0.0` equals `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Text(String),
    Float(u64),
    Int(i64),
    Bool(bool),
    Missing,
}

impl Scalar {
    /// The identity key of this value.
    pub fn key(&self) -> ScalarKey {
        match self {
            Scalar::Text(s) => ScalarKey::Text(s.clone()),
            Scalar::Float(v) if v.is_nan() => ScalarKey::Float(f64::NAN.to_bits()),
            Scalar::Float(v) if *v == 0.0 => ScalarKey::Float(0.0f64.to_bits()),
            Scalar::Float(v) => ScalarKey::Float(v.to_bits()),
            Scalar::Int(v) => ScalarKey::Int(*v),
            Scalar::Bool(b) => ScalarKey::Bool(*b),
            Scalar::Missing => ScalarKey::Missing,
        }
    }

    /// Whether this is [`Scalar::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }

    /// Whether the cell holds no observation: `Missing` or a `NaN` float.
    pub fn is_absent(&self) -> bool {
        match self {
            Scalar::Missing => true,
            Scalar::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the value. `Missing` maps to `NaN`, `Bool` to 0/1,
    /// and `Text` has no numeric view.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Float(v) => Some(*v),
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Missing => Some(f64::NAN),
            Scalar::Text(_) => None,
        }
    }

    /// The string slice of a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to an axis label. `Missing` has no label.
    pub fn to_label(&self) -> Option<String> {
        match self {
            Scalar::Missing => None,
            Scalar::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Missing => f.write_str("NA"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Scalar::Missing, Into::into)
    }
}

/// Number of distinct present values in a column. Absent cells
/// (`Missing`, `NaN`) are not counted.
pub fn n_distinct(values: &[Scalar]) -> usize {
    values
        .iter()
        .filter(|v| !v.is_absent())
        .map(Scalar::key)
        .collect::<HashSet<_>>()
        .len()
}

/// The single present value of a column, if every present cell agrees.
/// A column with no present cells has none.
pub fn constant_value(values: &[Scalar]) -> Option<&Scalar> {
    let mut present = values.iter().filter(|v| !v.is_absent());
    let first = present.next()?;
    let key = first.key();
    present.all(|v| v.key() == key).then_some(first)
}

/// Fail with [`SumExpError::DuplicateLabelAssignment`] if any label repeats.
pub(crate) fn ensure_unique(labels: &[String], axis: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(SumExpError::DuplicateLabelAssignment(format!(
                "{axis} label '{label}' appears more than once"
            )));
        }
    }
    Ok(())
}

/// Map each label to its position.
pub(crate) fn positions_of(labels: &[String]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect()
}

/// A long-format table: ordered, named, equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "LongTableParts"))]
pub struct LongTable {
    columns: IndexMap<String, Vec<Scalar>>,
    n_rows: usize,
}

impl LongTable {
    /// An empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs.
    ///
    /// # Errors
    ///
    /// Fails if column lengths differ or a name repeats.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Scalar>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Append a column. The first column fixes the row count.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Scalar>) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SumExpError::MalformedInput(format!(
                "column '{name}' already exists"
            )));
        }
        if self.columns.is_empty() {
            self.n_rows = values.len();
        } else if values.len() != self.n_rows {
            return Err(SumExpError::DimensionMismatch {
                expected: self.n_rows,
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Number of observations.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// One column by name.
    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Whether a column exists.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// All columns, in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Scalar])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// A label-indexed metadata table.
///
/// Every column has one value per index label. Index labels are unique.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "MetaTableParts"))]
pub struct MetaTable {
    index_name: Option<String>,
    index: Vec<String>,
    columns: IndexMap<String, Vec<Scalar>>,
}

impl MetaTable {
    /// A table with the given index and no columns.
    ///
    /// # Errors
    ///
    /// Returns [`SumExpError::DuplicateLabelAssignment`] if a label repeats.
    pub fn new(index: Vec<String>) -> Result<Self> {
        ensure_unique(&index, "index")?;
        Ok(Self {
            index_name: None,
            index,
            columns: IndexMap::new(),
        })
    }

    /// Set the name of the index (the key column it came from).
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Name of the index, if any.
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Index labels, in order.
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names, in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Whether a column exists.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// One column by name.
    pub fn column(&self, name: &str) -> Option<&[Scalar]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// All columns, in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Scalar])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Add or replace a column.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Scalar>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(SumExpError::DimensionMismatch {
                expected: self.len(),
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Position of a label in the index.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.index.iter().position(|l| l == label)
    }

    /// The value at (`label`, `column`).
    pub fn get(&self, label: &str, column: &str) -> Option<&Scalar> {
        let i = self.position(label)?;
        self.columns.get(column).map(|c| &c[i])
    }

    /// Replace the index labels, keeping every column's values.
    pub fn set_index(&mut self, index: Vec<String>) -> Result<()> {
        if index.len() != self.len() {
            return Err(SumExpError::DimensionMismatch {
                expected: self.len(),
                found: index.len(),
            });
        }
        ensure_unique(&index, "index")?;
        self.index = index;
        Ok(())
    }

    /// Rows at the given positions, in the given order.
    ///
    /// # Errors
    ///
    /// Fails on an out-of-range position, or if a position repeats (the
    /// result would carry a duplicate label).
    pub fn take(&self, positions: &[usize]) -> Result<MetaTable> {
        for &i in positions {
            if i >= self.len() {
                return Err(SumExpError::IndexOutOfBounds {
                    index: i as isize,
                    len: self.len(),
                });
            }
        }
        let index: Vec<String> = positions.iter().map(|&i| self.index[i].clone()).collect();
        ensure_unique(&index, "index")?;
        let columns = self
            .columns
            .iter()
            .map(|(k, v)| (k.clone(), positions.iter().map(|&i| v[i].clone()).collect()))
            .collect();
        Ok(MetaTable {
            index_name: self.index_name.clone(),
            index,
            columns,
        })
    }

    /// Stack `other`'s rows under this table's rows.
    ///
    /// Columns are unioned, this table's first; cells a side lacks are
    /// [`Scalar::Missing`].
    pub fn concat(&self, other: &MetaTable) -> Result<MetaTable> {
        let mut index = self.index.clone();
        index.extend(other.index.iter().cloned());
        ensure_unique(&index, "index")?;

        let mut names: Vec<&String> = self.columns.keys().collect();
        names.extend(other.columns.keys().filter(|k| !self.columns.contains_key(*k)));

        let mut columns = IndexMap::with_capacity(names.len());
        for name in names {
            let mut values = Vec::with_capacity(index.len());
            match self.columns.get(name) {
                Some(v) => values.extend(v.iter().cloned()),
                None => values.extend(std::iter::repeat(Scalar::Missing).take(self.len())),
            }
            match other.columns.get(name) {
                Some(v) => values.extend(v.iter().cloned()),
                None => values.extend(std::iter::repeat(Scalar::Missing).take(other.len())),
            }
            columns.insert(name.clone(), values);
        }

        Ok(MetaTable {
            index_name: self.index_name.clone().or_else(|| other.index_name.clone()),
            index,
            columns,
        })
    }
}

/// Deserialized fields of a [`LongTable`], checked by `from_columns`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct LongTableParts {
    columns: IndexMap<String, Vec<Scalar>>,
    n_rows: usize,
}

#[cfg(feature = "serde")]
impl TryFrom<LongTableParts> for LongTable {
    type Error = SumExpError;

    fn try_from(parts: LongTableParts) -> Result<Self> {
        let table = LongTable::from_columns(parts.columns)?;
        if table.n_rows != parts.n_rows {
            return Err(SumExpError::DimensionMismatch {
                expected: parts.n_rows,
                found: table.n_rows,
            });
        }
        Ok(table)
    }
}

/// Deserialized fields of a [`MetaTable`], checked by `new` and
/// `push_column`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct MetaTableParts {
    index_name: Option<String>,
    index: Vec<String>,
    columns: IndexMap<String, Vec<Scalar>>,
}

#[cfg(feature = "serde")]
impl TryFrom<MetaTableParts> for MetaTable {
    type Error = SumExpError;

    fn try_from(parts: MetaTableParts) -> Result<Self> {
        let mut table = MetaTable::new(parts.index)?;
        table.index_name = parts.index_name;
        for (name, values) in parts.columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }
}
