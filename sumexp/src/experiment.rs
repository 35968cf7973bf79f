//! SummarizedExperiment-like container for aligned omics assays.
//!
//! # Structure
//!
//! - `assays`: named numeric matrices (features × samples), all sharing
//!   the same row and column labels
//! - `row_data`: per-feature metadata, indexed by row label
//! - `col_data`: per-sample metadata, indexed by column label
//! - `metadata`: experiment-level key/value pairs, untouched by subsetting
//!   and binding
//!
//! Every mutating operation comes in two forms. The plain name (`subset`,
//! `bind`, `with_assay`, ...) borrows the container and returns a new,
//! independent one. The `_in_place`/`set_` form mutates the receiver. Either
//! form validates everything before it touches storage, so a failed call
//! leaves the receiver as it was.
//!
//! # Example
//!
//! ```
//! use sumexp::{Dimnames, LongTable, Scalar, SummarizedExperiment};
//!
//! let long = LongTable::from_columns([
//!     ("gene", vec!["g1".into(), "g1".into(), "g2".into(), "g2".into()]),
//!     ("sample", vec!["s1".into(), "s2".into(), "s1".into(), "s2".into()]),
//!     ("counts", vec![Scalar::Float(3.0), Scalar::Float(0.0), Scalar::Float(8.0), Scalar::Float(5.0)]),
//! ]).unwrap();
//!
//! let se = SummarizedExperiment::from_long(&long, "gene", "sample").unwrap();
//! assert_eq!(se.shape(), (2, 2));
//!
//! let first = se.subset(vec!["g2"], ..).unwrap();
//! assert_eq!(first.assay("counts").unwrap().as_slice(), &[8.0, 5.0]);
//! ```

use std::collections::HashSet;

use indexmap::IndexMap;
use sumexp_core::{Dimnames, Result, SumExpError};
use tracing::debug;

use crate::bind::{self, Axis, BindOutcome, Compatibility};
use crate::matrix::AssayMatrix;
use crate::selector::Selector;
use crate::table::{ensure_unique, LongTable, MetaTable, Scalar};
use crate::transcode;

/// Container of assays sharing row and column metadata.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ExperimentParts"))]
pub struct SummarizedExperiment {
    assays: IndexMap<String, AssayMatrix>,
    row_data: MetaTable,
    col_data: MetaTable,
    metadata: IndexMap<String, Scalar>,
}

impl SummarizedExperiment {
    /// Create a container from assays and both metadata tables.
    ///
    /// Each assay must carry exactly the label sets of `row_data` and
    /// `col_data`; assays in a different order are rearranged to the
    /// metadata order.
    ///
    /// # Errors
    ///
    /// Returns [`SumExpError::AssayShapeMismatch`] if an assay's labels do not
    /// match the metadata indexes.
    pub fn new(
        assays: IndexMap<String, AssayMatrix>,
        row_data: MetaTable,
        col_data: MetaTable,
        metadata: IndexMap<String, Scalar>,
    ) -> Result<Self> {
        let mut se = Self {
            assays: IndexMap::with_capacity(assays.len()),
            row_data,
            col_data,
            metadata,
        };
        for (name, matrix) in assays {
            let aligned = se.align_assay(&name, matrix)?;
            se.assays.insert(name, aligned);
        }
        Ok(se)
    }

    /// Create a container from assays alone. The first assay's labels define
    /// both axes; the metadata tables have no columns.
    pub fn from_assays(assays: IndexMap<String, AssayMatrix>) -> Result<Self> {
        let (row_names, col_names) = match assays.values().next() {
            Some(first) => (first.row_names().to_vec(), first.col_names().to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        let row_data = MetaTable::new(row_names)?;
        let col_data = MetaTable::new(col_names)?;
        Self::new(assays, row_data, col_data, IndexMap::new())
    }

    /// Build a container from a long-format table.
    ///
    /// See [`transcode::decompose`] for how columns are assigned.
    pub fn from_long(table: &LongTable, row_key: &str, col_key: &str) -> Result<Self> {
        let parts = transcode::decompose(table, row_key, col_key)?;
        Self::new(parts.assays, parts.row_data, parts.col_data, parts.metadata)
    }

    /// Export to a long-format table (inverse of [`Self::from_long`], minus
    /// experiment metadata).
    pub fn to_long(&self) -> Result<LongTable> {
        transcode::compose(&self.assays, &self.row_data, &self.col_data)
    }

    /// Check that `matrix` carries the container's label sets and return it
    /// in the container's label order.
    fn align_assay(&self, name: &str, matrix: AssayMatrix) -> Result<AssayMatrix> {
        if matrix.row_names() == self.row_names() && matrix.col_names() == self.col_names() {
            return Ok(matrix);
        }
        if !same_label_set(matrix.row_names(), self.row_names()) {
            return Err(SumExpError::AssayShapeMismatch(format!(
                "assay '{name}' row labels differ from the container's"
            )));
        }
        if !same_label_set(matrix.col_names(), self.col_names()) {
            return Err(SumExpError::AssayShapeMismatch(format!(
                "assay '{name}' column labels differ from the container's"
            )));
        }
        Ok(matrix.reindex(self.row_names(), self.col_names()))
    }

    pub fn n_rows(&self) -> usize {
        self.row_data.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_data.len()
    }

    // ---- assays ----

    /// All assays, in insertion order.
    pub fn assays(&self) -> &IndexMap<String, AssayMatrix> {
        &self.assays
    }

    /// Assay names, in insertion order.
    pub fn assay_names(&self) -> impl Iterator<Item = &str> {
        self.assays.keys().map(String::as_str)
    }

    pub fn n_assays(&self) -> usize {
        self.assays.len()
    }

    /// One assay by name.
    pub fn assay(&self, name: &str) -> Option<&AssayMatrix> {
        self.assays.get(name)
    }

    /// One assay by insertion position.
    pub fn assay_at(&self, i: usize) -> Option<&AssayMatrix> {
        self.assays.get_index(i).map(|(_, m)| m)
    }

    /// Add or replace an assay in place.
    ///
    /// # Errors
    ///
    /// Returns [`SumExpError::AssayShapeMismatch`] if the matrix's row or
    /// column label set differs from the container's.
    pub fn set_assay(&mut self, name: impl Into<String>, matrix: AssayMatrix) -> Result<()> {
        let name = name.into();
        let aligned = self.align_assay(&name, matrix)?;
        self.assays.insert(name, aligned);
        Ok(())
    }

    /// A copy with an assay added or replaced.
    pub fn with_assay(&self, name: impl Into<String>, matrix: AssayMatrix) -> Result<Self> {
        let mut se = self.clone();
        se.set_assay(name, matrix)?;
        Ok(se)
    }

    /// Remove an assay, keeping the order of the others.
    pub fn remove_assay(&mut self, name: &str) -> Option<AssayMatrix> {
        self.assays.shift_remove(name)
    }

    // ---- metadata ----

    /// Per-feature metadata.
    pub fn row_data(&self) -> &MetaTable {
        &self.row_data
    }

    /// One per-feature metadata column.
    pub fn row_data_column(&self, name: &str) -> Option<&[Scalar]> {
        self.row_data.column(name)
    }

    /// Per-sample metadata.
    pub fn col_data(&self) -> &MetaTable {
        &self.col_data
    }

    /// One per-sample metadata column.
    pub fn col_data_column(&self, name: &str) -> Option<&[Scalar]> {
        self.col_data.column(name)
    }

    /// Experiment-level metadata.
    pub fn metadata(&self) -> &IndexMap<String, Scalar> {
        &self.metadata
    }

    /// One experiment-level metadata value.
    pub fn metadata_value(&self, key: &str) -> Option<&Scalar> {
        self.metadata.get(key)
    }

    /// Insert an experiment-level metadata value, returning the previous one.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.metadata.insert(key.into(), value.into())
    }

    // ---- relabeling ----

    /// Replace the row labels in place.
    ///
    /// # Errors
    ///
    /// [`SumExpError::DimensionMismatch`] if the count differs and
    /// [`SumExpError::DuplicateLabelAssignment`] if a label repeats.
    pub fn set_row_names(&mut self, names: Vec<String>) -> Result<()> {
        self.check_relabel(&names, self.n_rows(), "row")?;
        for matrix in self.assays.values_mut() {
            matrix.relabel_rows(names.clone())?;
        }
        self.row_data.set_index(names)
    }

    /// A copy with new row labels.
    pub fn with_row_names(&self, names: Vec<String>) -> Result<Self> {
        let mut se = self.clone();
        se.set_row_names(names)?;
        Ok(se)
    }

    /// Replace the column labels in place.
    ///
    /// # Errors
    ///
    /// [`SumExpError::DimensionMismatch`] if the count differs and
    /// [`SumExpError::DuplicateLabelAssignment`] if a label repeats.
    pub fn set_col_names(&mut self, names: Vec<String>) -> Result<()> {
        self.check_relabel(&names, self.n_cols(), "column")?;
        for matrix in self.assays.values_mut() {
            matrix.relabel_cols(names.clone())?;
        }
        self.col_data.set_index(names)
    }

    /// A copy with new column labels.
    pub fn with_col_names(&self, names: Vec<String>) -> Result<Self> {
        let mut se = self.clone();
        se.set_col_names(names)?;
        Ok(se)
    }

    fn check_relabel(&self, names: &[String], expected: usize, axis: &str) -> Result<()> {
        if names.len() != expected {
            return Err(SumExpError::DimensionMismatch {
                expected,
                found: names.len(),
            });
        }
        ensure_unique(names, axis)
    }

    // ---- subsetting ----

    /// A new container narrowed to the selected rows and columns.
    ///
    /// Both selectors are resolved against the current labels before
    /// anything is copied. Selection order is kept, so this also reorders.
    ///
    /// # Errors
    ///
    /// Any resolution error from [`Selector::resolve_positions`], and
    /// [`SumExpError::DuplicateLabelAssignment`] if a selector repeats a
    /// label (use [`Self::view`] for resampling with repeats).
    pub fn subset(&self, rows: impl Into<Selector>, cols: impl Into<Selector>) -> Result<Self> {
        let rows = rows.into().resolve_positions(self.row_names())?;
        let cols = cols.into().resolve_positions(self.col_names())?;
        self.take(&rows, &cols)
    }

    /// Narrow this container to the selected rows and columns.
    pub fn subset_in_place(&mut self, rows: impl Into<Selector>, cols: impl Into<Selector>) -> Result<()> {
        *self = self.subset(rows, cols)?;
        Ok(())
    }

    /// A new container narrowed to the selected columns; rows unchanged.
    pub fn select_columns(&self, cols: impl Into<Selector>) -> Result<Self> {
        self.subset(Selector::All, cols)
    }

    /// Narrow this container to the selected columns; rows unchanged.
    pub fn select_columns_in_place(&mut self, cols: impl Into<Selector>) -> Result<()> {
        self.subset_in_place(Selector::All, cols)
    }

    pub(crate) fn take(&self, rows: &[usize], cols: &[usize]) -> Result<Self> {
        let row_data = self.row_data.take(rows)?;
        let col_data = self.col_data.take(cols)?;
        let assays = self
            .assays
            .iter()
            .map(|(name, m)| Ok((name.clone(), m.take(rows, cols)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            assays,
            row_data,
            col_data,
            metadata: self.metadata.clone(),
        })
    }

    /// A borrowed selection over this container. Nothing is copied, and
    /// selectors may repeat labels.
    pub fn view(&self, rows: impl Into<Selector>, cols: impl Into<Selector>) -> Result<ExperimentView<'_>> {
        let rows = rows.into().resolve_positions(self.row_names())?;
        let cols = cols.into().resolve_positions(self.col_names())?;
        Ok(ExperimentView::new(self, rows, cols))
    }

    // ---- binding ----

    /// Bind `other` along `axis`, returning the result as a new container.
    ///
    /// If the two containers are not compatible (see [`bind::check_bind`])
    /// the result is an unchanged copy and the outcome is
    /// [`BindOutcome::Skipped`].
    pub fn bind(&self, other: &SummarizedExperiment, axis: Axis) -> Result<(Self, BindOutcome)> {
        let mut se = self.clone();
        let outcome = se.bind_in_place(other, axis)?;
        Ok((se, outcome))
    }

    /// Bind `other` into this container along `axis`.
    pub fn bind_in_place(&mut self, other: &SummarizedExperiment, axis: Axis) -> Result<BindOutcome> {
        if let Compatibility::Incompatible(conflicts) = bind::check_bind(self, other, axis) {
            debug!(?axis, ?conflicts, "bind skipped");
            return Ok(BindOutcome::Skipped(conflicts));
        }

        let merged = bind::merge(self, other, axis)?;
        if !merged.dropped_assays.is_empty() {
            debug!(?axis, dropped = ?merged.dropped_assays, "assays missing from the bound container were dropped");
        }
        self.assays = merged.assays;
        self.row_data = merged.row_data;
        self.col_data = merged.col_data;
        Ok(BindOutcome::Bound {
            dropped_assays: merged.dropped_assays,
        })
    }
}

impl Dimnames for SummarizedExperiment {
    fn row_names(&self) -> &[String] {
        self.row_data.index()
    }

    fn col_names(&self) -> &[String] {
        self.col_data.index()
    }
}

/// Deserialized fields of a [`SummarizedExperiment`], aligned by `new`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ExperimentParts {
    assays: IndexMap<String, AssayMatrix>,
    row_data: MetaTable,
    col_data: MetaTable,
    metadata: IndexMap<String, Scalar>,
}

#[cfg(feature = "serde")]
impl TryFrom<ExperimentParts> for SummarizedExperiment {
    type Error = SumExpError;

    fn try_from(parts: ExperimentParts) -> Result<Self> {
        Self::new(parts.assays, parts.row_data, parts.col_data, parts.metadata)
    }
}

fn same_label_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    a == b
}

/// A borrowed selection of a [`SummarizedExperiment`].
///
/// The view holds the resolved positions and reads through to the source.
/// Positions may repeat, which is how bootstrap-style resampling is
/// expressed; [`ExperimentView::to_experiment`] materializes the view and then
/// requires distinct labels like any container.
#[derive(Debug, Clone)]
pub struct ExperimentView<'a> {
    source: &'a SummarizedExperiment,
    rows: Vec<usize>,
    cols: Vec<usize>,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

impl<'a> ExperimentView<'a> {
    fn new(source: &'a SummarizedExperiment, rows: Vec<usize>, cols: Vec<usize>) -> Self {
        let row_names = rows.iter().map(|&i| source.row_names()[i].clone()).collect();
        let col_names = cols.iter().map(|&j| source.col_names()[j].clone()).collect();
        Self {
            source,
            rows,
            cols,
            row_names,
            col_names,
        }
    }

    /// The container this view reads from.
    pub fn source(&self) -> &'a SummarizedExperiment {
        self.source
    }

    /// One cell of a named assay, by position within the view.
    pub fn get(&self, assay: &str, row: usize, col: usize) -> Option<f64> {
        let m = self.source.assay(assay)?;
        m.get(*self.rows.get(row)?, *self.cols.get(col)?)
    }

    /// One row of a named assay within the view.
    pub fn row_values(&self, assay: &str, row: usize) -> Option<Vec<f64>> {
        let m = self.source.assay(assay)?;
        let values = m.row(*self.rows.get(row)?)?;
        Some(self.cols.iter().map(|&j| values[j]).collect())
    }

    /// One per-feature metadata value within the view.
    pub fn row_data_value(&self, row: usize, column: &str) -> Option<&'a Scalar> {
        let i = *self.rows.get(row)?;
        self.source.row_data().column(column).map(|c| &c[i])
    }

    /// One per-sample metadata value within the view.
    pub fn col_data_value(&self, col: usize, column: &str) -> Option<&'a Scalar> {
        let j = *self.cols.get(col)?;
        self.source.col_data().column(column).map(|c| &c[j])
    }

    /// Copy the selection into an independent container.
    pub fn to_experiment(&self) -> Result<SummarizedExperiment> {
        self.source.take(&self.rows, &self.cols)
    }
}

impl Dimnames for ExperimentView<'_> {
    fn row_names(&self) -> &[String] {
        &self.row_names
    }

    fn col_names(&self) -> &[String] {
        &self.col_names
    }
}
