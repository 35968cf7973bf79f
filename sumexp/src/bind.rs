//! Compatibility checks for binding two containers, and the merge that
//! follows a successful check.
//!
//! Binding along [`Axis::Rows`] stacks the argument's features under the
//! receiver's. It requires that:
//!
//! - every receiver sample is also an argument sample,
//! - every receiver column-metadata field is also an argument field,
//! - no feature appears in both containers.
//!
//! [`Axis::Columns`] is the mirror image. An incompatible pair is not an
//! error: the bind is skipped and reported as [`BindOutcome::Skipped`].

use std::collections::HashSet;

use indexmap::IndexMap;
use sumexp_core::{Dimnames, Result, SumExpError};

use crate::experiment::SummarizedExperiment;
use crate::matrix::AssayMatrix;
use crate::table::{positions_of, MetaTable, Scalar};

/// The axis along which two containers are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// Axis 0: add features (rows).
    Rows,
    /// Axis 1: add samples (columns).
    Columns,
}

impl Axis {
    /// The numeric axis (0 or 1).
    pub fn index(self) -> usize {
        match self {
            Axis::Rows => 0,
            Axis::Columns => 1,
        }
    }

    /// The other axis.
    pub fn other(self) -> Axis {
        match self {
            Axis::Rows => Axis::Columns,
            Axis::Columns => Axis::Rows,
        }
    }
}

impl TryFrom<i64> for Axis {
    type Error = SumExpError;

    fn try_from(axis: i64) -> Result<Self> {
        match axis {
            0 => Ok(Axis::Rows),
            1 => Ok(Axis::Columns),
            other => Err(SumExpError::IncompatibleBind(format!(
                "axis must be 0 or 1, got {other}"
            ))),
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = SumExpError;

    fn try_from(axis: usize) -> Result<Self> {
        i64::try_from(axis)
            .map_err(|_| SumExpError::IncompatibleBind(format!("axis must be 0 or 1, got {axis}")))
            .and_then(Axis::try_from)
    }
}

/// One reason two containers cannot be bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Receiver labels on `axis` that the argument does not have.
    MissingLabels { axis: Axis, labels: Vec<String> },
    /// Receiver metadata fields on `axis` that the argument does not have.
    MissingMetadataColumns { axis: Axis, columns: Vec<String> },
    /// Labels on `axis` present in both containers.
    OverlappingLabels { axis: Axis, labels: Vec<String> },
}

/// Result of [`check_bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Every failed condition, in check order.
    Incompatible(Vec<Conflict>),
}

impl Compatibility {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Compatibility::Compatible)
    }
}

/// What a bind call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The containers were merged. Receiver assays the argument lacks were
    /// dropped and are listed here.
    Bound { dropped_assays: Vec<String> },
    /// The containers were incompatible; nothing changed.
    Skipped(Vec<Conflict>),
}

impl BindOutcome {
    /// Whether the bind happened.
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound { .. })
    }
}

fn labels(se: &SummarizedExperiment, axis: Axis) -> &[String] {
    match axis {
        Axis::Rows => se.row_names(),
        Axis::Columns => se.col_names(),
    }
}

fn meta(se: &SummarizedExperiment, axis: Axis) -> &MetaTable {
    match axis {
        Axis::Rows => se.row_data(),
        Axis::Columns => se.col_data(),
    }
}

/// Items of `a` that are not in `b`, in `a` order.
fn missing_from<'s>(a: impl Iterator<Item = &'s str>, b: impl Iterator<Item = &'s str>) -> Vec<String> {
    let b: HashSet<&str> = b.collect();
    a.filter(|x| !b.contains(x)).map(str::to_string).collect()
}

/// Decide whether `b` can be bound onto `a` along `axis`.
pub fn check_bind(a: &SummarizedExperiment, b: &SummarizedExperiment, axis: Axis) -> Compatibility {
    let shared = axis.other();
    let mut conflicts = Vec::new();

    let missing = missing_from(
        labels(a, shared).iter().map(String::as_str),
        labels(b, shared).iter().map(String::as_str),
    );
    if !missing.is_empty() {
        conflicts.push(Conflict::MissingLabels {
            axis: shared,
            labels: missing,
        });
    }

    let missing = missing_from(meta(a, shared).column_names(), meta(b, shared).column_names());
    if !missing.is_empty() {
        conflicts.push(Conflict::MissingMetadataColumns {
            axis: shared,
            columns: missing,
        });
    }

    let b_labels: HashSet<&str> = labels(b, axis).iter().map(String::as_str).collect();
    let overlap: Vec<String> = labels(a, axis)
        .iter()
        .filter(|l| b_labels.contains(l.as_str()))
        .cloned()
        .collect();
    if !overlap.is_empty() {
        conflicts.push(Conflict::OverlappingLabels { axis, labels: overlap });
    }

    if conflicts.is_empty() {
        Compatibility::Compatible
    } else {
        Compatibility::Incompatible(conflicts)
    }
}

/// The parts of a bound container.
pub(crate) struct Merged {
    pub assays: IndexMap<String, AssayMatrix>,
    pub row_data: MetaTable,
    pub col_data: MetaTable,
    pub dropped_assays: Vec<String>,
}

/// Merge two compatible containers along `axis`.
///
/// The bound axis is the concatenation of both sides. The shared axis keeps
/// the receiver's labels followed by the argument's extra labels; assay cells
/// a side does not cover are `NaN`.
pub(crate) fn merge(a: &SummarizedExperiment, b: &SummarizedExperiment, axis: Axis) -> Result<Merged> {
    let stacked = meta(a, axis).concat(meta(b, axis))?;
    let shared = merge_shared(meta(a, axis.other()), meta(b, axis.other()))?;

    let mut assays = IndexMap::with_capacity(a.n_assays());
    let mut dropped_assays = Vec::new();
    for (name, ma) in a.assays() {
        let Some(mb) = b.assay(name) else {
            dropped_assays.push(name.clone());
            continue;
        };
        let merged = match axis {
            Axis::Rows => ma
                .reindex(ma.row_names(), shared.index())
                .vstack(&mb.reindex(mb.row_names(), shared.index()))?,
            Axis::Columns => ma
                .reindex(shared.index(), ma.col_names())
                .hstack(&mb.reindex(shared.index(), mb.col_names()))?,
        };
        assays.insert(name.clone(), merged);
    }

    let (row_data, col_data) = match axis {
        Axis::Rows => (stacked, shared),
        Axis::Columns => (shared, stacked),
    };
    Ok(Merged {
        assays,
        row_data,
        col_data,
        dropped_assays,
    })
}

/// Union of the shared-axis metadata.
///
/// Labels are `a`'s followed by `b`'s extras; fields are `a`'s followed by
/// `b`'s extras. Each cell comes from `a` when `a` has it, else from `b`.
fn merge_shared(a: &MetaTable, b: &MetaTable) -> Result<MetaTable> {
    let in_a: HashSet<&str> = a.index().iter().map(String::as_str).collect();
    let mut index = a.index().to_vec();
    index.extend(b.index().iter().filter(|l| !in_a.contains(l.as_str())).cloned());

    let mut out = MetaTable::new(index)?;
    if let Some(name) = a.index_name().or(b.index_name()) {
        out = out.with_index_name(name);
    }

    let a_pos = positions_of(a.index());
    let b_pos = positions_of(b.index());
    let mut names: Vec<&str> = a.column_names().collect();
    names.extend(b.column_names().filter(|n| !a.contains_column(n)));

    for name in names {
        let values: Vec<Scalar> = out
            .index()
            .iter()
            .map(|label| {
                let from = |table: &MetaTable, pos: &std::collections::HashMap<&str, usize>| {
                    let i = *pos.get(label.as_str())?;
                    table.column(name).map(|c| c[i].clone())
                };
                from(a, &a_pos)
                    .or_else(|| from(b, &b_pos))
                    .unwrap_or(Scalar::Missing)
            })
            .collect();
        out.push_column(name, values)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumexp_core::ErrorKind;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    /// A container with one `counts` assay filled from `start` upward, a
    /// `chrom` row field and a `group` column field.
    fn se(rows: &[&str], cols: &[&str], start: f64) -> SummarizedExperiment {
        let data = (0..rows.len() * cols.len()).map(|x| start + x as f64).collect();
        let counts = AssayMatrix::from_row_major(data, names(rows), names(cols)).unwrap();
        let mut assays = IndexMap::new();
        assays.insert("counts".to_string(), counts);

        let mut row_data = MetaTable::new(names(rows)).unwrap().with_index_name("gene");
        row_data
            .push_column("chrom", rows.iter().map(|r| Scalar::from(format!("chr_{r}"))).collect())
            .unwrap();
        let mut col_data = MetaTable::new(names(cols)).unwrap().with_index_name("sample");
        col_data
            .push_column("group", cols.iter().map(|c| Scalar::from(format!("grp_{c}"))).collect())
            .unwrap();

        let mut metadata = IndexMap::new();
        metadata.insert("origin".to_string(), Scalar::from(rows.join("+")));
        SummarizedExperiment::new(assays, row_data, col_data, metadata).unwrap()
    }

    #[test]
    fn axis_from_integer() {
        assert_eq!(Axis::try_from(0i64).unwrap(), Axis::Rows);
        assert_eq!(Axis::try_from(1usize).unwrap(), Axis::Columns);
        let err = Axis::try_from(2i64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleBind);
        assert!(Axis::try_from(-1i64).is_err());
        assert_eq!(Axis::Columns.index(), 1);
        assert_eq!(Axis::Rows.other(), Axis::Columns);
    }

    #[test]
    fn scenario_row_bind_unions_columns() {
        let a = se(&["g1"], &["s1", "s2"], 1.0);
        let b = se(&["g2"], &["s1", "s2", "s3"], 10.0);
        assert!(check_bind(&a, &b, Axis::Rows).is_compatible());

        let (bound, outcome) = a.bind(&b, Axis::Rows).unwrap();
        assert!(outcome.is_bound());
        assert_eq!(bound.row_names(), &["g1", "g2"]);
        assert_eq!(bound.col_names(), &["s1", "s2", "s3"]);

        let counts = bound.assay("counts").unwrap();
        assert_eq!(counts.row(1), Some(&[10.0, 11.0, 12.0][..]));
        assert_eq!(counts.get(0, 0), Some(1.0));
        assert!(counts.get(0, 2).unwrap().is_nan());

        assert_eq!(bound.row_data().get("g2", "chrom"), Some(&Scalar::from("chr_g2")));
        assert_eq!(bound.col_data().get("s3", "group"), Some(&Scalar::from("grp_s3")));
        assert_eq!(bound.col_data().index_name(), Some("sample"));
        assert_eq!(bound.metadata(), a.metadata());
        for m in bound.assays().values() {
            assert_eq!(m.row_names(), bound.row_names());
            assert_eq!(m.col_names(), bound.col_names());
        }
        // The copy form leaves the receiver alone.
        assert_eq!(a.shape(), (1, 2));
    }

    #[test]
    fn column_bind_mirrors_row_bind() {
        let a = se(&["g1", "g2"], &["s1"], 1.0);
        let b = se(&["g1", "g2", "g3"], &["s2"], 20.0);
        let (bound, outcome) = a.bind(&b, Axis::Columns).unwrap();
        assert_eq!(outcome, BindOutcome::Bound { dropped_assays: vec![] });
        assert_eq!(bound.row_names(), &["g1", "g2", "g3"]);
        assert_eq!(bound.col_names(), &["s1", "s2"]);
        let counts = bound.assay("counts").unwrap();
        assert_eq!(counts.column(1), Some(vec![20.0, 21.0, 22.0]));
        assert!(counts.get(2, 0).unwrap().is_nan());
        assert_eq!(bound.row_data().get("g3", "chrom"), Some(&Scalar::from("chr_g3")));
        assert_eq!(bound.col_data().get("s2", "group"), Some(&Scalar::from("grp_s2")));
    }

    #[test]
    fn overlapping_rows_skip_the_bind() {
        let mut a = se(&["g1", "g2"], &["s1"], 1.0);
        let b = se(&["g2", "g3"], &["s1"], 5.0);
        let before = a.clone();

        let outcome = a.bind_in_place(&b, Axis::Rows).unwrap();
        assert_eq!(
            outcome,
            BindOutcome::Skipped(vec![Conflict::OverlappingLabels {
                axis: Axis::Rows,
                labels: names(&["g2"]),
            }])
        );
        assert!(!outcome.is_bound());
        assert_eq!(a, before);
    }

    #[test]
    fn every_failed_condition_is_reported() {
        let a = se(&["g1"], &["s1", "s9"], 1.0);
        let mut b = se(&["g1"], &["s1"], 1.0);
        b = SummarizedExperiment::new(
            b.assays().clone(),
            b.row_data().clone(),
            MetaTable::new(names(&["s1"])).unwrap(),
            IndexMap::new(),
        )
        .unwrap();

        match check_bind(&a, &b, Axis::Rows) {
            Compatibility::Incompatible(conflicts) => assert_eq!(
                conflicts,
                vec![
                    Conflict::MissingLabels {
                        axis: Axis::Columns,
                        labels: names(&["s9"]),
                    },
                    Conflict::MissingMetadataColumns {
                        axis: Axis::Columns,
                        columns: names(&["group"]),
                    },
                    Conflict::OverlappingLabels {
                        axis: Axis::Rows,
                        labels: names(&["g1"]),
                    },
                ]
            ),
            Compatibility::Compatible => panic!("expected conflicts"),
        }
    }

    #[test]
    fn receiver_only_assays_are_dropped() {
        let mut a = se(&["g1"], &["s1"], 1.0);
        a.set_assay("extra", a.assay("counts").unwrap().clone()).unwrap();
        let mut b = se(&["g2"], &["s1"], 2.0);
        b.set_assay("argument_only", b.assay("counts").unwrap().clone()).unwrap();

        let outcome = a.bind_in_place(&b, Axis::Rows).unwrap();
        assert_eq!(
            outcome,
            BindOutcome::Bound {
                dropped_assays: names(&["extra"]),
            }
        );
        assert_eq!(a.assay_names().collect::<Vec<_>>(), vec!["counts"]);
        assert_eq!(a.row_names(), &["g1", "g2"]);
    }

    #[test]
    fn stacked_metadata_unions_fields() {
        let a = se(&["g1"], &["s1"], 1.0);
        let mut b = se(&["g2"], &["s1"], 2.0);
        let mut row_data = b.row_data().clone();
        row_data.push_column("biotype", vec!["lncRNA".into()]).unwrap();
        b = SummarizedExperiment::new(b.assays().clone(), row_data, b.col_data().clone(), IndexMap::new())
            .unwrap();

        let (bound, _) = a.bind(&b, Axis::Rows).unwrap();
        assert_eq!(
            bound.row_data().column_names().collect::<Vec<_>>(),
            vec!["chrom", "biotype"]
        );
        assert_eq!(bound.row_data().get("g1", "biotype"), Some(&Scalar::Missing));
        assert_eq!(bound.row_data().get("g2", "biotype"), Some(&Scalar::from("lncRNA")));
    }

    #[test]
    fn shared_metadata_takes_argument_only_fields() {
        let a = se(&["g1"], &["s1"], 1.0);
        let mut b = se(&["g2"], &["s1", "s2"], 2.0);
        let mut col_data = b.col_data().clone();
        col_data.push_column("lane", vec![Scalar::Int(1), Scalar::Int(2)]).unwrap();
        b = SummarizedExperiment::new(b.assays().clone(), b.row_data().clone(), col_data, IndexMap::new())
            .unwrap();

        let (bound, _) = a.bind(&b, Axis::Rows).unwrap();
        assert_eq!(bound.col_data().get("s1", "group"), Some(&Scalar::from("grp_s1")));
        assert_eq!(bound.col_data().get("s1", "lane"), Some(&Scalar::Int(1)));
        assert_eq!(bound.col_data().get("s2", "lane"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn zero_assay_containers_bind_metadata() {
        let a = SummarizedExperiment::new(
            IndexMap::new(),
            MetaTable::new(names(&["g1"])).unwrap(),
            MetaTable::new(names(&["s1"])).unwrap(),
            IndexMap::new(),
        )
        .unwrap();
        let b = SummarizedExperiment::new(
            IndexMap::new(),
            MetaTable::new(names(&["g2"])).unwrap(),
            MetaTable::new(names(&["s1"])).unwrap(),
            IndexMap::new(),
        )
        .unwrap();
        let (bound, outcome) = a.bind(&b, Axis::Rows).unwrap();
        assert!(outcome.is_bound());
        assert_eq!(bound.shape(), (2, 1));
        assert_eq!(bound.n_assays(), 0);
    }
}
