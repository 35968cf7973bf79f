//! Conversion between a long-format table and the assay + metadata form.
//!
//! [`decompose`] infers a role for every column of a [`LongTable`] given the
//! row-key and column-key columns:
//!
//! | Role | Test | Destination |
//! |------|------|-------------|
//! | constant | one distinct value in the whole table | experiment metadata |
//! | row attribute | one value per row key | row metadata |
//! | column attribute | one value per column key | column metadata |
//! | assay | anything else | pivoted into an [`AssayMatrix`] |
//!
//! Constants are taken out before the other tests run, and a column that
//! passes both attribute tests is a row attribute. Key columns are never
//! classified.
//!
//! [`compose`] is the approximate inverse: it flattens every assay into
//! (row, column, value) records, joins the assays on (row, column) and
//! attaches the row and column metadata. Experiment metadata is not
//! restored.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use sumexp_core::{Dimnames, Result, SumExpError};
use tracing::{debug, trace};

use crate::matrix::AssayMatrix;
use crate::table::{constant_value, LongTable, MetaTable, Scalar, ScalarKey};

/// Row key column name used by [`compose`] when the row metadata has no index name.
pub const DEFAULT_ROW_KEY: &str = "row";
/// Column key column name used by [`compose`] when the column metadata has no index name.
pub const DEFAULT_COL_KEY: &str = "column";

/// Role assigned to one long-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnRole {
    RowKey,
    ColumnKey,
    /// Single-valued; promoted to experiment metadata.
    Constant,
    RowAttribute,
    ColumnAttribute,
    Assay,
}

/// The normalized parts produced by [`decompose`].
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub row_data: MetaTable,
    pub col_data: MetaTable,
    pub assays: IndexMap<String, AssayMatrix>,
    pub metadata: IndexMap<String, Scalar>,
    roles: Vec<(String, ColumnRole)>,
}

impl Decomposition {
    /// The role given to every input column, in input order.
    pub fn roles(&self) -> &[(String, ColumnRole)] {
        &self.roles
    }

    /// The role of one input column.
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.roles.iter().find(|(c, _)| c == column).map(|(_, r)| *r)
    }
}

/// Interned labels of one key column.
struct KeyAxis {
    /// Distinct labels in order of first appearance.
    labels: Vec<String>,
    /// Label position for every record.
    codes: Vec<usize>,
    /// First record observing each label.
    first_record: Vec<usize>,
}

impl KeyAxis {
    fn intern(name: &str, values: &[Scalar]) -> Result<Self> {
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut labels = Vec::new();
        let mut first_record = Vec::new();
        let mut codes = Vec::with_capacity(values.len());

        for (i, value) in values.iter().enumerate() {
            let label = value.to_label().ok_or_else(|| {
                SumExpError::MalformedInput(format!("key column '{name}' is missing a value at record {i}"))
            })?;
            let code = match lookup.get(&label) {
                Some(&code) => code,
                None => {
                    let code = labels.len();
                    lookup.insert(label.clone(), code);
                    labels.push(label);
                    first_record.push(i);
                    code
                }
            };
            codes.push(code);
        }

        Ok(Self {
            labels,
            codes,
            first_record,
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether `values` holds exactly one value per key.
    fn determines(&self, values: &[Scalar]) -> bool {
        let mut seen: Vec<Option<ScalarKey>> = vec![None; self.len()];
        for (&code, value) in self.codes.iter().zip(values) {
            let key = value.key();
            match &seen[code] {
                Some(existing) if *existing != key => return false,
                Some(_) => {}
                None => seen[code] = Some(key),
            }
        }
        true
    }

    /// A metadata table holding, per key, the value of each column at the
    /// key's first record.
    fn meta_table(&self, name: &str, table: &LongTable, columns: &[&str]) -> Result<MetaTable> {
        let mut meta = MetaTable::new(self.labels.clone())?.with_index_name(name);
        for &column in columns {
            let values = table
                .column(column)
                .ok_or_else(|| SumExpError::Internal(format!("column '{column}' vanished during decomposition")))?;
            meta.push_column(column, self.first_record.iter().map(|&i| values[i].clone()).collect())?;
        }
        Ok(meta)
    }
}

/// Split a long table into row metadata, column metadata, assays and
/// experiment metadata.
///
/// # Errors
///
/// [`SumExpError::MalformedInput`] if a key column is absent, the two keys
/// are the same column, a key value is missing, a (row key, column key) pair
/// occurs twice, or an assay column holds text.
pub fn decompose(table: &LongTable, row_key: &str, col_key: &str) -> Result<Decomposition> {
    if row_key == col_key {
        return Err(SumExpError::MalformedInput(format!(
            "row key and column key are both '{row_key}'"
        )));
    }
    let row_values = table
        .column(row_key)
        .ok_or_else(|| SumExpError::MalformedInput(format!("row key column '{row_key}' not found")))?;
    let col_values = table
        .column(col_key)
        .ok_or_else(|| SumExpError::MalformedInput(format!("column key column '{col_key}' not found")))?;

    let rows = KeyAxis::intern(row_key, row_values)?;
    let cols = KeyAxis::intern(col_key, col_values)?;

    let mut pairs = HashSet::with_capacity(table.n_rows());
    for (i, (&r, &c)) in rows.codes.iter().zip(&cols.codes).enumerate() {
        if !pairs.insert((r, c)) {
            return Err(SumExpError::MalformedInput(format!(
                "duplicate observation for ({}, {}) at record {i}",
                rows.labels[r], cols.labels[c]
            )));
        }
    }

    let mut roles = Vec::with_capacity(table.n_cols());
    let mut metadata = IndexMap::new();
    let mut row_attrs = Vec::new();
    let mut col_attrs = Vec::new();
    let mut assay_columns = Vec::new();

    for (name, values) in table.columns() {
        let role = if name == row_key {
            ColumnRole::RowKey
        } else if name == col_key {
            ColumnRole::ColumnKey
        } else if let Some(value) = constant_value(values) {
            metadata.insert(name.to_string(), value.clone());
            ColumnRole::Constant
        } else if rows.determines(values) {
            row_attrs.push(name);
            ColumnRole::RowAttribute
        } else if cols.determines(values) {
            col_attrs.push(name);
            ColumnRole::ColumnAttribute
        } else {
            assay_columns.push(name);
            ColumnRole::Assay
        };
        trace!(column = name, ?role, "classified long-table column");
        roles.push((name.to_string(), role));
    }

    let row_data = rows.meta_table(row_key, table, &row_attrs)?;
    let col_data = cols.meta_table(col_key, table, &col_attrs)?;

    let mut assays = IndexMap::with_capacity(assay_columns.len());
    for name in assay_columns {
        let values = table
            .column(name)
            .ok_or_else(|| SumExpError::Internal(format!("column '{name}' vanished during decomposition")))?;
        let mut data = vec![f64::NAN; rows.len() * cols.len()];
        for (i, value) in values.iter().enumerate() {
            let v = value.as_f64().ok_or_else(|| {
                SumExpError::MalformedInput(format!(
                    "assay column '{name}' holds non-numeric value '{value}' at record {i}"
                ))
            })?;
            data[rows.codes[i] * cols.len() + cols.codes[i]] = v;
        }
        let matrix = AssayMatrix::from_row_major(data, rows.labels.clone(), cols.labels.clone())?;
        assays.insert(name.to_string(), matrix);
    }

    debug!(
        row_key,
        col_key,
        n_rows = rows.len(),
        n_cols = cols.len(),
        n_assays = assays.len(),
        n_row_attrs = row_data.n_columns(),
        n_col_attrs = col_data.n_columns(),
        n_constants = metadata.len(),
        "decomposed long table"
    );

    Ok(Decomposition {
        row_data,
        col_data,
        assays,
        metadata,
        roles,
    })
}

/// Flatten assays and metadata back into one long table.
///
/// One record is emitted per (row, column) cell where at least one assay
/// holds a non-`NaN` value, in row-major order over the metadata indexes.
/// Columns are the row key, the column key, one column per assay, then the
/// row metadata columns and the column metadata columns.
///
/// # Errors
///
/// [`SumExpError::MalformedInput`] if two output columns share a name, and
/// [`SumExpError::Internal`] if an assay is not aligned with the metadata.
pub fn compose(
    assays: &IndexMap<String, AssayMatrix>,
    row_data: &MetaTable,
    col_data: &MetaTable,
) -> Result<LongTable> {
    for (name, matrix) in assays {
        if matrix.row_names() != row_data.index() || matrix.col_names() != col_data.index() {
            return Err(SumExpError::Internal(format!(
                "assay '{name}' is not aligned with the metadata tables"
            )));
        }
    }

    let n_cols = col_data.len();
    let cells: Vec<(usize, usize)> = (0..row_data.len())
        .flat_map(|r| (0..n_cols).map(move |c| (r, c)))
        .filter(|&(r, c)| {
            assays.values().any(|m| !m.as_slice()[r * n_cols + c].is_nan())
        })
        .collect();

    let mut out = LongTable::new();
    out.push_column(
        row_data.index_name().unwrap_or(DEFAULT_ROW_KEY),
        cells.iter().map(|&(r, _)| Scalar::Text(row_data.index()[r].clone())).collect(),
    )?;
    out.push_column(
        col_data.index_name().unwrap_or(DEFAULT_COL_KEY),
        cells.iter().map(|&(_, c)| Scalar::Text(col_data.index()[c].clone())).collect(),
    )?;
    for (name, matrix) in assays {
        let data = matrix.as_slice();
        out.push_column(
            name.clone(),
            cells.iter().map(|&(r, c)| Scalar::Float(data[r * n_cols + c])).collect(),
        )?;
    }
    for (name, values) in row_data.columns() {
        out.push_column(name, cells.iter().map(|&(r, _)| values[r].clone()).collect())?;
    }
    for (name, values) in col_data.columns() {
        out.push_column(name, cells.iter().map(|&(_, c)| values[c].clone()).collect())?;
    }

    debug!(n_records = out.n_rows(), n_columns = out.n_cols(), "composed long table");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(xs: &[&str]) -> Vec<Scalar> {
        xs.iter().map(|&s| Scalar::from(s)).collect()
    }

    fn floats(xs: &[f64]) -> Vec<Scalar> {
        xs.iter().map(|&v| Scalar::Float(v)).collect()
    }

    /// Two features × three samples, with one attribute of each kind.
    fn sample_long() -> LongTable {
        LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g1", "g2", "g2", "g2"])),
            ("sample", text(&["s1", "s2", "s3", "s1", "s2", "s3"])),
            ("chrom", text(&["1", "1", "1", "7", "7", "7"])),
            ("group", text(&["ctl", "trt", "trt", "ctl", "trt", "trt"])),
            ("expr", floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
            ("batch", text(&["B1", "B1", "B1", "B1", "B1", "B1"])),
        ])
        .unwrap()
    }

    #[test]
    fn roles_are_inferred() {
        let d = decompose(&sample_long(), "feature", "sample").unwrap();
        assert_eq!(
            d.roles().iter().map(|(_, r)| *r).collect::<Vec<_>>(),
            vec![
                ColumnRole::RowKey,
                ColumnRole::ColumnKey,
                ColumnRole::RowAttribute,
                ColumnRole::ColumnAttribute,
                ColumnRole::Assay,
                ColumnRole::Constant,
            ]
        );
        assert_eq!(d.role_of("group"), Some(ColumnRole::ColumnAttribute));
        assert_eq!(d.role_of("missing"), None);
    }

    #[test]
    fn pivot_places_values() {
        let d = decompose(&sample_long(), "feature", "sample").unwrap();
        let expr = &d.assays["expr"];
        assert_eq!(expr.row_names(), &["g1", "g2"]);
        assert_eq!(expr.col_names(), &["s1", "s2", "s3"]);
        assert_eq!(expr.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(d.row_data.get("g2", "chrom"), Some(&Scalar::from("7")));
        assert_eq!(d.col_data.get("s1", "group"), Some(&Scalar::from("ctl")));
        assert_eq!(d.row_data.index_name(), Some("feature"));
        assert_eq!(d.col_data.index_name(), Some("sample"));
    }

    #[test]
    fn constants_are_promoted_to_metadata() {
        let d = decompose(&sample_long(), "feature", "sample").unwrap();
        assert_eq!(d.metadata.get("batch"), Some(&Scalar::from("B1")));
        assert!(!d.row_data.contains_column("batch"));
        assert!(!d.col_data.contains_column("batch"));
    }

    #[test]
    fn constant_with_a_gap_is_promoted() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g2", "g2"])),
            ("sample", text(&["s1", "s2", "s1", "s2"])),
            ("batch", vec!["B1".into(), "B1".into(), "B1".into(), Scalar::Missing]),
            ("expr", floats(&[0.5, 1.5, 2.5, 3.5])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        assert_eq!(d.role_of("batch"), Some(ColumnRole::Constant));
        assert_eq!(d.metadata.get("batch"), Some(&Scalar::from("B1")));
        assert_eq!(d.assays.keys().collect::<Vec<_>>(), vec!["expr"]);
    }

    #[test]
    fn scenario_constant_batch_column() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g2", "g2"])),
            ("sample", text(&["s1", "s2", "s1", "s2"])),
            ("batch", text(&["B1", "B1", "B1", "B1"])),
            ("expr", floats(&[0.5, 1.5, 2.5, 3.5])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        assert_eq!(d.assays.keys().collect::<Vec<_>>(), vec!["expr"]);
        assert_eq!(d.assays["expr"].shape(), (2, 2));
        assert_eq!(d.row_data.n_columns(), 0);
        assert_eq!(d.col_data.n_columns(), 0);
        assert_eq!(d.metadata.get("batch"), Some(&Scalar::from("B1")));
    }

    #[test]
    fn keys_are_never_constant() {
        // One sample only: the column key is single-valued but stays a key.
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g2"])),
            ("sample", text(&["s1", "s1"])),
            ("expr", floats(&[1.0, 2.0])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        assert_eq!(d.role_of("sample"), Some(ColumnRole::ColumnKey));
        assert_eq!(d.col_data.index(), &["s1"]);
        // With one sample, expr is determined by the feature alone.
        assert_eq!(d.role_of("expr"), Some(ColumnRole::RowAttribute));
    }

    #[test]
    fn numeric_keys_are_coerced_to_labels() {
        let t = LongTable::from_columns([
            ("feature", vec![Scalar::Int(10), Scalar::Int(10), Scalar::Int(20), Scalar::Int(20)]),
            ("sample", text(&["a", "b", "a", "b"])),
            ("expr", floats(&[1.0, 2.0, 3.0, 4.0])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        assert_eq!(d.row_data.index(), &["10", "20"]);
    }

    #[test]
    fn missing_cells_become_nan() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g2"])),
            ("sample", text(&["s1", "s2", "s2"])),
            ("expr", floats(&[1.0, 2.0, 3.0])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        let m = &d.assays["expr"];
        assert!(m.get_by_label("g2", "s1").unwrap().is_nan());
        assert_eq!(m.get_by_label("g2", "s2"), Some(3.0));
    }

    #[test]
    fn missing_key_column_is_malformed() {
        let err = decompose(&sample_long(), "gene", "sample").unwrap_err();
        assert!(matches!(err, SumExpError::MalformedInput(_)));
        let err = decompose(&sample_long(), "feature", "feature").unwrap_err();
        assert!(matches!(err, SumExpError::MalformedInput(_)));
    }

    #[test]
    fn duplicate_pairs_are_malformed() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1"])),
            ("sample", text(&["s1", "s1"])),
            ("expr", floats(&[1.0, 2.0])),
        ])
        .unwrap();
        assert!(matches!(
            decompose(&t, "feature", "sample"),
            Err(SumExpError::MalformedInput(_))
        ));
    }

    #[test]
    fn missing_key_value_is_malformed() {
        let t = LongTable::from_columns([
            ("feature", vec![Scalar::from("g1"), Scalar::Missing]),
            ("sample", text(&["s1", "s2"])),
            ("expr", floats(&[1.0, 2.0])),
        ])
        .unwrap();
        assert!(decompose(&t, "feature", "sample").is_err());
    }

    #[test]
    fn text_assay_values_are_malformed() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g2", "g2"])),
            ("sample", text(&["s1", "s2", "s1", "s2"])),
            ("call", text(&["A", "B", "B", "A"])),
        ])
        .unwrap();
        assert!(matches!(
            decompose(&t, "feature", "sample"),
            Err(SumExpError::MalformedInput(_))
        ));
    }

    #[test]
    fn compose_restores_non_key_columns() {
        let d = decompose(&sample_long(), "feature", "sample").unwrap();
        let long = compose(&d.assays, &d.row_data, &d.col_data).unwrap();
        assert_eq!(
            long.column_names().collect::<Vec<_>>(),
            vec!["feature", "sample", "expr", "chrom", "group"]
        );
        assert_eq!(long.n_rows(), 6);
        assert_eq!(long.column("expr").unwrap(), floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).as_slice());
        assert_eq!(long.column("group").unwrap()[3], Scalar::from("ctl"));
    }

    #[test]
    fn compose_skips_cells_without_observations() {
        let t = LongTable::from_columns([
            ("feature", text(&["g1", "g1", "g2"])),
            ("sample", text(&["s1", "s2", "s2"])),
            ("expr", floats(&[1.0, 2.0, 3.0])),
        ])
        .unwrap();
        let d = decompose(&t, "feature", "sample").unwrap();
        let long = compose(&d.assays, &d.row_data, &d.col_data).unwrap();
        assert_eq!(long.n_rows(), 3);
    }

    #[test]
    fn compose_uses_default_key_names() {
        let m = AssayMatrix::new(vec![vec![1.0]], vec!["g1".into()], vec!["s1".into()]).unwrap();
        let mut assays = IndexMap::new();
        assays.insert("counts".to_string(), m);
        let rows = MetaTable::new(vec!["g1".into()]).unwrap();
        let cols = MetaTable::new(vec!["s1".into()]).unwrap();
        let long = compose(&assays, &rows, &cols).unwrap();
        assert_eq!(
            long.column_names().collect::<Vec<_>>(),
            vec![DEFAULT_ROW_KEY, DEFAULT_COL_KEY, "counts"]
        );
    }

    #[test]
    fn compose_rejects_name_collisions() {
        let m = AssayMatrix::new(vec![vec![1.0]], vec!["g1".into()], vec!["s1".into()]).unwrap();
        let mut assays = IndexMap::new();
        assays.insert("chrom".to_string(), m);
        let mut rows = MetaTable::new(vec!["g1".into()]).unwrap();
        rows.push_column("chrom", vec!["1".into()]).unwrap();
        let cols = MetaTable::new(vec!["s1".into()]).unwrap();
        assert!(matches!(
            compose(&assays, &rows, &cols),
            Err(SumExpError::MalformedInput(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// A dense features × samples long table with one row attribute, one
    /// column attribute and one assay; no column is constant.
    fn long_table() -> impl Strategy<Value = LongTable> {
        (2usize..6, 2usize..6).prop_flat_map(|(n_f, n_s)| {
            proptest::collection::vec(-1000i64..1000, n_f * n_s).prop_map(move |raw| {
                let mut feature = Vec::new();
                let mut sample = Vec::new();
                let mut rank = Vec::new();
                let mut group = Vec::new();
                let mut value = Vec::new();
                for f in 0..n_f {
                    for s in 0..n_s {
                        feature.push(Scalar::Text(format!("g{f}")));
                        sample.push(Scalar::Text(format!("s{s}")));
                        rank.push(Scalar::Int(f as i64));
                        group.push(Scalar::Text(format!("grp{s}")));
                        // Distinct per cell so the column depends on both keys.
                        value.push(Scalar::Float((f * n_s + s) as f64 * 10_000.0 + raw[f * n_s + s] as f64));
                    }
                }
                LongTable::from_columns([
                    ("feature", feature),
                    ("sample", sample),
                    ("rank", rank),
                    ("group", group),
                    ("value", value),
                ])
                .unwrap()
            })
        })
    }

    fn records(t: &LongTable) -> BTreeMap<(String, String), Vec<String>> {
        let names: Vec<&str> = ["rank", "group", "value"].to_vec();
        let feature = t.column("feature").unwrap();
        let sample = t.column("sample").unwrap();
        (0..t.n_rows())
            .map(|i| {
                let key = (feature[i].to_string(), sample[i].to_string());
                let rest = names
                    .iter()
                    .map(|n| {
                        let v = &t.column(n).unwrap()[i];
                        v.as_f64().map_or_else(|| v.to_string(), |x| x.to_string())
                    })
                    .collect();
                (key, rest)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn compose_inverts_decompose(t in long_table()) {
            let d = decompose(&t, "feature", "sample").unwrap();
            prop_assert!(d.metadata.is_empty());
            let back = compose(&d.assays, &d.row_data, &d.col_data).unwrap();
            prop_assert_eq!(records(&back), records(&t));
        }
    }
}
