//! Dense labeled assay matrix.
//!
//! [`AssayMatrix`] stores a row-major dense matrix of `f64` values
//! (n_rows × n_cols) together with its row (feature) and column (sample)
//! labels. `NaN` marks a cell with no observation.

use sumexp_core::{Dimnames, Result, SumExpError};

use crate::table::positions_of;

/// A dense, row-major, labeled matrix (features × samples).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "AssayMatrixParts"))]
pub struct AssayMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

impl AssayMatrix {
    /// Create a matrix from row-major 2D data.
    ///
    /// Each inner `Vec` is one row with `col_names.len()` values.
    pub fn new(data: Vec<Vec<f64>>, row_names: Vec<String>, col_names: Vec<String>) -> Result<Self> {
        let n_rows = data.len();
        let n_cols = col_names.len();

        if row_names.len() != n_rows {
            return Err(SumExpError::DimensionMismatch {
                expected: n_rows,
                found: row_names.len(),
            });
        }

        let mut flat = Vec::with_capacity(n_rows * n_cols);
        for row in &data {
            if row.len() != n_cols {
                return Err(SumExpError::DimensionMismatch {
                    expected: n_cols,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }

        Ok(Self {
            data: flat,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// Create a matrix from flat row-major data.
    pub fn from_row_major(data: Vec<f64>, row_names: Vec<String>, col_names: Vec<String>) -> Result<Self> {
        let (n_rows, n_cols) = (row_names.len(), col_names.len());
        if data.len() != n_rows * n_cols {
            return Err(SumExpError::DimensionMismatch {
                expected: n_rows * n_cols,
                found: data.len(),
            });
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
            row_names,
            col_names,
        })
    }

    /// A matrix with every cell set to `value`.
    pub fn filled(value: f64, row_names: Vec<String>, col_names: Vec<String>) -> Self {
        let (n_rows, n_cols) = (row_names.len(), col_names.len());
        Self {
            data: vec![value; n_rows * n_cols],
            n_rows,
            n_cols,
            row_names,
            col_names,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Get a single value by row and column position.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.n_rows && col < self.n_cols {
            Some(self.data[row * self.n_cols + col])
        } else {
            None
        }
    }

    /// Get a single value by row and column label.
    pub fn get_by_label(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_names.iter().position(|l| l == row)?;
        let c = self.col_names.iter().position(|l| l == col)?;
        self.get(r, c)
    }

    /// Set a single value.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.n_rows {
            return Err(SumExpError::IndexOutOfBounds {
                index: row as isize,
                len: self.n_rows,
            });
        }
        if col >= self.n_cols {
            return Err(SumExpError::IndexOutOfBounds {
                index: col as isize,
                len: self.n_cols,
            });
        }
        self.data[row * self.n_cols + col] = value;
        Ok(())
    }

    /// One row's values.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.n_rows {
            let start = row * self.n_cols;
            Some(&self.data[start..start + self.n_cols])
        } else {
            None
        }
    }

    /// One column's values (copied, since data is row-major).
    pub fn column(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.n_cols {
            return None;
        }
        Some((0..self.n_rows).map(|r| self.data[r * self.n_cols + col]).collect())
    }

    /// The cells at the given row and column positions, in the given order.
    ///
    /// Positions may repeat.
    pub fn take(&self, rows: &[usize], cols: &[usize]) -> Result<AssayMatrix> {
        for &r in rows {
            if r >= self.n_rows {
                return Err(SumExpError::IndexOutOfBounds {
                    index: r as isize,
                    len: self.n_rows,
                });
            }
        }
        for &c in cols {
            if c >= self.n_cols {
                return Err(SumExpError::IndexOutOfBounds {
                    index: c as isize,
                    len: self.n_cols,
                });
            }
        }

        let mut data = Vec::with_capacity(rows.len() * cols.len());
        for &r in rows {
            let start = r * self.n_cols;
            data.extend(cols.iter().map(|&c| self.data[start + c]));
        }

        Ok(AssayMatrix {
            data,
            n_rows: rows.len(),
            n_cols: cols.len(),
            row_names: rows.iter().map(|&r| self.row_names[r].clone()).collect(),
            col_names: cols.iter().map(|&c| self.col_names[c].clone()).collect(),
        })
    }

    /// Rearrange to the given label sequences.
    ///
    /// Labels absent from this matrix produce `NaN` cells.
    pub fn reindex(&self, row_names: &[String], col_names: &[String]) -> AssayMatrix {
        let row_pos = positions_of(&self.row_names);
        let col_pos = positions_of(&self.col_names);
        let cols: Vec<Option<usize>> = col_names.iter().map(|c| col_pos.get(c.as_str()).copied()).collect();

        let mut data = Vec::with_capacity(row_names.len() * col_names.len());
        for r in row_names {
            match row_pos.get(r.as_str()) {
                Some(&ri) => {
                    let start = ri * self.n_cols;
                    data.extend(cols.iter().map(|c| c.map_or(f64::NAN, |ci| self.data[start + ci])));
                }
                None => data.extend(std::iter::repeat(f64::NAN).take(cols.len())),
            }
        }

        AssayMatrix {
            data,
            n_rows: row_names.len(),
            n_cols: col_names.len(),
            row_names: row_names.to_vec(),
            col_names: col_names.to_vec(),
        }
    }

    /// Replace the row labels.
    pub fn relabel_rows(&mut self, row_names: Vec<String>) -> Result<()> {
        if row_names.len() != self.n_rows {
            return Err(SumExpError::DimensionMismatch {
                expected: self.n_rows,
                found: row_names.len(),
            });
        }
        self.row_names = row_names;
        Ok(())
    }

    /// Replace the column labels.
    pub fn relabel_cols(&mut self, col_names: Vec<String>) -> Result<()> {
        if col_names.len() != self.n_cols {
            return Err(SumExpError::DimensionMismatch {
                expected: self.n_cols,
                found: col_names.len(),
            });
        }
        self.col_names = col_names;
        Ok(())
    }

    /// Stack `other` below this matrix. Column labels must match in order.
    pub fn vstack(&self, other: &AssayMatrix) -> Result<AssayMatrix> {
        if self.col_names != other.col_names {
            return Err(SumExpError::AssayShapeMismatch(
                "vstack requires identical column labels".into(),
            ));
        }
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        let mut row_names = self.row_names.clone();
        row_names.extend(other.row_names.iter().cloned());
        Ok(AssayMatrix {
            data,
            n_rows: self.n_rows + other.n_rows,
            n_cols: self.n_cols,
            row_names,
            col_names: self.col_names.clone(),
        })
    }

    /// Place `other` to the right of this matrix. Row labels must match in order.
    pub fn hstack(&self, other: &AssayMatrix) -> Result<AssayMatrix> {
        if self.row_names != other.row_names {
            return Err(SumExpError::AssayShapeMismatch(
                "hstack requires identical row labels".into(),
            ));
        }
        let n_cols = self.n_cols + other.n_cols;
        let mut data = Vec::with_capacity(self.n_rows * n_cols);
        for r in 0..self.n_rows {
            data.extend_from_slice(&self.data[r * self.n_cols..(r + 1) * self.n_cols]);
            data.extend_from_slice(&other.data[r * other.n_cols..(r + 1) * other.n_cols]);
        }
        let mut col_names = self.col_names.clone();
        col_names.extend(other.col_names.iter().cloned());
        Ok(AssayMatrix {
            data,
            n_rows: self.n_rows,
            n_cols,
            row_names: self.row_names.clone(),
            col_names,
        })
    }

    /// The underlying flat data (row-major, n_rows × n_cols).
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The values as nested rows, for collaborators that take a plain matrix.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.n_cols == 0 {
            return vec![Vec::new(); self.n_rows];
        }
        self.data.chunks(self.n_cols).map(<[f64]>::to_vec).collect()
    }

    /// Same labels, new values. The values must keep the shape.
    ///
    /// This is how a transformed plain matrix (log, scaling, ...) comes back
    /// into a container.
    pub fn with_values(&self, data: Vec<f64>) -> Result<AssayMatrix> {
        if data.len() != self.data.len() {
            return Err(SumExpError::DimensionMismatch {
                expected: self.data.len(),
                found: data.len(),
            });
        }
        Ok(AssayMatrix {
            data,
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            row_names: self.row_names.clone(),
            col_names: self.col_names.clone(),
        })
    }
}

impl Dimnames for AssayMatrix {
    fn row_names(&self) -> &[String] {
        &self.row_names
    }

    fn col_names(&self) -> &[String] {
        &self.col_names
    }
}

/// Deserialized fields of an [`AssayMatrix`], checked by `from_row_major`.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct AssayMatrixParts {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
    row_names: Vec<String>,
    col_names: Vec<String>,
}

#[cfg(feature = "serde")]
impl TryFrom<AssayMatrixParts> for AssayMatrix {
    type Error = SumExpError;

    fn try_from(parts: AssayMatrixParts) -> Result<Self> {
        let m = AssayMatrix::from_row_major(parts.data, parts.row_names, parts.col_names)?;
        if (m.n_rows, m.n_cols) != (parts.n_rows, parts.n_cols) {
            return Err(SumExpError::DimensionMismatch {
                expected: parts.n_rows * parts.n_cols,
                found: m.n_rows * m.n_cols,
            });
        }
        Ok(m)
    }
}
