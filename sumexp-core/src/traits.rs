//! Trait definitions shared by every labeled two-dimensional type.

/// A two-dimensional value with a label on every row and column.
pub trait Dimnames {
    /// Row labels, in order.
    fn row_names(&self) -> &[String];

    /// Column labels, in order.
    fn col_names(&self) -> &[String];

    /// (n_rows, n_cols).
    fn shape(&self) -> (usize, usize) {
        (self.row_names().len(), self.col_names().len())
    }
}
