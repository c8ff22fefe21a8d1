use std::collections::{BTreeMap, BTreeSet};

/// A two-way table of observed frequencies.
///
/// Rows and columns are the distinct values of two categorical variables,
/// each sorted in ascending order. Only values that were actually observed
/// appear, so every row and every column has a non-zero margin.
///
/// # Examples
///
/// ```
/// use ehrkit_stats::contingency::ContingencyTable;
///
/// let table = ContingencyTable::from_observations([("a", false), ("a", true), ("b", true)]);
/// assert_eq!(table.shape(), (2, 2));
/// assert_eq!(table.count(0, 0), 1.0);
/// assert_eq!(table.count(1, 0), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    n_rows: usize,
    n_cols: usize,
    /// Row-major observed counts.
    counts: Vec<f64>,
}

impl ContingencyTable {
    /// Creates a table from row-major counts.
    ///
    /// # Panics
    ///
    /// Panics if `counts.len() != n_rows * n_cols`.
    #[must_use]
    pub fn new(n_rows: usize, n_cols: usize, counts: Vec<f64>) -> Self {
        assert_eq!(
            counts.len(),
            n_rows * n_cols,
            "counts must have n_rows * n_cols entries"
        );
        Self {
            n_rows,
            n_cols,
            counts,
        }
    }

    /// Cross-tabulates `(row value, column value)` observation pairs.
    ///
    /// Equivalent to a frequency cross-tabulation: rows are the distinct row
    /// values in ascending order, columns the distinct column values in
    /// ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_observations<R, C, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (R, C)>,
        R: Ord,
        C: Ord + Clone,
    {
        let mut cells = BTreeMap::<R, BTreeMap<C, usize>>::new();
        let mut columns = BTreeSet::new();
        for (row, col) in observations {
            columns.insert(col.clone());
            *cells.entry(row).or_default().entry(col).or_default() += 1;
        }

        let columns = columns.into_iter().collect::<Vec<_>>();
        let counts = cells
            .values()
            .flat_map(|row| {
                columns
                    .iter()
                    .map(|col| row.get(col).copied().unwrap_or(0) as f64)
            })
            .collect();

        Self::new(cells.len(), columns.len(), counts)
    }

    /// Returns `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Returns `true` if the table holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn count(&self, row: usize, col: usize) -> f64 {
        self.counts[row * self.n_cols + col]
    }

    /// Row-major observed counts.
    #[must_use]
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Degrees of freedom of the independence test, `(rows - 1) * (cols - 1)`.
    #[must_use]
    pub fn dof(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.n_rows - 1) * (self.n_cols - 1)
    }

    /// Expected frequencies under independence, computed from the margins.
    ///
    /// Returned in the same row-major layout as [`counts`](Self::counts).
    #[must_use]
    pub fn expected(&self) -> Vec<f64> {
        let total = self.total();
        let row_sums = (0..self.n_rows)
            .map(|r| (0..self.n_cols).map(|c| self.count(r, c)).sum::<f64>())
            .collect::<Vec<_>>();
        let col_sums = (0..self.n_cols)
            .map(|c| (0..self.n_rows).map(|r| self.count(r, c)).sum::<f64>())
            .collect::<Vec<_>>();

        row_sums
            .iter()
            .flat_map(|row_sum| col_sums.iter().map(move |col_sum| row_sum * col_sum / total))
            .collect()
    }
}
