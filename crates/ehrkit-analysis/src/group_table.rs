//! Column-per-group result tables
//!
//! Group comparison results are indexed by group first and by feature rank
//! second: every selected group owns one column, and row `i` of a column is
//! the `i`-th feature reported for that group. Columns are addressed by group
//! name so tables produced with different group orders can be merged safely.
//!
//! ```text
//!            icu        ward       home
//! row 0   diagnosis  diagnosis  diagnosis
//! row 1   sex        sex        sex
//! ```
//!
//! After sorting, each column may hold its rows in a different order.
//!
//! # Serialization
//!
//! Tables serialize as an ordered list of `{ "group": ..., "values": [...] }`
//! objects. Floating-point cells that are not finite are written as `null`
//! and read back as NaN.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::results::ResultStoreError;

/// A value type that can be stored in a [`GroupTable`].
pub trait Cell: Clone {
    fn serialize_cells<S>(cells: &[Self], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer;

    fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Self>, D::Error>
    where
        D: Deserializer<'de>;
}

impl Cell for String {
    fn serialize_cells<S>(cells: &[Self], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        cells.serialize(serializer)
    }

    fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::deserialize(deserializer)
    }
}

impl Cell for f64 {
    fn serialize_cells<S>(cells: &[Self], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(cells.iter().map(|v| v.is_finite().then_some(*v)))
    }

    fn deserialize_cells<'de, D>(deserializer: D) -> Result<Vec<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let cells = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// Rows of a single group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct GroupColumn<T: Cell> {
    pub group: String,
    #[serde(
        serialize_with = "T::serialize_cells",
        deserialize_with = "T::deserialize_cells"
    )]
    pub values: Vec<T>,
}

/// Result values arranged as one column per group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "", transparent)]
pub struct GroupTable<T: Cell> {
    columns: Vec<GroupColumn<T>>,
}

impl<T: Cell> GroupTable<T> {
    /// Builds a table from `[row][group]` ordered rows.
    ///
    /// Every row must have exactly one value per group in `groups`.
    pub fn from_rows(groups: &[String], rows: Vec<Vec<T>>) -> Result<Self, ResultStoreError> {
        let mut columns = groups
            .iter()
            .map(|group| GroupColumn {
                group: group.clone(),
                values: Vec::with_capacity(rows.len()),
            })
            .collect::<Vec<_>>();
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != groups.len() {
                return Err(ResultStoreError::RowWidthMismatch {
                    row: index,
                    expected: groups.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }
        Ok(Self { columns })
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.group.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &GroupColumn<T>> {
        self.columns.iter()
    }

    #[must_use]
    pub fn column(&self, group: &str) -> Option<&[T]> {
        self.columns
            .iter()
            .find(|c| c.group == group)
            .map(|c| c.values.as_slice())
    }

    /// Number of rows in the longest column.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.values.len())
            .max()
            .unwrap_or(0)
    }

    /// Returns a copy with columns selected and ordered by `groups`.
    ///
    /// Columns not listed in `groups` are dropped.
    pub fn reordered(&self, groups: &[String]) -> Result<Self, ResultStoreError> {
        let columns = groups
            .iter()
            .map(|group| {
                self.columns
                    .iter()
                    .find(|c| &c.group == group)
                    .cloned()
                    .ok_or_else(|| ResultStoreError::MissingGroupColumn {
                        group: group.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { columns })
    }

    /// Appends the rows of `other` below this table's rows, matching columns
    /// by group name.
    ///
    /// Both tables must have the same groups in the same order; use
    /// [`reordered`](Self::reordered) first.
    pub fn append(&mut self, other: Self) {
        debug_assert!(self.groups().eq(other.groups()), "group order must match");
        for (column, extra) in self.columns.iter_mut().zip(other.columns) {
            column.values.extend(extra.values);
        }
    }

    /// Maps every cell, keeping the table layout.
    #[must_use]
    pub fn map_columns<U, F>(&self, mut f: F) -> GroupTable<U>
    where
        U: Cell,
        F: FnMut(&[T]) -> Vec<U>,
    {
        GroupTable {
            columns: self
                .columns
                .iter()
                .map(|c| GroupColumn {
                    group: c.group.clone(),
                    values: f(&c.values),
                })
                .collect(),
        }
    }

    /// Reorders the rows of one group column so that new row `i` is old row
    /// `permutation[i]`. Tables without the group are left unchanged.
    pub(crate) fn permute_column(&mut self, group: &str, permutation: &[usize]) {
        if let Some(column) = self.columns.iter_mut().find(|c| c.group == group) {
            debug_assert_eq!(column.values.len(), permutation.len());
            column.values = permutation
                .iter()
                .map(|&i| column.values[i].clone())
                .collect();
        }
    }

    pub(crate) fn column_len(&self, group: &str) -> Option<usize> {
        self.column(group).map(<[T]>::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|&n| n.to_owned()).collect()
    }

    #[test]
    fn test_from_rows_transposes() {
        let table =
            GroupTable::from_rows(&groups(&["a", "b"]), vec![vec![1.0, 2.0], vec![3.0, 4.0]])
                .unwrap();
        assert_eq!(table.column("a"), Some(&[1.0, 3.0][..]));
        assert_eq!(table.column("b"), Some(&[2.0, 4.0][..]));
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.groups().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_from_rows_rejects_wrong_width() {
        let err = GroupTable::from_rows(&groups(&["a", "b"]), vec![vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            ResultStoreError::RowWidthMismatch {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_reordered_and_append() {
        let mut table =
            GroupTable::from_rows(&groups(&["a", "b"]), vec![vec![1.0, 2.0]]).unwrap();
        table = table.reordered(&groups(&["b", "a"])).unwrap();
        let extra = GroupTable::from_rows(&groups(&["b", "a"]), vec![vec![20.0, 10.0]]).unwrap();
        table.append(extra);
        assert_eq!(table.column("a"), Some(&[1.0, 10.0][..]));
        assert_eq!(table.column("b"), Some(&[2.0, 20.0][..]));
    }

    #[test]
    fn test_reordered_missing_group() {
        let table = GroupTable::from_rows(&groups(&["a"]), vec![vec![1.0]]).unwrap();
        let err = table.reordered(&groups(&["a", "c"])).unwrap_err();
        assert!(matches!(err, ResultStoreError::MissingGroupColumn { ref group } if group == "c"));
    }

    #[test]
    fn test_permute_column_only_touches_one_group() {
        let mut table = GroupTable::from_rows(
            &groups(&["a", "b"]),
            vec![
                vec!["x".to_owned(), "x".to_owned()],
                vec!["y".to_owned(), "y".to_owned()],
            ],
        )
        .unwrap();
        table.permute_column("a", &[1, 0]);
        assert_eq!(table.column("a").unwrap(), ["y", "x"]);
        assert_eq!(table.column("b").unwrap(), ["x", "y"]);
    }

    #[test]
    fn test_nan_serializes_as_null() {
        let table =
            GroupTable::from_rows(&groups(&["a"]), vec![vec![f64::NAN], vec![0.5]]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"group":"a","values":[null,0.5]}]"#);

        let back: GroupTable<f64> = serde_json::from_str(&json).unwrap();
        let column = back.column("a").unwrap();
        assert!(column[0].is_nan());
        assert_eq!(column[1], 0.5);
    }
}
