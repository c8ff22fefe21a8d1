//! Accumulated group-comparison results
//!
//! A [`ResultStore`] keeps the output of feature-ranking runs keyed by an
//! analysis name. Each entry ([`RankedFeatures`]) holds parallel
//! [`GroupTable`]s for feature names, test statistics, p-values, adjusted
//! p-values, fold changes and percentages, plus a `params` record describing
//! how the results were produced.
//!
//! # Lifecycle
//!
//! ```text
//! save(key, fields, group order)   ← once per test run, rows appended
//!     ↓
//! adjust_pvalues(key, method)      ← pvals → pvals_adj, per group
//!     ↓
//! sort_by_adjusted_pvalue(key)     ← every table reordered per group
//! ```
//!
//! Rows from repeated [`ResultStore::save`] calls are concatenated in call
//! order and never deduplicated. Columns are matched by group name, so the
//! group order may differ between calls.
//!
//! The store is an ordinary value: it is owned by the caller (usually through
//! [`Dataset::uns`](crate::dataset::Dataset::uns)) and mutated through
//! `&mut`, never through shared global state.

use std::collections::BTreeMap;

use ehrkit_stats::{correction::CorrectionMethod, power_divergence::PowerDivergence};
use serde::{Deserialize, Serialize};

use crate::{
    group_table::{Cell, GroupTable},
    groups::Reference,
};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ResultStoreError {
    #[display("row {row} has {actual} values, expected one per group ({expected})")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("stored results have no column for group '{group}'")]
    MissingGroupColumn { group: String },
    #[display("field '{field}' has {actual} rows for group '{group}', expected {expected}")]
    RowCountMismatch {
        field: &'static str,
        group: String,
        expected: usize,
        actual: usize,
    },
}

/// How a ranking entry was produced. Metadata only; never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankParams {
    pub groupby: String,
    pub reference: Reference,
    pub method: PowerDivergence,
    pub corr_method: CorrectionMethod,
}

/// One ranking entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<RankParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<GroupTable<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<GroupTable<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvals: Option<GroupTable<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvals_adj: Option<GroupTable<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logfoldchanges: Option<GroupTable<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pts: Option<GroupTable<f64>>,
}

/// Rows produced by one test run, each `[feature][group]` ordered.
///
/// An empty field is not saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankFields {
    pub names: Vec<Vec<String>>,
    pub scores: Vec<Vec<f64>>,
    pub pvals: Vec<Vec<f64>>,
    pub pvals_adj: Vec<Vec<f64>>,
    pub logfoldchanges: Vec<Vec<f64>>,
    pub pts: Vec<Vec<f64>>,
}

impl RankedFeatures {
    fn value_tables(&self) -> [(&'static str, Option<&GroupTable<f64>>); 5] {
        [
            ("scores", self.scores.as_ref()),
            ("pvals", self.pvals.as_ref()),
            ("pvals_adj", self.pvals_adj.as_ref()),
            ("logfoldchanges", self.logfoldchanges.as_ref()),
            ("pts", self.pts.as_ref()),
        ]
    }

    fn value_tables_mut(&mut self) -> impl Iterator<Item = &mut GroupTable<f64>> {
        [
            self.scores.as_mut(),
            self.pvals.as_mut(),
            self.pvals_adj.as_mut(),
            self.logfoldchanges.as_mut(),
            self.pts.as_mut(),
        ]
        .into_iter()
        .flatten()
    }

    fn check_column_len(&self, group: &str, expected: usize) -> Result<(), ResultStoreError> {
        let names = ("names", self.names.as_ref().and_then(|t| t.column_len(group)));
        let values = self
            .value_tables()
            .map(|(field, table)| (field, table.and_then(|t| t.column_len(group))));
        for (field, len) in std::iter::once(names).chain(values) {
            if let Some(actual) = len.filter(|&actual| actual != expected) {
                return Err(ResultStoreError::RowCountMismatch {
                    field,
                    group: group.to_owned(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Named collection of ranking entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore {
    entries: BTreeMap<String, RankedFeatures>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RankedFeatures> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, entry: RankedFeatures) -> Option<RankedFeatures> {
        self.entries.insert(key.to_owned(), entry)
    }

    pub fn remove(&mut self, key: &str) -> Option<RankedFeatures> {
        self.entries.remove(key)
    }

    pub fn set_params(&mut self, key: &str, params: RankParams) {
        self.entries.entry(key.to_owned()).or_default().params = Some(params);
    }

    /// Merges the rows of one test run into the entry under `key`.
    ///
    /// For each non-empty field: if the entry has no table yet, the rows are
    /// stored as a new table; otherwise the existing table is reordered to
    /// `groups_order` and the new rows are appended below it.
    ///
    /// Every field is validated before anything is written, so on error the
    /// store is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use ehrkit_analysis::results::{RankFields, ResultStore};
    ///
    /// let mut store = ResultStore::new();
    /// let fields = RankFields {
    ///     pvals: vec![vec![0.01, 0.2]],
    ///     ..RankFields::default()
    /// };
    /// store.save("rank", fields, &["icu".into(), "ward".into()]).unwrap();
    ///
    /// let fields = RankFields {
    ///     pvals: vec![vec![0.5, 0.04]],
    ///     ..RankFields::default()
    /// };
    /// store.save("rank", fields, &["ward".into(), "icu".into()]).unwrap();
    ///
    /// let pvals = store.get("rank").unwrap().pvals.as_ref().unwrap();
    /// assert_eq!(pvals.column("icu"), Some(&[0.01, 0.04][..]));
    /// assert_eq!(pvals.column("ward"), Some(&[0.2, 0.5][..]));
    /// ```
    pub fn save(
        &mut self,
        key: &str,
        fields: RankFields,
        groups_order: &[String],
    ) -> Result<(), ResultStoreError> {
        let existing = self.entries.get(key);
        let names = merge_field(existing.and_then(|e| e.names.as_ref()), fields.names, groups_order)?;
        let scores = merge_field(existing.and_then(|e| e.scores.as_ref()), fields.scores, groups_order)?;
        let pvals = merge_field(existing.and_then(|e| e.pvals.as_ref()), fields.pvals, groups_order)?;
        let pvals_adj = merge_field(
            existing.and_then(|e| e.pvals_adj.as_ref()),
            fields.pvals_adj,
            groups_order,
        )?;
        let logfoldchanges = merge_field(
            existing.and_then(|e| e.logfoldchanges.as_ref()),
            fields.logfoldchanges,
            groups_order,
        )?;
        let pts = merge_field(existing.and_then(|e| e.pts.as_ref()), fields.pts, groups_order)?;

        let entry = self.entries.entry(key.to_owned()).or_default();
        replace_if_some(&mut entry.names, names);
        replace_if_some(&mut entry.scores, scores);
        replace_if_some(&mut entry.pvals, pvals);
        replace_if_some(&mut entry.pvals_adj, pvals_adj);
        replace_if_some(&mut entry.logfoldchanges, logfoldchanges);
        replace_if_some(&mut entry.pts, pts);

        tracing::debug!(key, groups = groups_order.len(), "saved ranking results");
        Ok(())
    }

    /// Recomputes `pvals_adj` from the accumulated `pvals` of `key`,
    /// replacing any previous adjusted values.
    ///
    /// Does nothing if the entry has no p-values.
    pub fn adjust_pvalues(&mut self, key: &str, method: CorrectionMethod) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        if let Some(pvals) = &entry.pvals {
            entry.pvals_adj = Some(adjust_pvalues(pvals, method));
        }
    }

    /// Sorts every table of `key` by ascending adjusted p-value, group by
    /// group.
    ///
    /// For each group column of `pvals_adj`, the ascending order of that
    /// column (stable, NaN last) is applied to the same group column of
    /// every table. Groups are sorted independently, so features may end up
    /// in different orders per group. `params` is never touched.
    ///
    /// Does nothing if `key` or its adjusted p-values are absent.
    pub fn sort_by_adjusted_pvalue(&mut self, key: &str) -> Result<(), ResultStoreError> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Ok(());
        };
        let Some(pvals_adj) = &entry.pvals_adj else {
            return Ok(());
        };

        let permutations = pvals_adj
            .columns()
            .map(|column| (column.group.clone(), argsort(&column.values)))
            .collect::<Vec<_>>();
        for (group, permutation) in &permutations {
            entry.check_column_len(group, permutation.len())?;
        }

        for (group, permutation) in &permutations {
            if let Some(names) = entry.names.as_mut() {
                names.permute_column(group, permutation);
            }
            for table in entry.value_tables_mut() {
                table.permute_column(group, permutation);
            }
        }
        Ok(())
    }
}

/// Applies a multiple-testing correction to each group column separately.
///
/// Each column is one family of feature-level p-values; correction never
/// crosses group boundaries. The result has the same layout as `pvals`.
#[must_use]
pub fn adjust_pvalues(pvals: &GroupTable<f64>, method: CorrectionMethod) -> GroupTable<f64> {
    pvals.map_columns(|column| method.adjust(column))
}

fn merge_field<T: Cell>(
    existing: Option<&GroupTable<T>>,
    rows: Vec<Vec<T>>,
    groups_order: &[String],
) -> Result<Option<GroupTable<T>>, ResultStoreError> {
    if rows.is_empty() {
        return Ok(None);
    }
    let new = GroupTable::from_rows(groups_order, rows)?;
    let Some(existing) = existing else {
        return Ok(Some(new));
    };
    let mut merged = existing.reordered(groups_order)?;
    merged.append(new);
    Ok(Some(merged))
}

fn replace_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn argsort(values: &[f64]) -> Vec<usize> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| nan_last_cmp(values[a], values[b]));
    order
}

fn nan_last_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|&n| n.to_owned()).collect()
    }

    fn names(rows: &[&str], width: usize) -> Vec<Vec<String>> {
        rows.iter().map(|&n| vec![n.to_owned(); width]).collect()
    }

    fn params() -> RankParams {
        RankParams {
            groupby: "unit".into(),
            reference: Reference::Rest,
            method: PowerDivergence::GTest,
            corr_method: CorrectionMethod::BenjaminiHochberg,
        }
    }

    #[test]
    fn test_save_then_merge_with_swapped_order() {
        let mut store = ResultStore::new();
        store
            .save(
                "k",
                RankFields {
                    names: names(&["f1", "f2"], 2),
                    scores: vec![vec![1.0, 2.0], vec![3.0, 4.0]],
                    ..RankFields::default()
                },
                &groups(&["A", "B"]),
            )
            .unwrap();
        store
            .save(
                "k",
                RankFields {
                    names: names(&["f3"], 2),
                    scores: vec![vec![20.0, 10.0]],
                    ..RankFields::default()
                },
                &groups(&["B", "A"]),
            )
            .unwrap();

        let entry = store.get("k").unwrap();
        let scores = entry.scores.as_ref().unwrap();
        assert_eq!(scores.column("A"), Some(&[1.0, 3.0, 10.0][..]));
        assert_eq!(scores.column("B"), Some(&[2.0, 4.0, 20.0][..]));
        assert_eq!(scores.groups().collect::<Vec<_>>(), ["B", "A"]);
        assert_eq!(
            entry.names.as_ref().unwrap().column("A").unwrap(),
            ["f1", "f2", "f3"]
        );
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let mut store = ResultStore::new();
        store
            .save(
                "k",
                RankFields {
                    pvals: vec![vec![0.1]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap();
        let entry = store.get("k").unwrap();
        assert!(entry.pvals.is_some());
        assert!(entry.scores.is_none());
        assert!(entry.pts.is_none());
    }

    #[test]
    fn test_failed_save_leaves_store_untouched() {
        let mut store = ResultStore::new();
        store
            .save(
                "k",
                RankFields {
                    scores: vec![vec![1.0]],
                    pvals: vec![vec![0.1]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap();
        let before = store.clone();

        // scores merge fine, pvals row is too narrow
        let err = store
            .save(
                "k",
                RankFields {
                    scores: vec![vec![2.0]],
                    pvals: vec![vec![]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap_err();
        assert!(matches!(err, ResultStoreError::RowWidthMismatch { .. }));
        assert_eq!(store, before);

        // group unknown to the stored tables
        let err = store
            .save(
                "k",
                RankFields {
                    scores: vec![vec![2.0]],
                    ..RankFields::default()
                },
                &groups(&["C"]),
            )
            .unwrap_err();
        assert!(matches!(err, ResultStoreError::MissingGroupColumn { .. }));
        assert_eq!(store, before);
    }

    #[test]
    fn test_adjust_pvalues_is_per_group() {
        let pvals = GroupTable::from_rows(
            &groups(&["A", "B"]),
            vec![vec![0.01, 0.5], vec![0.02, 0.5], vec![0.03, 0.001]],
        )
        .unwrap();
        let adjusted = adjust_pvalues(&pvals, CorrectionMethod::Bonferroni);
        for group in ["A", "B"] {
            let raw = pvals.column(group).unwrap();
            let adj = adjusted.column(group).unwrap();
            for (r, a) in raw.iter().zip(adj) {
                assert!(a >= r);
                assert!((a - (r * 3.0).min(1.0)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_sort_orders_each_group_independently() {
        let mut store = ResultStore::new();
        store.set_params("k", params());
        store
            .save(
                "k",
                RankFields {
                    names: names(&["f1", "f2", "f3"], 2),
                    scores: vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]],
                    pvals: vec![vec![0.5, 0.01], vec![0.01, 0.5], vec![0.2, 0.2]],
                    ..RankFields::default()
                },
                &groups(&["A", "B"]),
            )
            .unwrap();
        store.adjust_pvalues("k", CorrectionMethod::BenjaminiHochberg);
        store.sort_by_adjusted_pvalue("k").unwrap();

        let entry = store.get("k").unwrap();
        let names = entry.names.as_ref().unwrap();
        assert_eq!(names.column("A").unwrap(), ["f2", "f3", "f1"]);
        assert_eq!(names.column("B").unwrap(), ["f1", "f3", "f2"]);
        assert_eq!(
            entry.scores.as_ref().unwrap().column("A"),
            Some(&[2.0, 3.0, 1.0][..])
        );
        let pvals_adj = entry.pvals_adj.as_ref().unwrap();
        for column in pvals_adj.columns() {
            assert!(column.values.is_sorted_by(|a, b| a <= b));
        }
        assert_eq!(entry.params, Some(params()));
    }

    #[test]
    fn test_sort_without_key_or_adjusted_is_noop() {
        let mut store = ResultStore::new();
        store.sort_by_adjusted_pvalue("missing").unwrap();

        store
            .save(
                "k",
                RankFields {
                    pvals: vec![vec![0.5], vec![0.1]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap();
        let before = store.clone();
        store.sort_by_adjusted_pvalue("k").unwrap();
        assert_eq!(store, before);
    }

    #[test]
    fn test_sort_rejects_ragged_tables() {
        let mut store = ResultStore::new();
        store
            .save(
                "k",
                RankFields {
                    pvals: vec![vec![0.5], vec![0.1]],
                    pts: vec![vec![1.0]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap();
        store.adjust_pvalues("k", CorrectionMethod::Bonferroni);
        let before = store.clone();
        let err = store.sort_by_adjusted_pvalue("k").unwrap_err();
        assert!(matches!(
            err,
            ResultStoreError::RowCountMismatch { field: "pts", .. }
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn test_argsort_puts_nan_last() {
        assert_eq!(argsort(&[0.3, f64::NAN, 0.1, 0.2]), vec![2, 3, 0, 1]);
        assert_eq!(argsort(&[0.1, 0.1, 0.0]), vec![2, 0, 1]);
    }

    #[test]
    fn test_store_json_round_trip() {
        let mut store = ResultStore::new();
        store.set_params("k", params());
        store
            .save(
                "k",
                RankFields {
                    names: names(&["f1"], 1),
                    pvals: vec![vec![0.25]],
                    ..RankFields::default()
                },
                &groups(&["A"]),
            )
            .unwrap();
        let json = serde_json::to_string(&store).unwrap();
        let back: ResultStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
        assert!(json.contains(r#""method":"g-test""#));
        assert!(json.contains(r#""corr_method":"benjamini-hochberg""#));
    }
}
