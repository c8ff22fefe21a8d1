//! Per-concept mention counts over an [`AnnotationTable`]

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{
    engine::RowId,
    table::{AnnotatedEntity, AnnotationTable, StatusFilter},
};

/// Summary of one concept across the annotated rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptOverview {
    pub cui: String,
    /// Pretty name of the first mention.
    pub pretty_name: String,
    /// First type id of the first mention, if any.
    pub type_id: Option<String>,
    /// First type of the first mention, if any.
    pub type_name: Option<String>,
    /// Number of distinct rows mentioning the concept.
    pub n_patient_visit: usize,
    /// `n_patient_visit` relative to all distinct rows of the filtered table.
    pub n_patient_visit_percent: f64,
}

/// Per-concept statistics over the mentions passing `filter`, ordered by
/// cui.
///
/// # Examples
///
/// ```
/// use ehrkit_analysis::annotation::{AnnotatedEntity, AnnotationTable, StatusFilter, overview};
///
/// let mention = |row, cui: &str| AnnotatedEntity {
///     row,
///     pretty_name: cui.to_lowercase(),
///     cui: cui.to_owned(),
///     type_ids: vec![],
///     types: vec![],
///     status: Some("Affirmed".to_owned()),
/// };
/// let table = AnnotationTable::from_entities(vec![
///     mention(0, "C1"),
///     mention(1, "C1"),
///     mention(1, "C2"),
/// ]);
///
/// let overview = overview(&table, StatusFilter::Affirmed);
/// assert_eq!(overview[0].n_patient_visit, 2);
/// assert_eq!(overview[0].n_patient_visit_percent, 100.0);
/// assert_eq!(overview[1].n_patient_visit_percent, 50.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn overview(table: &AnnotationTable, filter: StatusFilter) -> Vec<ConceptOverview> {
    let mut by_cui = BTreeMap::<&str, (&AnnotatedEntity, BTreeSet<RowId>)>::new();
    let mut all_rows = BTreeSet::new();
    for entity in table.filtered(filter) {
        all_rows.insert(entity.row);
        by_cui
            .entry(entity.cui.as_str())
            .or_insert_with(|| (entity, BTreeSet::new()))
            .1
            .insert(entity.row);
    }

    let total = all_rows.len() as f64;
    by_cui
        .into_iter()
        .map(|(cui, (first, rows))| ConceptOverview {
            cui: cui.to_owned(),
            pretty_name: first.pretty_name.clone(),
            type_id: first.type_ids.first().cloned(),
            type_name: first.types.first().cloned(),
            n_patient_visit: rows.len(),
            n_patient_visit_percent: rows.len() as f64 / total * 100.0,
        })
        .collect()
}
