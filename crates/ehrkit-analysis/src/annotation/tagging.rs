//! Yes/no observation columns derived from concept mentions

use std::collections::BTreeSet;

use crate::{
    dataset::{Dataset, ObsColumn},
    fuzzy::{DEFAULT_SCORE_CUTOFF, best_match},
};

use super::{
    AnnotationError, MissingEntity,
    engine::RowId,
    table::{AnnotationTable, StatusFilter},
};

/// Value written to rows mentioning the concept.
pub const TAG_YES: &str = "yes";

/// Value written to every other row.
pub const TAG_NO: &str = "no";

/// Adds one `"yes"`/`"no"` observation column per concept, marking the rows
/// with an affirmed mention of that concept.
///
/// Concepts are matched by exact pretty name. Columns are named after the
/// concepts unless `target_columns` gives one name per concept. Existing
/// columns of the same name are replaced.
///
/// # Errors
///
/// - [`AnnotationError::AnnotationsNotFound`] if no annotation table is
///   stored under `key`
/// - [`AnnotationError::LengthMismatch`] if `target_columns` does not have
///   one entry per concept
/// - [`AnnotationError::EntityNotFound`] if a concept name does not occur in
///   the table, with a close match suggested where one exists
pub fn tag_rows<S: AsRef<str>>(
    dataset: &mut Dataset,
    key: &str,
    concept_names: &[S],
    target_columns: Option<&[S]>,
) -> Result<(), AnnotationError> {
    let table = dataset
        .uns
        .annotations
        .get(key)
        .ok_or_else(|| AnnotationError::AnnotationsNotFound {
            key: key.to_owned(),
        })?;

    let target_columns = target_columns.unwrap_or(concept_names);
    if target_columns.len() != concept_names.len() {
        return Err(AnnotationError::LengthMismatch {
            names: concept_names.len(),
            columns: target_columns.len(),
        });
    }

    check_known_names(table, concept_names)?;

    let columns = concept_names
        .iter()
        .map(|name| tag_column(table, name.as_ref(), dataset.n_obs()))
        .collect::<Vec<_>>();
    for (column, values) in target_columns.iter().zip(columns) {
        dataset.set_obs_column(column.as_ref(), values)?;
    }

    tracing::info!(key, concepts = concept_names.len(), "tagged rows");
    Ok(())
}

fn check_known_names<S: AsRef<str>>(
    table: &AnnotationTable,
    concept_names: &[S],
) -> Result<(), AnnotationError> {
    let known = table.pretty_names();
    let missing = concept_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !known.contains(name))
        .map(|name| MissingEntity {
            name: name.to_owned(),
            suggestion: best_match(name, known.iter().copied(), DEFAULT_SCORE_CUTOFF)
                .map(|(choice, _)| choice.to_owned()),
        })
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnnotationError::EntityNotFound { missing })
    }
}

fn tag_column(table: &AnnotationTable, concept: &str, n_obs: usize) -> ObsColumn {
    let rows = table
        .filtered(StatusFilter::Affirmed)
        .filter(|e| e.pretty_name == concept)
        .map(|e| e.row)
        .collect::<BTreeSet<RowId>>();
    (0..n_obs)
        .map(|row| {
            let tag = if rows.contains(&row) { TAG_YES } else { TAG_NO };
            Some(tag.to_owned())
        })
        .collect()
}
