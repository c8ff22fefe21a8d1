//! Concept annotation of clinical free text
//!
//! Free-text observation columns (admission notes, discharge letters) are
//! sent to an external medical concept-annotation engine. Its nested output
//! is flattened into an [`AnnotationTable`] with one record per mention and
//! stored in the dataset's side annotations, where it feeds two consumers:
//!
//! - [`overview`]: per-concept counts and percentages of annotated rows
//! - [`tag_rows`]: `"yes"`/`"no"` observation columns marking rows that
//!   mention a concept, for coloring and grouping
//!
//! # Pipeline
//!
//! ```text
//! obs[text_column] ──drop missing──→ (row, text) pairs
//!     ↓ ConceptAnnotator::annotate_batch
//! row → entity id → entity record
//!     ↓ flatten (skip "tokens"), dedupe (cui, row, status), sort by row
//! AnnotationTable  →  dataset.uns.annotations[key]
//! ```

use std::fmt;

use crate::dataset::{Dataset, DatasetError};

pub use self::{
    engine::{
        AnnotatorOutput, BatchConfig, ConceptAnnotator, EntityEntry, MetaAnnotation,
        PrecomputedAnnotations, RawEntity, RowAnnotations, RowId,
    },
    overview::{ConceptOverview, overview},
    table::{AnnotatedEntity, AnnotationTable, StatusFilter},
    tagging::tag_rows,
};

pub mod engine;
mod overview;
mod table;
mod tagging;

/// Default key for annotation tables in the side store.
pub const DEFAULT_KEY: &str = "concept_annotations";

/// A requested concept name that was not found, with the closest known name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntity {
    pub name: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.name)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AnnotationError {
    #[display("status '{status}' is not available; use Affirmed, Other or Both")]
    StatusNotSupported { status: String },
    #[display("did not find {} among the extracted entities", join_missing(missing))]
    EntityNotFound { missing: Vec<MissingEntity> },
    #[display("{columns} target columns given for {names} concept names")]
    LengthMismatch { names: usize, columns: usize },
    #[display("no annotations stored under key '{key}'; annotate the text first")]
    AnnotationsNotFound { key: String },
    #[display("column '{column}' not found in observation metadata")]
    ColumnNotFound { column: String },
    #[display("annotation engine failed: {message}")]
    Annotator { message: String },
    #[display("{_0}")]
    Dataset(DatasetError),
}

impl From<DatasetError> for AnnotationError {
    fn from(err: DatasetError) -> Self {
        Self::Dataset(err)
    }
}

fn join_missing(missing: &[MissingEntity]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Annotates the non-missing texts of `text_column` and stores the flattened
/// table under `key`, replacing any previous table.
///
/// Rows are identified by their position in the dataset.
///
/// # Errors
///
/// - [`AnnotationError::ColumnNotFound`] if `text_column` does not exist
/// - [`AnnotationError::Annotator`] if the engine fails; nothing is stored
pub fn annotate_text<A: ConceptAnnotator>(
    dataset: &mut Dataset,
    annotator: &A,
    text_column: &str,
    key: &str,
    config: &BatchConfig,
) -> Result<(), AnnotationError> {
    let texts = dataset
        .obs_column(text_column)
        .ok_or_else(|| AnnotationError::ColumnNotFound {
            column: text_column.to_owned(),
        })?
        .iter()
        .enumerate()
        .filter_map(|(row, text)| Some((row, text.clone()?)))
        .collect::<Vec<_>>();

    tracing::info!(
        text_column,
        rows = texts.len(),
        n_proc = config.n_proc,
        batch_size_chars = config.batch_size_chars,
        "annotating text"
    );
    let output = annotator
        .annotate_batch(&texts, config)
        .map_err(|err| AnnotationError::Annotator {
            message: err.to_string(),
        })?;

    let table = AnnotationTable::from_annotator_output(&output);
    tracing::info!(key, mentions = table.len(), "stored annotations");
    dataset.uns.annotations.insert(key.to_owned(), table);
    Ok(())
}
