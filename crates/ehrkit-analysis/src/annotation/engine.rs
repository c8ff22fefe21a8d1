//! Concept-annotation engine interface
//!
//! The engine receives `(row, text)` pairs and returns, per row, a map of
//! entity id to entity record. The record layout follows the engine's JSON
//! output:
//!
//! ```json
//! {
//!   "0": {
//!     "entities": {
//!       "0": {
//!         "pretty_name": "Diabetes",
//!         "cui": "C0011849",
//!         "type_ids": ["T047"],
//!         "types": ["Disease or Syndrome"],
//!         "meta_anns": { "Status": { "value": "Affirmed", "confidence": 0.97 } }
//!       }
//!     },
//!     "tokens": []
//!   }
//! }
//! ```
//!
//! Unknown attributes are ignored. Entries under the pseudo-entity id
//! [`TOKENS_ENTITY`] are not concepts and are skipped when flattening.

use std::{collections::BTreeMap, convert::Infallible, error::Error};

use serde::{Deserialize, Serialize};

/// Position of an observation in the dataset.
pub type RowId = usize;

/// Entity id the engine uses for token listings.
pub const TOKENS_ENTITY: &str = "tokens";

/// Name of the meta-annotation carrying the affirmation status.
pub const STATUS_META_ANNOTATION: &str = "Status";

/// Engine output: annotations per annotated row.
pub type AnnotatorOutput = BTreeMap<RowId, RowAnnotations>;

/// All entities found in one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowAnnotations {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityEntry>,
}

/// One value of the per-row entity map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityEntry {
    Entity(RawEntity),
    /// Anything that does not look like a concept, such as token listings.
    Other(serde_json::Value),
}

/// A concept recognized by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub pretty_name: String,
    pub cui: String,
    #[serde(default)]
    pub type_ids: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub meta_anns: BTreeMap<String, MetaAnnotation>,
}

impl RawEntity {
    /// The affirmation status, if the engine produced one.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.meta_anns
            .get(STATUS_META_ANNOTATION)
            .map(|meta| meta.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAnnotation {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Pass-through parallelism settings for the engine's batched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of worker processes.
    pub n_proc: usize,
    /// Approximate number of characters per batch.
    pub batch_size_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            n_proc: 2,
            batch_size_chars: 500_000,
        }
    }
}

/// A medical concept-annotation engine.
pub trait ConceptAnnotator {
    type Error: Error + Send + Sync + 'static;

    /// Annotates a batch of texts. Rows without findings may be omitted from
    /// the output.
    fn annotate_batch(
        &self,
        texts: &[(RowId, String)],
        config: &BatchConfig,
    ) -> Result<AnnotatorOutput, Self::Error>;
}

/// Annotations produced offline and loaded from the engine's JSON output.
///
/// Returns the stored annotations for the requested rows and ignores the
/// text itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecomputedAnnotations {
    rows: AnnotatorOutput,
}

impl PrecomputedAnnotations {
    #[must_use]
    pub fn new(rows: AnnotatorOutput) -> Self {
        Self { rows }
    }
}

impl ConceptAnnotator for PrecomputedAnnotations {
    type Error = Infallible;

    fn annotate_batch(
        &self,
        texts: &[(RowId, String)],
        _config: &BatchConfig,
    ) -> Result<AnnotatorOutput, Self::Error> {
        Ok(texts
            .iter()
            .filter_map(|(row, _)| Some((*row, self.rows.get(row)?.clone())))
            .collect())
    }
}
