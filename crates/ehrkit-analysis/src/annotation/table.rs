//! Flat table of concept mentions
//!
//! The engine's nested per-row output is flattened into one
//! [`AnnotatedEntity`] per mention, skipping `tokens` entries. Repeated
//! mentions of a concept with the same status in the same row are kept once.
//! The table is ordered by row id.
//!
//! [`StatusFilter`] picks mentions by their `Status` meta-annotation.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use super::{
    AnnotationError,
    engine::{AnnotatorOutput, EntityEntry, RowId, TOKENS_ENTITY},
};

/// Status value of a confirmed (not negated, not hypothetical) mention.
pub const AFFIRMED: &str = "Affirmed";

/// Status value of every other mention.
pub const OTHER: &str = "Other";

/// One concept mention in one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedEntity {
    pub row: RowId,
    pub pretty_name: String,
    pub cui: String,
    pub type_ids: Vec<String>,
    pub types: Vec<String>,
    pub status: Option<String>,
}

/// Flat, deduplicated table of concept mentions, ordered by row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationTable {
    entities: Vec<AnnotatedEntity>,
}

impl AnnotationTable {
    /// Builds the table from raw engine output.
    ///
    /// Entities are flattened in row order and entity-id order, repeated
    /// `(cui, row, status)` mentions are kept once, and the result is
    /// stable-sorted by row.
    #[must_use]
    pub fn from_annotator_output(output: &AnnotatorOutput) -> Self {
        let mut entities = flatten(output);
        let before = entities.len();
        dedupe(&mut entities);
        entities.sort_by_key(|e| e.row);
        tracing::debug!(
            mentions = before,
            kept = entities.len(),
            "flattened annotations"
        );
        Self { entities }
    }

    /// Creates a table from already flattened mentions, keeping their order.
    #[must_use]
    pub fn from_entities(entities: Vec<AnnotatedEntity>) -> Self {
        Self { entities }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotatedEntity> {
        self.entities.iter()
    }

    /// Mentions whose status passes `filter`.
    pub fn filtered(&self, filter: StatusFilter) -> impl Iterator<Item = &AnnotatedEntity> {
        self.entities
            .iter()
            .filter(move |e| filter.accepts(e.status.as_deref()))
    }

    /// Distinct pretty names, ascending.
    #[must_use]
    pub fn pretty_names(&self) -> BTreeSet<&str> {
        self.entities.iter().map(|e| e.pretty_name.as_str()).collect()
    }
}

fn flatten(output: &AnnotatorOutput) -> Vec<AnnotatedEntity> {
    let mut flat = vec![];
    for (&row, annotations) in output {
        let mut entries = annotations
            .entities
            .iter()
            .filter(|(id, _)| id.as_str() != TOKENS_ENTITY)
            .filter_map(|(id, entry)| match entry {
                EntityEntry::Entity(entity) => Some((id, entity)),
                EntityEntry::Other(_) => None,
            })
            .collect::<Vec<_>>();
        entries.sort_by(|(a, _), (b, _)| entity_id_cmp(a, b));

        flat.extend(entries.into_iter().map(|(_, entity)| AnnotatedEntity {
            row,
            pretty_name: entity.pretty_name.clone(),
            cui: entity.cui.clone(),
            type_ids: entity.type_ids.clone(),
            types: entity.types.clone(),
            status: entity.status().map(str::to_owned),
        }));
    }
    flat
}

// Engine entity ids are decimal counters; "10" comes after "9".
fn entity_id_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn dedupe(entities: &mut Vec<AnnotatedEntity>) {
    let mut seen = HashSet::new();
    entities.retain(|e| seen.insert((e.cui.clone(), e.row, e.status.clone())));
}

/// Which mentions to include, by affirmation status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    Affirmed,
    Other,
    Both,
}

impl StatusFilter {
    #[must_use]
    pub fn accepts(self, status: Option<&str>) -> bool {
        match self {
            Self::Affirmed => status == Some(AFFIRMED),
            Self::Other => status == Some(OTHER),
            Self::Both => true,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Affirmed => AFFIRMED,
            Self::Other => OTHER,
            Self::Both => "Both",
        };
        f.write_str(name)
    }
}

impl FromStr for StatusFilter {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            AFFIRMED => Ok(Self::Affirmed),
            OTHER => Ok(Self::Other),
            "Both" => Ok(Self::Both),
            _ => Err(AnnotationError::StatusNotSupported {
                status: s.to_owned(),
            }),
        }
    }
}
