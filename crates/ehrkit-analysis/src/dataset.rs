//! Annotated data matrix for clinical datasets
//!
//! A [`Dataset`] bundles three views of the same set of observations
//! (patients, visits, admissions):
//!
//! ```text
//! Dataset
//! ├─ obs_names: one identifier per observation
//! ├─ obs: column-oriented observation metadata (groupings, free text, tags)
//! ├─ features: named feature columns, numeric or categorical
//! └─ uns: side-annotation store
//!     ├─ rank_results: ResultStore (group comparison results by key)
//!     └─ annotations: concept annotation tables by key
//! ```
//!
//! Categorical features created by the encoder carry the [`ENCODED_PREFIX`]
//! in their name, so `ehrcat_service_unit` and `service_unit` refer to the
//! same underlying variable.
//!
//! # Serialization
//!
//! ```json
//! {
//!   "obs_names": ["p1", "p2"],
//!   "obs": { "service_unit": ["icu", null] },
//!   "features": [
//!     { "name": "age", "values": { "numeric": [71.0, null] } },
//!     { "name": "ehrcat_diagnosis", "values": { "categorical": ["sepsis", "copd"] } }
//!   ]
//! }
//! ```
//!
//! Deserialized datasets should be checked with [`Dataset::validate`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{annotation::AnnotationTable, results::ResultStore};

/// Name prefix marking categorical features produced by the encoder.
pub const ENCODED_PREFIX: &str = "ehrcat_";

/// One observation-metadata column. `None` marks a missing value.
pub type ObsColumn = Vec<Option<String>>;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("column '{column}' has {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[display("duplicate feature name '{name}'")]
    DuplicateFeature { name: String },
}

/// Values of a single feature across all observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl FeatureValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categorical(_))
    }
}

/// A named column of the feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub values: FeatureValues,
}

impl Feature {
    #[must_use]
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: FeatureValues::Numeric(values),
        }
    }

    #[must_use]
    pub fn categorical<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: FeatureValues::Categorical(
                values.into_iter().map(|v| v.map(Into::into)).collect(),
            ),
        }
    }

    /// Returns `true` if this feature is the same variable as `column`,
    /// ignoring the [`ENCODED_PREFIX`] on either side.
    #[must_use]
    pub fn refers_to(&self, column: &str) -> bool {
        strip_encoded_prefix(&self.name) == strip_encoded_prefix(column)
    }
}

/// Free-form side annotations attached to a dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideAnnotations {
    /// Group-comparison results keyed by analysis name.
    #[serde(default)]
    pub rank_results: ResultStore,
    /// Flattened concept annotation tables keyed by analysis name.
    #[serde(default)]
    pub annotations: BTreeMap<String, AnnotationTable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Observation identifiers, one per row.
    pub obs_names: Vec<String>,
    /// Observation metadata columns.
    #[serde(default)]
    pub obs: BTreeMap<String, ObsColumn>,
    /// Feature matrix, stored column by column.
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub uns: SideAnnotations,
}

impl Dataset {
    /// Creates a validated dataset.
    pub fn new(
        obs_names: Vec<String>,
        obs: BTreeMap<String, ObsColumn>,
        features: Vec<Feature>,
    ) -> Result<Self, DatasetError> {
        let dataset = Self {
            obs_names,
            obs,
            features,
            uns: SideAnnotations::default(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Checks that every column has one value per observation and that
    /// feature names are unique.
    pub fn validate(&self) -> Result<(), DatasetError> {
        let expected = self.n_obs();
        for (column, values) in &self.obs {
            check_len(column, expected, values.len())?;
        }
        let mut seen = BTreeSet::new();
        for feature in &self.features {
            check_len(&feature.name, expected, feature.values.len())?;
            if !seen.insert(feature.name.as_str()) {
                return Err(DatasetError::DuplicateFeature {
                    name: feature.name.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn n_obs(&self) -> usize {
        self.obs_names.len()
    }

    #[must_use]
    pub fn obs_column(&self, name: &str) -> Option<&ObsColumn> {
        self.obs.get(name)
    }

    /// Inserts or replaces an observation-metadata column.
    pub fn set_obs_column(
        &mut self,
        name: impl Into<String>,
        values: ObsColumn,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        check_len(&name, self.n_obs(), values.len())?;
        self.obs.insert(name, values);
        Ok(())
    }

    #[must_use]
    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Features holding non-numeric values, in matrix order.
    pub fn categorical_features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.values.is_categorical())
    }

    /// Distinct non-missing values of an observation column, ascending.
    ///
    /// Returns `None` if the column does not exist.
    #[must_use]
    pub fn group_names(&self, column: &str) -> Option<Vec<String>> {
        let values = self.obs_column(column)?;
        let names = values
            .iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();
        Some(names)
    }
}

fn strip_encoded_prefix(name: &str) -> &str {
    name.strip_prefix(ENCODED_PREFIX).unwrap_or(name)
}

fn check_len(column: &str, expected: usize, actual: usize) -> Result<(), DatasetError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DatasetError::ColumnLength {
            column: column.to_owned(),
            expected,
            actual,
        })
    }
}
