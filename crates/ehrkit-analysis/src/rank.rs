//! Feature ranking pipeline
//!
//! [`rank_categorical_features`] chains the building blocks of a group
//! comparison:
//!
//! 1. select groups and run the categorical test
//!    ([`evaluate_categorical_features`])
//! 2. save the rows into the dataset's [`ResultStore`]
//! 3. record the run parameters
//! 4. adjust p-values per group, replacing any previous adjusted values
//! 5. sort every group column by adjusted p-value
//!
//! Running the pipeline twice with the same key appends the second run's rows
//! below the first one's, and the correction is recomputed over the whole
//! accumulated column.

use ehrkit_stats::{correction::CorrectionMethod, power_divergence::PowerDivergence};
use serde::{Deserialize, Serialize};

use crate::{
    categorical::{CategoricalTestError, evaluate_categorical_features},
    dataset::Dataset,
    groups::{GroupSpec, Reference},
    results::{RankParams, ResultStore, ResultStoreError},
};

/// Result key used when the caller does not choose one.
pub const DEFAULT_KEY: &str = "rank_features_groups";

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum RankError {
    #[display("categorical test failed: {_0}")]
    Test(CategoricalTestError),
    #[display("failed to store results: {_0}")]
    Store(ResultStoreError),
}

impl From<CategoricalTestError> for RankError {
    fn from(err: CategoricalTestError) -> Self {
        Self::Test(err)
    }
}

impl From<ResultStoreError> for RankError {
    fn from(err: ResultStoreError) -> Self {
        Self::Store(err)
    }
}

/// Parameters of a categorical ranking run.
///
/// Deserializes from partial JSON; only `groupby` is required.
///
/// ```
/// use ehrkit_analysis::rank::RankConfig;
///
/// let config: RankConfig =
///     serde_json::from_str(r#"{ "groupby": "unit", "method": "chi-square" }"#).unwrap();
/// assert_eq!(config.key_added, "rank_features_groups");
/// assert!(config.groups.is_all());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankConfig {
    /// Observation column defining the groups.
    pub groupby: String,
    #[serde(default)]
    pub groups: GroupSpec,
    #[serde(default)]
    pub reference: Reference,
    #[serde(default)]
    pub method: PowerDivergence,
    #[serde(default)]
    pub corr_method: CorrectionMethod,
    #[serde(default = "default_key")]
    pub key_added: String,
    /// Also report the (constant) expression percentage.
    #[serde(default)]
    pub pts: bool,
}

fn default_key() -> String {
    DEFAULT_KEY.to_owned()
}

impl RankConfig {
    /// Default configuration for comparing the groups of `groupby`.
    #[must_use]
    pub fn new(groupby: impl Into<String>) -> Self {
        Self {
            groupby: groupby.into(),
            groups: GroupSpec::all(),
            reference: Reference::Rest,
            method: PowerDivergence::default(),
            corr_method: CorrectionMethod::default(),
            key_added: default_key(),
            pts: false,
        }
    }

    fn params(&self) -> RankParams {
        RankParams {
            groupby: self.groupby.clone(),
            reference: self.reference.clone(),
            method: self.method,
            corr_method: self.corr_method,
        }
    }
}

/// Ranks categorical features between groups and stores the results in
/// `dataset.uns.rank_results` under `config.key_added`.
///
/// The pipeline runs on a copy of the entry under `config.key_added`, which
/// replaces the stored entry only once every step has succeeded. On error,
/// nothing is written to the store.
pub fn rank_categorical_features(
    dataset: &mut Dataset,
    config: &RankConfig,
) -> Result<(), RankError> {
    let output = evaluate_categorical_features(dataset, config)?;
    let groups_order = output.groups_order.clone();
    let key = config.key_added.as_str();

    let mut staged = ResultStore::new();
    if let Some(existing) = dataset.uns.rank_results.get(key) {
        staged.insert(key, existing.clone());
    }
    staged.save(key, output.into_fields(), &groups_order)?;
    staged.set_params(key, config.params());
    staged.adjust_pvalues(key, config.corr_method);
    staged.sort_by_adjusted_pvalue(key)?;

    if let Some(entry) = staged.remove(key) {
        dataset.uns.rank_results.insert(key, entry);
    }

    tracing::info!(
        key,
        corr_method = %config.corr_method,
        "stored ranked features"
    );
    Ok(())
}
