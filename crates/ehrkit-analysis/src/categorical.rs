//! Per-group independence tests on categorical features
//!
//! Every categorical feature (except the grouping variable itself) is tested
//! once per selected group. The observations taking part in a test are split
//! into two partitions and cross-tabulated against the feature's values:
//!
//! ```text
//!          not in group   in group
//! copd          11            3
//! sepsis         4           12
//! ```
//!
//! With [`Reference::Rest`] the second partition is every other *selected*
//! group; with a specific reference group it is that group alone.
//! Observations whose feature value or group is missing are ignored.
//!
//! Categorical data has no meaningful fold change or expression percentage,
//! so both are reported as the constant `1.0`.

use ehrkit_stats::contingency::ContingencyTable;

use crate::{
    dataset::{Dataset, FeatureValues},
    groups::{GroupSelectionError, Reference, select_groups},
    rank::RankConfig,
    results::RankFields,
};

/// Placeholder reported for fold change and percentage.
pub const CONSTANT_EFFECT: f64 = 1.0;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CategoricalTestError {
    #[display("{_0}")]
    GroupSelection(GroupSelectionError),
    #[display("column '{column}' not found in observation metadata")]
    ColumnNotFound { column: String },
}

impl From<GroupSelectionError> for CategoricalTestError {
    fn from(err: GroupSelectionError) -> Self {
        Self::GroupSelection(err)
    }
}

/// Test results laid out as `[feature][group]` rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalTestOutput {
    /// Canonical group order; one entry per row cell.
    pub groups_order: Vec<String>,
    pub names: Vec<Vec<String>>,
    pub scores: Vec<Vec<f64>>,
    pub pvals: Vec<Vec<f64>>,
    pub logfoldchanges: Vec<Vec<f64>>,
    /// Empty unless percentages were requested.
    pub pts: Vec<Vec<f64>>,
}

impl CategoricalTestOutput {
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Converts into the field set accepted by
    /// [`ResultStore::save`](crate::results::ResultStore::save).
    #[must_use]
    pub fn into_fields(self) -> RankFields {
        RankFields {
            names: self.names,
            scores: self.scores,
            pvals: self.pvals,
            pvals_adj: vec![],
            logfoldchanges: self.logfoldchanges,
            pts: self.pts,
        }
    }
}

/// Runs the configured power-divergence test for every categorical feature
/// and every selected group of `config.groupby`.
///
/// # Errors
///
/// - [`CategoricalTestError::ColumnNotFound`] if `config.groupby` is not an
///   observation column
/// - [`CategoricalTestError::GroupSelection`] if the group request or the
///   reference is invalid
pub fn evaluate_categorical_features(
    dataset: &Dataset,
    config: &RankConfig,
) -> Result<CategoricalTestOutput, CategoricalTestError> {
    let column_not_found = || CategoricalTestError::ColumnNotFound {
        column: config.groupby.clone(),
    };
    let groupby = dataset
        .obs_column(&config.groupby)
        .ok_or_else(column_not_found)?;
    let group_names = dataset
        .group_names(&config.groupby)
        .ok_or_else(column_not_found)?;
    let groups_order = select_groups(&config.groups, &group_names, &config.reference)?;

    let width = groups_order.len();
    let mut output = CategoricalTestOutput {
        groups_order,
        ..CategoricalTestOutput::default()
    };

    for feature in dataset.categorical_features() {
        if feature.refers_to(&config.groupby) {
            continue;
        }
        let FeatureValues::Categorical(values) = &feature.values else {
            continue;
        };

        let mut scores = Vec::with_capacity(width);
        let mut pvals = Vec::with_capacity(width);
        for group in &output.groups_order {
            let table = partition_table(
                values,
                groupby,
                group,
                &output.groups_order,
                &config.reference,
            );
            let result = config.method.test(&table);
            tracing::debug!(
                feature = %feature.name,
                group = %group,
                statistic = result.statistic,
                p_value = result.p_value,
                dof = result.dof,
                "tested feature"
            );
            scores.push(result.statistic);
            pvals.push(result.p_value);
        }

        output.names.push(vec![feature.name.clone(); width]);
        output.scores.push(scores);
        output.pvals.push(pvals);
        output.logfoldchanges.push(vec![CONSTANT_EFFECT; width]);
        if config.pts {
            output.pts.push(vec![CONSTANT_EFFECT; width]);
        }
    }

    tracing::info!(
        groupby = %config.groupby,
        method = %config.method,
        features = output.n_features(),
        groups = width,
        "evaluated categorical features"
    );
    Ok(output)
}

/// Cross-tabulates feature values against membership in `group`.
fn partition_table(
    values: &[Option<String>],
    groupby: &[Option<String>],
    group: &str,
    selected: &[String],
    reference: &Reference,
) -> ContingencyTable {
    let observations = values
        .iter()
        .zip(groupby)
        .filter_map(|(value, obs_group)| Some((value.as_deref()?, obs_group.as_deref()?)))
        .filter(|&(_, obs_group)| match reference.as_group() {
            Some(reference) => obs_group == group || obs_group == reference,
            None => selected.iter().any(|s| s == obs_group),
        })
        .map(|(value, obs_group)| (value, obs_group == group));
    ContingencyTable::from_observations(observations)
}
