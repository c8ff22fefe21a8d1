use chrono::{DateTime, Utc};
use ehrkit_analysis::{
    annotation::{ConceptOverview, StatusFilter},
    group_table::GroupTable,
    results::{RankParams, RankedFeatures},
};
use serde::{Deserialize, Serialize};

/// Ranked features of one analysis key, grouped for reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    /// Timestamp when the report was generated (ISO 8601 format)
    pub generated_at: DateTime<Utc>,
    /// Result key in the dataset's side annotations
    pub key: String,
    /// How the results were produced
    pub params: Option<RankParams>,
    /// Per-group rankings, in stored group order
    pub groups: Vec<GroupRanking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRanking {
    pub group: String,
    /// Features ordered as stored (ascending adjusted p-value after sorting)
    pub features: Vec<FeatureRanking>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRanking {
    pub name: String,
    pub score: Option<f64>,
    pub pval: Option<f64>,
    pub pval_adj: Option<f64>,
}

impl RankReport {
    pub fn new(key: &str, ranked: &RankedFeatures) -> Self {
        let groups = ranked
            .names
            .iter()
            .flat_map(|names| names.columns())
            .map(|column| {
                let value = |table: Option<&GroupTable<f64>>, row| cell(table, &column.group, row);
                let features = column
                    .values
                    .iter()
                    .enumerate()
                    .map(|(row, name)| FeatureRanking {
                        name: name.clone(),
                        score: value(ranked.scores.as_ref(), row),
                        pval: value(ranked.pvals.as_ref(), row),
                        pval_adj: value(ranked.pvals_adj.as_ref(), row),
                    })
                    .collect();
                GroupRanking {
                    group: column.group.clone(),
                    features,
                }
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            key: key.to_owned(),
            params: ranked.params.clone(),
            groups,
        }
    }
}

fn cell(table: Option<&GroupTable<f64>>, group: &str, row: usize) -> Option<f64> {
    table?
        .column(group)?
        .get(row)
        .copied()
        .filter(|v| v.is_finite())
}

/// Concept overview of one annotation table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverviewReport {
    /// Timestamp when the report was generated (ISO 8601 format)
    pub generated_at: DateTime<Utc>,
    pub key: String,
    pub status: StatusFilter,
    pub concepts: Vec<ConceptOverview>,
}
