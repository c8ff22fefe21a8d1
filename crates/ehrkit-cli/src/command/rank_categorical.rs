use std::path::PathBuf;

use anyhow::Context;
use ehrkit_analysis::{
    groups::{GroupSpec, Reference},
    rank::{DEFAULT_KEY, RankConfig, rank_categorical_features},
};
use ehrkit_stats::{correction::CorrectionMethod, power_divergence::PowerDivergence};

use crate::{
    schema::report::RankReport,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct RankCategoricalArg {
    /// Dataset JSON file
    dataset: PathBuf,
    /// Observation column defining the groups
    #[arg(long)]
    groupby: String,
    /// Groups to compare, comma separated (default: all groups)
    #[arg(long, value_delimiter = ',')]
    groups: Vec<String>,
    /// Reference group, or "rest" for all other selected groups
    #[arg(long, default_value_t = Reference::Rest)]
    reference: Reference,
    /// Power-divergence test statistic
    #[arg(long, default_value_t = PowerDivergence::GTest)]
    method: PowerDivergence,
    /// Multiple-testing correction
    #[arg(long, default_value_t = CorrectionMethod::BenjaminiHochberg)]
    corr_method: CorrectionMethod,
    /// Result key in the dataset's side annotations
    #[arg(long, default_value = DEFAULT_KEY)]
    key: String,
    /// Also report percentages
    #[arg(long)]
    pts: bool,
    /// Write a ranking report instead of the updated dataset
    #[arg(long)]
    report: bool,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &RankCategoricalArg) -> anyhow::Result<()> {
    let RankCategoricalArg {
        dataset,
        groupby,
        groups,
        reference,
        method,
        corr_method,
        key,
        pts,
        report,
        output,
    } = arg;

    let mut dataset = util::read_dataset_file(dataset)?;
    let groups = util::split_list(groups);
    let config = RankConfig {
        groups: if groups.is_empty() {
            GroupSpec::all()
        } else {
            GroupSpec::list(groups)
        },
        reference: reference.clone(),
        method: *method,
        corr_method: *corr_method,
        key_added: key.clone(),
        pts: *pts,
        ..RankConfig::new(groupby.clone())
    };

    rank_categorical_features(&mut dataset, &config)
        .with_context(|| format!("Failed to rank categorical features by '{groupby}'"))?;

    if *report {
        let ranked = dataset
            .uns
            .rank_results
            .get(key)
            .with_context(|| format!("No results stored under key '{key}'"))?;
        Output::save_json(&RankReport::new(key, ranked), output.clone())?;
    } else {
        Output::save_json(&dataset, output.clone())?;
    }
    Ok(())
}
