use std::path::PathBuf;

use anyhow::Context;
use ehrkit_analysis::annotation::{self, tag_rows};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TagRowsArg {
    /// Dataset JSON file
    dataset: PathBuf,
    /// Concept pretty names, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    names: Vec<String>,
    /// Target column names, one per concept (default: the concept names)
    #[arg(long, value_delimiter = ',')]
    columns: Vec<String>,
    /// Key of the annotation table in the dataset's side annotations
    #[arg(long, default_value = annotation::DEFAULT_KEY)]
    key: String,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TagRowsArg) -> anyhow::Result<()> {
    let TagRowsArg {
        dataset,
        names,
        columns,
        key,
        output,
    } = arg;

    let mut dataset = util::read_dataset_file(dataset)?;
    let names = util::split_list(names);
    let columns = util::split_list(columns);
    let columns = (!columns.is_empty()).then_some(columns.as_slice());

    tag_rows(&mut dataset, key, &names, columns)
        .with_context(|| format!("Failed to tag rows from annotations '{key}'"))?;

    Output::save_json(&dataset, output.clone())?;
    Ok(())
}
