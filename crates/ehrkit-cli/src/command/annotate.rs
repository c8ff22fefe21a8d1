use std::path::PathBuf;

use anyhow::Context;
use ehrkit_analysis::annotation::{self, BatchConfig, PrecomputedAnnotations, annotate_text};

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnnotateArg {
    /// Dataset JSON file
    dataset: PathBuf,
    /// Annotation engine output JSON file
    #[arg(long)]
    annotations: PathBuf,
    /// Observation column holding the free text
    #[arg(long)]
    text_column: String,
    /// Key for the annotation table in the dataset's side annotations
    #[arg(long, default_value = annotation::DEFAULT_KEY)]
    key: String,
    /// Number of worker processes for the annotation engine
    #[arg(long, default_value_t = BatchConfig::default().n_proc)]
    n_proc: usize,
    /// Characters per annotation batch
    #[arg(long, default_value_t = BatchConfig::default().batch_size_chars)]
    batch_size_chars: usize,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnnotateArg) -> anyhow::Result<()> {
    let AnnotateArg {
        dataset,
        annotations,
        text_column,
        key,
        n_proc,
        batch_size_chars,
        output,
    } = arg;

    let mut dataset = util::read_dataset_file(dataset)?;
    let engine: PrecomputedAnnotations = util::read_json_file("annotation engine", annotations)?;
    let config = BatchConfig {
        n_proc: *n_proc,
        batch_size_chars: *batch_size_chars,
    };

    annotate_text(&mut dataset, &engine, text_column, key, &config)
        .with_context(|| format!("Failed to annotate column '{text_column}'"))?;

    Output::save_json(&dataset, output.clone())?;
    Ok(())
}
