use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use ehrkit_analysis::annotation::{self, ConceptOverview, StatusFilter, overview};

use crate::{
    schema::report::OverviewReport,
    util::{self, Output},
};

const NAME_WIDTH: usize = 40;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct AnnotationOverviewArg {
    /// Dataset JSON file
    dataset: PathBuf,
    /// Key of the annotation table in the dataset's side annotations
    #[arg(long, default_value = annotation::DEFAULT_KEY)]
    key: String,
    /// Mentions to include: Affirmed, Other or Both
    #[arg(long, default_value_t = StatusFilter::Affirmed)]
    status: StatusFilter,
    /// Write a JSON report instead of printing a table
    #[arg(long)]
    json: bool,
    /// Output file path for the JSON report
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &AnnotationOverviewArg) -> anyhow::Result<()> {
    let AnnotationOverviewArg {
        dataset,
        key,
        status,
        json,
        output,
    } = arg;

    let dataset = util::read_dataset_file(dataset)?;
    let table = dataset
        .uns
        .annotations
        .get(key)
        .with_context(|| format!("No annotations stored under key '{key}'"))?;
    let concepts = overview(table, *status);

    if *json || output.is_some() {
        let report = OverviewReport {
            generated_at: Utc::now(),
            key: key.clone(),
            status: *status,
            concepts,
        };
        Output::save_json(&report, output.clone())?;
    } else {
        print_overview(key, *status, &concepts);
    }
    Ok(())
}

fn print_overview(key: &str, status: StatusFilter, concepts: &[ConceptOverview]) {
    println!("Concept Overview: {key} (status: {status})");
    println!("==========================================\n");
    println!(
        "{:<12} {:<NAME_WIDTH$} {:<8} {:>8} {:>8}",
        "CUI", "Name", "Type", "Rows", "Rows %"
    );
    for concept in concepts {
        println!(
            "{:<12} {:<NAME_WIDTH$} {:<8} {:>8} {:>7.1}%",
            concept.cui,
            truncate(&concept.pretty_name, NAME_WIDTH),
            concept.type_id.as_deref().unwrap_or("-"),
            concept.n_patient_visit,
            concept.n_patient_visit_percent,
        );
    }
    println!("\nConcepts: {}", concepts.len());
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_owned()
    } else {
        let mut truncated = s.chars().take(width - 1).collect::<String>();
        truncated.push('…');
        truncated
    }
}
