use clap::{Parser, Subcommand};

use self::{
    annotate::AnnotateArg, annotation_overview::AnnotationOverviewArg,
    rank_categorical::RankCategoricalArg, tag_rows::TagRowsArg,
};

mod annotate;
mod annotation_overview;
mod rank_categorical;
mod tag_rows;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What analysis to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Rank categorical features between groups and store the results
    RankCategorical(#[clap(flatten)] RankCategoricalArg),
    /// Attach concept annotations produced by the annotation engine
    Annotate(#[clap(flatten)] AnnotateArg),
    /// Summarize stored concept annotations per concept
    AnnotationOverview(#[clap(flatten)] AnnotationOverviewArg),
    /// Add yes/no observation columns for annotated concepts
    TagRows(#[clap(flatten)] TagRowsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::RankCategorical(arg) => rank_categorical::run(&arg)?,
        Mode::Annotate(arg) => annotate::run(&arg)?,
        Mode::AnnotationOverview(arg) => annotation_overview::run(&arg)?,
        Mode::TagRows(arg) => tag_rows::run(&arg)?,
    }
    Ok(())
}
