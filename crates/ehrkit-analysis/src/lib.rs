//! Group comparison and concept annotation for clinical datasets
//!
//! This crate operates on a [`dataset::Dataset`]: a set of observations
//! (patients, visits) with metadata columns, a feature matrix, and a side
//! store for analysis results.
//!
//! # Overview
//!
//! The crate supports two independent workflows:
//!
//! ## Feature Ranking Workflow
//!
//! Find the categorical features that differ most between groups:
//!
//! 1. **Select Groups** ([`groups::select_groups`]): Resolve the requested groups and
//!    reference into a canonical group order
//! 2. **Test Features** ([`categorical::evaluate_categorical_features`]): Run a
//!    power-divergence test per feature and group
//! 3. **Store Results** ([`results::ResultStore::save`]): Merge the rows into per-group
//!    tables, accumulating across runs
//! 4. **Correct P-values** ([`results::adjust_pvalues`]): Benjamini-Hochberg or Bonferroni,
//!    one family per group
//! 5. **Sort** ([`results::ResultStore::sort_by_adjusted_pvalue`]): Order each group's
//!    features by adjusted p-value
//!
//! [`rank::rank_categorical_features`] runs all five steps.
//!
//! ## Concept Annotation Workflow
//!
//! Extract medical concepts from free-text columns:
//!
//! 1. **Annotate** ([`annotation::annotate_text`]): Send texts to a
//!    [`annotation::ConceptAnnotator`] and store the flattened mentions
//! 2. **Summarize** ([`annotation::overview`]): Per-concept row counts and percentages
//! 3. **Tag Rows** ([`annotation::tag_rows`]): Mark rows mentioning a concept in
//!    observation metadata
//!
//! # Examples
//!
//! ## Ranking Categorical Features
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use ehrkit_analysis::{
//!     dataset::{Dataset, Feature},
//!     rank::{RankConfig, rank_categorical_features},
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let unit = ["icu", "icu", "ward", "ward"].map(|u| Some(u.to_owned())).to_vec();
//! let obs = BTreeMap::from([("unit".to_owned(), unit)]);
//! let features = vec![Feature::categorical(
//!     "ehrcat_smoker",
//!     [Some("yes"), Some("yes"), Some("no"), Some("no")],
//! )];
//! let names = (0..4).map(|i| format!("p{i}")).collect();
//! let mut dataset = Dataset::new(names, obs, features)?;
//!
//! let config = RankConfig::new("unit");
//! rank_categorical_features(&mut dataset, &config)?;
//!
//! let ranked = dataset.uns.rank_results.get(&config.key_added).unwrap();
//! let names = ranked.names.as_ref().unwrap();
//! assert_eq!(names.column("icu").unwrap(), ["ehrcat_smoker"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Annotating Free Text
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use ehrkit_analysis::{
//!     annotation::{
//!         BatchConfig, PrecomputedAnnotations, StatusFilter, annotate_text, overview, tag_rows,
//!     },
//!     dataset::Dataset,
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let notes = vec![Some("type 2 diabetes".to_owned()), None];
//! let obs = BTreeMap::from([("notes".to_owned(), notes)]);
//! let mut dataset = Dataset::new(vec!["v1".into(), "v2".into()], obs, vec![])?;
//!
//! let engine: PrecomputedAnnotations = serde_json::from_str(
//!     r#"{ "0": { "entities": { "0": {
//!         "pretty_name": "Diabetes", "cui": "C0011849",
//!         "meta_anns": { "Status": { "value": "Affirmed" } }
//!     } } } }"#,
//! )?;
//! annotate_text(&mut dataset, &engine, "notes", "notes_concepts", &BatchConfig::default())?;
//!
//! let summary = overview(&dataset.uns.annotations["notes_concepts"], StatusFilter::Affirmed);
//! assert_eq!(summary[0].n_patient_visit, 1);
//!
//! tag_rows(&mut dataset, "notes_concepts", &["Diabetes"], None)?;
//! assert_eq!(dataset.obs["Diabetes"], [Some("yes".to_owned()), Some("no".to_owned())]);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`dataset`]: Dataset model and side-annotation store
//! - [`groups`]: Comparison group selection
//! - [`categorical`]: Per-group categorical independence tests
//! - [`group_table`]: Column-per-group result tables
//! - [`results`]: Result accumulation, correction and sorting
//! - [`rank`]: End-to-end ranking pipeline
//! - [`annotation`]: Concept annotation aggregation
//! - [`fuzzy`]: Approximate name matching

pub mod annotation;
pub mod categorical;
pub mod dataset;
pub mod fuzzy;
pub mod group_table;
pub mod groups;
pub mod rank;
pub mod results;
