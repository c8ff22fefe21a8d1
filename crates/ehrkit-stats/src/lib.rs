//! Statistical primitives for the ehrkit project.
//!
//! This crate provides the numeric building blocks used by group comparisons
//! over clinical datasets:
//!
//! - **Contingency tables**: Cross-tabulate two categorical variables
//! - **Power-divergence tests**: Chi-square, G-test and related statistics of
//!   the Cressie-Read family, with p-values from the chi-squared distribution
//! - **Multiple-testing correction**: Benjamini-Hochberg and Bonferroni
//!
//! # Modules
//!
//! - [`contingency`]: Contingency table construction and expected frequencies
//! - [`power_divergence`]: Power-divergence statistic family and independence tests
//! - [`correction`]: Multiple-testing correction of p-value families
//!
//! # Examples
//!
//! ## Testing independence of two categorical variables
//!
//! ```
//! use ehrkit_stats::{contingency::ContingencyTable, power_divergence::PowerDivergence};
//!
//! let observations = [("smoker", true), ("smoker", true), ("never", false), ("never", true)];
//! let table = ContingencyTable::from_observations(observations);
//! let result = PowerDivergence::GTest.test(&table);
//! assert!((0.0..=1.0).contains(&result.p_value));
//! ```
//!
//! ## Correcting a family of p-values
//!
//! ```
//! use ehrkit_stats::correction::CorrectionMethod;
//!
//! let adjusted = CorrectionMethod::Bonferroni.adjust(&[0.01, 0.02, 0.5]);
//! assert!((adjusted[0] - 0.03).abs() < 1e-12);
//! assert!((adjusted[1] - 0.06).abs() < 1e-12);
//! assert_eq!(adjusted[2], 1.0);
//! ```

pub mod contingency;
pub mod correction;
pub mod power_divergence;
