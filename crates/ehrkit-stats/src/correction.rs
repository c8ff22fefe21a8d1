//! Multiple-testing correction
//!
//! When many hypotheses are tested at once, raw p-values overstate the
//! evidence against each null. This module adjusts a family of p-values so
//! they can be compared against a single significance threshold.
//!
//! # Methods
//!
//! - **Benjamini-Hochberg**: Controls the false discovery rate. Sorted p-values
//!   are scaled by `m / rank`, then made monotone from the largest rank down.
//! - **Bonferroni**: Controls the family-wise error rate by scaling every
//!   p-value by the family size `m`.
//!
//! Adjusted values are clipped at `1.0`. NaN p-values are left as NaN and do
//! not count toward the family size.

use std::{fmt, str::FromStr};

/// Significance threshold used to decide rejections.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Supported correction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionMethod {
    /// False-discovery-rate control (step-up procedure).
    #[default]
    BenjaminiHochberg,
    /// Family-wise error rate control.
    Bonferroni,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unsupported correction method '{name}'; expected benjamini-hochberg or bonferroni")]
pub struct UnsupportedCorrectionMethod {
    pub name: String,
}

/// Adjusted p-values together with the rejection decision at `alpha`.
#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub adjusted: Vec<f64>,
    pub rejected: Vec<bool>,
    pub alpha: f64,
}

impl CorrectionMethod {
    pub const ALL: [Self; 2] = [Self::BenjaminiHochberg, Self::Bonferroni];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BenjaminiHochberg => "benjamini-hochberg",
            Self::Bonferroni => "bonferroni",
        }
    }

    /// Adjusts a single family of p-values.
    ///
    /// # Examples
    ///
    /// ```
    /// use ehrkit_stats::correction::CorrectionMethod;
    ///
    /// let adjusted = CorrectionMethod::BenjaminiHochberg.adjust(&[0.01, 0.04, 0.03]);
    /// assert!((adjusted[0] - 0.03).abs() < 1e-12);
    /// assert!((adjusted[1] - 0.04).abs() < 1e-12);
    /// assert!((adjusted[2] - 0.04).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn adjust(self, pvals: &[f64]) -> Vec<f64> {
        match self {
            Self::BenjaminiHochberg => benjamini_hochberg(pvals),
            Self::Bonferroni => bonferroni(pvals),
        }
    }

    /// Adjusts `pvals` and marks the hypotheses rejected at `alpha`.
    #[must_use]
    pub fn correct(self, pvals: &[f64], alpha: f64) -> Correction {
        let adjusted = self.adjust(pvals);
        let rejected = adjusted.iter().map(|p| *p <= alpha).collect();
        Correction {
            adjusted,
            rejected,
            alpha,
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.name(), f)
    }
}

impl FromStr for CorrectionMethod {
    type Err = UnsupportedCorrectionMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| UnsupportedCorrectionMethod { name: s.to_owned() })
    }
}

#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn benjamini_hochberg(pvals: &[f64]) -> Vec<f64> {
    let mut order = (0..pvals.len())
        .filter(|&i| !pvals[i].is_nan())
        .collect::<Vec<_>>();
    order.sort_by(|&a, &b| pvals[a].total_cmp(&pvals[b]));

    let m = order.len() as f64;
    let mut adjusted = pvals.to_vec();
    let mut running_min = 1.0_f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        let scaled = pvals[i] * m / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        adjusted[i] = running_min;
    }
    adjusted
}

#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn bonferroni(pvals: &[f64]) -> Vec<f64> {
    let m = pvals.iter().filter(|p| !p.is_nan()).count() as f64;
    pvals
        .iter()
        .map(|&p| if p.is_nan() { p } else { (p * m).min(1.0) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "expected {expected:?}, got {actual:?}");
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "benjamini-hochberg".parse::<CorrectionMethod>().unwrap(),
            CorrectionMethod::BenjaminiHochberg
        );
        assert_eq!(
            "bonferroni".parse::<CorrectionMethod>().unwrap(),
            CorrectionMethod::Bonferroni
        );
        let err = "holm".parse::<CorrectionMethod>().unwrap_err();
        assert_eq!(err.name, "holm");
    }

    #[test]
    fn test_bonferroni_scales_and_clips() {
        let adjusted = bonferroni(&[0.01, 0.2, 0.6]);
        assert_all_close(&adjusted, &[0.03, 0.6, 1.0]);
    }

    #[test]
    fn test_bonferroni_never_decreases() {
        let pvals = [0.0, 1e-8, 0.001, 0.3, 0.9, 1.0];
        let adjusted = bonferroni(&pvals);
        for (raw, adj) in pvals.iter().zip(&adjusted) {
            assert!(adj >= raw);
        }
    }

    #[test]
    fn test_benjamini_hochberg_known_values() {
        // ranks: 0.01 -> 1, 0.02 -> 2, 0.03 -> 3, 0.5 -> 4 (m = 4)
        let adjusted = benjamini_hochberg(&[0.03, 0.5, 0.01, 0.02]);
        assert_all_close(&adjusted, &[0.04, 0.5, 0.04, 0.04]);
    }

    #[test]
    fn test_benjamini_hochberg_is_monotone_in_raw_order() {
        let pvals = [0.001, 0.008, 0.039, 0.041, 0.042, 0.06, 0.074, 0.205];
        let adjusted = benjamini_hochberg(&pvals);
        assert!(adjusted.is_sorted_by(|a, b| a <= b));
        for (raw, adj) in pvals.iter().zip(&adjusted) {
            assert!(adj >= raw);
            assert!(*adj <= 1.0);
        }
    }

    #[test]
    fn test_nan_is_preserved_and_excluded() {
        let adjusted = bonferroni(&[0.01, f64::NAN, 0.02]);
        assert!(adjusted[1].is_nan());
        assert_all_close(&[adjusted[0], adjusted[2]], &[0.02, 0.04]);

        let adjusted = benjamini_hochberg(&[f64::NAN, 0.01]);
        assert!(adjusted[0].is_nan());
        assert_all_close(&adjusted[1..], &[0.01]);
    }

    #[test]
    fn test_correct_rejects_at_alpha() {
        let correction = CorrectionMethod::Bonferroni.correct(&[0.01, 0.04], DEFAULT_ALPHA);
        assert_eq!(correction.rejected, vec![true, false]);
        assert_eq!(correction.alpha, DEFAULT_ALPHA);
    }

    #[test]
    fn test_empty_family() {
        assert!(benjamini_hochberg(&[]).is_empty());
        assert!(bonferroni(&[]).is_empty());
    }
}
