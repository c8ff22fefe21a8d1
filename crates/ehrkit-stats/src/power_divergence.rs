//! Power-divergence independence tests for contingency tables
//!
//! The Cressie-Read power-divergence statistic is a one-parameter family
//! indexed by `lambda`:
//!
//! ```text
//! 2 / (lambda * (lambda + 1)) * sum(observed * ((observed / expected)^lambda - 1))
//! ```
//!
//! Well-known tests are members of the family:
//!
//! | Test                 | lambda |
//! |----------------------|--------|
//! | `chi-square`         | 1      |
//! | `g-test`             | 0      |
//! | `freeman-tukey`      | -1/2   |
//! | `mod-log-likelihood` | -1     |
//! | `neyman`             | -2     |
//! | `cressie-read`       | 2/3    |
//!
//! `lambda = 0` and `lambda = -1` are defined by their limits (log-likelihood
//! forms). Under independence the statistic follows a chi-squared distribution
//! with `(rows - 1) * (cols - 1)` degrees of freedom.
//!
//! # Continuity correction
//!
//! For tables with a single degree of freedom, observed counts are moved by at
//! most 0.5 toward their expected counts (Yates' correction) before the
//! statistic is computed.
//!
//! # Zero cells
//!
//! Members with `lambda < 0` are undefined for zero observed counts. Such
//! cells yield an infinite or NaN statistic, which propagates to the p-value
//! (`0.0` or NaN respectively).

use std::{fmt, str::FromStr};

use statrs::distribution::{ChiSquared, ContinuousCDF as _};

use crate::contingency::ContingencyTable;

/// Named member of the power-divergence statistic family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerDivergence {
    /// Pearson's chi-squared statistic (`lambda = 1`).
    ChiSquare,
    /// Log-likelihood ratio, G-test (`lambda = 0`).
    #[default]
    GTest,
    /// Freeman-Tukey statistic (`lambda = -1/2`).
    FreemanTukey,
    /// Modified log-likelihood ratio (`lambda = -1`).
    ModLogLikelihood,
    /// Neyman's modified chi-squared (`lambda = -2`).
    Neyman,
    /// Cressie-Read recommended statistic (`lambda = 2/3`).
    CressieRead,
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display(
    "unsupported test method '{name}'; expected one of chi-square, g-test, freeman-tukey, mod-log-likelihood, neyman, cressie-read"
)]
pub struct UnsupportedTestMethod {
    pub name: String,
}

/// Outcome of an independence test on a contingency table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContingencyTestResult {
    /// The power-divergence statistic.
    pub statistic: f64,
    /// Upper-tail probability of the statistic under independence.
    pub p_value: f64,
    /// Degrees of freedom used for the p-value.
    pub dof: usize,
}

impl PowerDivergence {
    pub const ALL: [Self; 6] = [
        Self::ChiSquare,
        Self::GTest,
        Self::FreemanTukey,
        Self::ModLogLikelihood,
        Self::Neyman,
        Self::CressieRead,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ChiSquare => "chi-square",
            Self::GTest => "g-test",
            Self::FreemanTukey => "freeman-tukey",
            Self::ModLogLikelihood => "mod-log-likelihood",
            Self::Neyman => "neyman",
            Self::CressieRead => "cressie-read",
        }
    }

    /// The `lambda` index of this member of the family.
    #[must_use]
    pub fn lambda(self) -> f64 {
        match self {
            Self::ChiSquare => 1.0,
            Self::GTest => 0.0,
            Self::FreemanTukey => -0.5,
            Self::ModLogLikelihood => -1.0,
            Self::Neyman => -2.0,
            Self::CressieRead => 2.0 / 3.0,
        }
    }

    /// Computes the statistic between observed and expected frequencies.
    ///
    /// # Panics
    ///
    /// Panics if `observed` and `expected` have different lengths.
    #[must_use]
    pub fn statistic(self, observed: &[f64], expected: &[f64]) -> f64 {
        assert_eq!(
            observed.len(),
            expected.len(),
            "observed and expected must have the same length"
        );
        let pairs = observed.iter().zip(expected);
        match self {
            Self::ChiSquare => pairs.map(|(o, e)| (o - e).powi(2) / e).sum(),
            Self::GTest => 2.0 * pairs.map(|(&o, &e)| xlogy(o, o / e)).sum::<f64>(),
            Self::ModLogLikelihood => 2.0 * pairs.map(|(&o, &e)| xlogy(e, e / o)).sum::<f64>(),
            Self::FreemanTukey | Self::Neyman | Self::CressieRead => {
                let lambda = self.lambda();
                let sum = pairs
                    .map(|(o, e)| o * ((o / e).powf(lambda) - 1.0))
                    .sum::<f64>();
                2.0 / (lambda * (lambda + 1.0)) * sum
            }
        }
    }

    /// Tests independence of the row and column variables of `table`.
    ///
    /// Tables without any degree of freedom (a single row or column, or no
    /// observations at all) carry no evidence against independence and
    /// report a statistic of `0.0` with a p-value of `1.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ehrkit_stats::{contingency::ContingencyTable, power_divergence::PowerDivergence};
    ///
    /// let table = ContingencyTable::new(2, 3, vec![10.0, 10.0, 20.0, 20.0, 20.0, 20.0]);
    /// let result = PowerDivergence::ChiSquare.test(&table);
    /// assert_eq!(result.dof, 2);
    /// assert!(result.statistic > 0.0);
    /// assert!(result.p_value > 0.05);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn test(self, table: &ContingencyTable) -> ContingencyTestResult {
        let dof = table.dof();
        if dof == 0 {
            return ContingencyTestResult {
                statistic: 0.0,
                p_value: 1.0,
                dof,
            };
        }

        let expected = table.expected();
        let mut observed = table.counts().to_vec();
        if dof == 1 {
            for (o, e) in observed.iter_mut().zip(&expected) {
                let diff = e - *o;
                *o += diff.signum() * diff.abs().min(0.5);
            }
        }

        let statistic = self.statistic(&observed, &expected);
        let p_value = chi2_survival(statistic, dof as f64);
        ContingencyTestResult {
            statistic,
            p_value,
            dof,
        }
    }
}

impl fmt::Display for PowerDivergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.name(), f)
    }
}

impl FromStr for PowerDivergence {
    type Err = UnsupportedTestMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.name() == s)
            .ok_or_else(|| UnsupportedTestMethod { name: s.to_owned() })
    }
}

/// `x * ln(y)`, defined as `0` when `x == 0`.
fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 { 0.0 } else { x * y.ln() }
}

fn chi2_survival(statistic: f64, dof: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic.is_infinite() {
        return 0.0;
    }
    ChiSquared::new(dof).map_or(f64::NAN, |dist| dist.sf(statistic))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() < tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_parse_all_names() {
        for method in PowerDivergence::ALL {
            assert_eq!(method.name().parse::<PowerDivergence>().unwrap(), method);
            assert_eq!(method.to_string(), method.name());
        }
        assert_eq!(PowerDivergence::default(), PowerDivergence::GTest);
    }

    #[test]
    fn test_parse_unknown_name() {
        let err = "fisher".parse::<PowerDivergence>().unwrap_err();
        assert_eq!(err.name, "fisher");
        assert!(err.to_string().contains("fisher"));
    }

    #[test]
    fn test_pearson_statistic() {
        let stat = PowerDivergence::ChiSquare.statistic(&[10.0, 30.0], &[20.0, 20.0]);
        assert_close(stat, 10.0, 1e-12);
    }

    #[test]
    fn test_g_statistic_ignores_zero_cells() {
        let stat = PowerDivergence::GTest.statistic(&[0.0, 40.0], &[20.0, 20.0]);
        assert_close(stat, 2.0 * 40.0 * 2.0_f64.ln(), 1e-12);
    }

    #[test]
    fn test_general_lambda_matches_pearson_at_one() {
        // The general formula at lambda = 1 reduces to Pearson's statistic.
        let observed = [12.0, 8.0, 5.0, 15.0];
        let expected = [10.0, 10.0, 10.0, 10.0];
        let pearson = PowerDivergence::ChiSquare.statistic(&observed, &expected);
        let lambda = 1.0_f64;
        let general = 2.0 / (lambda * (lambda + 1.0))
            * observed
                .iter()
                .zip(&expected)
                .map(|(o, e)| o * ((o / e).powf(lambda) - 1.0))
                .sum::<f64>();
        assert_close(pearson, general, 1e-9);
    }

    #[test]
    fn test_neyman_equals_reverse_pearson() {
        let observed = [12.0, 8.0];
        let expected = [10.0, 10.0];
        let neyman = PowerDivergence::Neyman.statistic(&observed, &expected);
        let reverse = observed
            .iter()
            .zip(&expected)
            .map(|(o, e)| (o - e).powi(2) / o)
            .sum::<f64>();
        assert_close(neyman, reverse, 1e-9);
    }

    #[test]
    fn test_degenerate_table_is_not_significant() {
        let table = ContingencyTable::from_observations([("x", true), ("y", true)]);
        let result = PowerDivergence::GTest.test(&table);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.dof, 0);
    }

    #[test]
    fn test_yates_correction_on_two_by_two() {
        // observed [[20, 10], [10, 20]], expected 15 everywhere.
        // With Yates: |o - e| = 4.5 in each cell, chi2 = 4 * 4.5^2 / 15 = 5.4.
        let table = ContingencyTable::new(2, 2, vec![20.0, 10.0, 10.0, 20.0]);
        let result = PowerDivergence::ChiSquare.test(&table);
        assert_eq!(result.dof, 1);
        assert_close(result.statistic, 5.4, 1e-9);
        assert_close(result.p_value, 0.020_136, 1e-4);
    }

    #[test]
    fn test_reference_values_per_lambda() {
        // observed [[10, 20], [30, 40]], expected [[12, 18], [28, 42]],
        // Yates-corrected to [[10.5, 19.5], [29.5, 40.5]].
        let table = ContingencyTable::new(2, 2, vec![10.0, 20.0, 30.0, 40.0]);
        let cases = [
            (PowerDivergence::ChiSquare, 0.446_429, 0.504_036),
            (PowerDivergence::GTest, 0.450_687, 0.502_009),
            (PowerDivergence::FreemanTukey, 0.453_095, 0.500_869),
            (PowerDivergence::ModLogLikelihood, 0.455_696, 0.499_642),
            (PowerDivergence::Neyman, 0.461_497, 0.496_925),
            (PowerDivergence::CressieRead, 0.447_767, 0.503_397),
        ];
        for (method, statistic, p_value) in cases {
            let result = method.test(&table);
            assert_eq!(result.dof, 1, "{method}");
            assert_close(result.statistic, statistic, 1e-5);
            assert_close(result.p_value, p_value, 1e-5);
        }
    }

    #[test]
    fn test_strong_association_is_significant() {
        let table = ContingencyTable::new(3, 2, vec![50.0, 5.0, 5.0, 50.0, 20.0, 20.0]);
        for method in [
            PowerDivergence::ChiSquare,
            PowerDivergence::GTest,
            PowerDivergence::CressieRead,
            PowerDivergence::FreemanTukey,
        ] {
            let result = method.test(&table);
            assert_eq!(result.dof, 2);
            assert!(result.p_value < 1e-6, "{method}: {}", result.p_value);
        }
    }

    #[test]
    fn test_zero_cell_with_negative_lambda() {
        let table = ContingencyTable::new(2, 3, vec![0.0, 10.0, 10.0, 10.0, 10.0, 10.0]);
        let result = PowerDivergence::ModLogLikelihood.test(&table);
        assert!(result.statistic.is_infinite());
        assert_eq!(result.p_value, 0.0);
    }
}
