//! Discrepancy statistics between sampled tables and an expected table.
//!
//! Every function returns one value per table. Zero cells take the limit of
//! each term instead of producing NaN:
//!
//! * an observed zero contributes nothing to the likelihood ratio, Neyman and
//!   Cressie–Read sums (`0 * ln(0 / e) = 0`);
//! * a cell with expected and observed count both zero contributes nothing;
//! * a cell with zero expectation but a positive count `x` makes Pearson, the
//!   likelihood ratio and Cressie–Read with `lambda > 0` equal to
//!   `f64::INFINITY`. The Neyman term stays finite at `x`, and the
//!   Cressie–Read term with `lambda < 0` tends to `-x`.
//!
//! Length mismatches, negative counts and negative or non-finite expected
//! values are configuration errors.

use fiber_core::{ErrorInfo, FiberError};

use crate::acceptance::ln_factorial_sum;

/// Pearson's `sum (x - e)^2 / e`.
pub fn pearson<'a, I>(tables: I, expected: &[f64]) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
{
    discrepancy(tables, expected, 1.0, |x, e| {
        if e == 0.0 {
            if x == 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            (x - e).powi(2) / e
        }
    })
}

/// Likelihood-ratio (deviance) statistic `2 sum x ln(x / e)`.
pub fn likelihood_ratio<'a, I>(tables: I, expected: &[f64]) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
{
    discrepancy(tables, expected, 2.0, |x, e| {
        if x == 0.0 {
            0.0
        } else if e == 0.0 {
            f64::INFINITY
        } else {
            x * (x / e).ln()
        }
    })
}

/// Neyman's `sum (x - e)^2 / x`.
pub fn neyman<'a, I>(tables: I, expected: &[f64]) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
{
    discrepancy(tables, expected, 1.0, |x, e| {
        if x == 0.0 {
            0.0
        } else {
            (x - e).powi(2) / x
        }
    })
}

/// Cressie–Read power divergence `2 / (lambda (lambda + 1)) sum x ((x / e)^lambda - 1)`.
///
/// `lambda = 1` gives Pearson's statistic whenever the observed and expected
/// totals agree. The limits `lambda = 0` and `lambda = -1` are rejected.
pub fn cressie_read<'a, I>(tables: I, expected: &[f64], lambda: f64) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
{
    if !lambda.is_finite() || lambda == 0.0 || lambda == -1.0 {
        return Err(FiberError::Config(
            ErrorInfo::new(
                "cressie-read-lambda",
                "lambda must be finite and differ from 0 and -1",
            )
            .with_context("lambda", lambda)
            .with_hint("use likelihood_ratio for the lambda = 0 limit"),
        ));
    }
    let scale = 2.0 / (lambda * (lambda + 1.0));
    discrepancy(tables, expected, scale, |x, e| {
        if x == 0.0 {
            0.0
        } else if e == 0.0 {
            // (x / e)^lambda -> inf for lambda > 0 and -> 0 for lambda < 0
            if lambda > 0.0 {
                f64::INFINITY
            } else {
                -x
            }
        } else {
            x * ((x / e).powf(lambda) - 1.0)
        }
    })
}

/// Unnormalised hypergeometric weight `exp(-sum ln(x_k!))` of each table.
pub fn unnormalized_probability<'a, I>(tables: I) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
{
    tables
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            check_counts(index, table)?;
            Ok((-ln_factorial_sum(table)).exp())
        })
        .collect()
}

/// Monte Carlo p-value: the fraction of sampled statistics at least as large
/// as the observed one. Returns `None` for an empty sample.
pub fn exceedance_p_value(samples: &[f64], observed: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let tolerance = 1e-7 * observed.abs().max(1.0);
    let exceeding = samples
        .iter()
        .filter(|&&value| value >= observed - tolerance)
        .count();
    Some(exceeding as f64 / samples.len() as f64)
}

fn discrepancy<'a, I, F>(
    tables: I,
    expected: &[f64],
    scale: f64,
    term: F,
) -> Result<Vec<f64>, FiberError>
where
    I: IntoIterator<Item = &'a [i64]>,
    F: Fn(f64, f64) -> f64,
{
    if let Some(cell) = expected
        .iter()
        .position(|&value| !value.is_finite() || value < 0.0)
    {
        return Err(FiberError::Config(
            ErrorInfo::new("invalid-expected", "expected counts must be finite and nonnegative")
                .with_context("cell", cell),
        ));
    }
    tables
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            if table.len() != expected.len() {
                return Err(FiberError::Config(
                    ErrorInfo::new(
                        "expected-length-mismatch",
                        "table and expected table differ in length",
                    )
                    .with_context("table", index)
                    .with_context("cells", table.len())
                    .with_context("expected", expected.len()),
                ));
            }
            check_counts(index, table)?;
            let sum: f64 = table
                .iter()
                .zip(expected)
                .map(|(&count, &e)| term(count as f64, e))
                .sum();
            Ok(scale * sum)
        })
        .collect()
}

fn check_counts(index: usize, table: &[i64]) -> Result<(), FiberError> {
    match table.iter().position(|&count| count < 0) {
        Some(cell) => Err(FiberError::Config(
            ErrorInfo::new("negative-count", "tables must have nonnegative counts")
                .with_context("table", index)
                .with_context("cell", cell),
        )),
        None => Ok(()),
    }
}
