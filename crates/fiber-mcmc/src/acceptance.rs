use fiber_core::{is_feasible, RandomSource};
use statrs::function::gamma::ln_gamma;

use crate::config::Target;

/// `ln(x!)` for a nonnegative count.
pub fn ln_factorial(count: i64) -> f64 {
    ln_gamma(count as f64 + 1.0)
}

/// Sum of `ln(x_k!)` over the cells of a table.
pub fn ln_factorial_sum(table: &[i64]) -> f64 {
    table.iter().map(|&count| ln_factorial(count)).sum()
}

/// Metropolis acceptance for the hypergeometric target,
/// `min(1, prod(current_k!) / prod(candidate_k!))`, evaluated in log space.
///
/// Cells that agree between the two tables cancel and are skipped.
pub fn hypergeometric_probability(current: &[i64], candidate: &[i64]) -> f64 {
    debug_assert_eq!(current.len(), candidate.len());
    if !is_feasible(candidate) {
        return 0.0;
    }
    let log_ratio: f64 = current
        .iter()
        .zip(candidate)
        .filter(|(from, to)| from != to)
        .map(|(&from, &to)| ln_factorial(from) - ln_factorial(to))
        .sum();
    log_ratio.exp().min(1.0)
}

/// Acceptance for the uniform target: the feasibility indicator.
pub fn uniform_probability(candidate: &[i64]) -> f64 {
    if is_feasible(candidate) {
        1.0
    } else {
        0.0
    }
}

/// Acceptance probability of moving from `current` to `candidate` under `target`.
pub fn acceptance_probability(target: Target, current: &[i64], candidate: &[i64]) -> f64 {
    match target {
        Target::Hypergeometric => hypergeometric_probability(current, candidate),
        Target::Uniform => uniform_probability(candidate),
    }
}

/// Computes the acceptance probability and consumes one uniform draw to decide the step.
pub fn attempt<R: RandomSource + ?Sized>(
    target: Target,
    current: &[i64],
    candidate: &[i64],
    rng: &mut R,
) -> (bool, f64) {
    let probability = acceptance_probability(target, current, candidate);
    let draw = rng.draw_uniform();
    (draw < probability, probability)
}
