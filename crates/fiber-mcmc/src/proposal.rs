use fiber_core::{FiberError, MoveBasis, RandomSource, Table};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::acceptance;
use crate::config::Strategy;

/// Inclusive range of step multipliers along a move direction.
///
/// For a nonnegative current table every `t` in `[lower, upper]` keeps
/// `current + t * direction` nonnegative, and the range contains zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// Smallest admissible multiplier.
    pub lower: i64,
    /// Largest admissible multiplier.
    pub upper: i64,
}

impl LineRange {
    /// Returns `true` when no nonzero multiplier can be drawn from the range.
    pub fn is_degenerate(&self) -> bool {
        self.lower > self.upper || (self.lower == 0 && self.upper == 0)
    }

    /// Width `upper - lower` of the range, zero when empty.
    pub fn width(&self) -> u64 {
        self.upper.saturating_sub(self.lower).max(0) as u64
    }

    /// Returns `true` when `step` lies inside the range.
    pub fn contains(&self, step: i64) -> bool {
        self.lower <= step && step <= self.upper
    }
}

/// Step multiplier chosen along a line, with the degenerate-range flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStep {
    /// Multiplier applied to the move; never zero.
    pub step: i64,
    /// Whether the range was degenerate and a unit step was used instead.
    pub fallback: bool,
}

/// Candidate table produced by one proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Proposed table; may contain negative cells.
    pub candidate: Table,
    /// Column of the basis the proposal moved along.
    pub move_index: usize,
    /// Whether a degenerate line range forced the unit-step fallback.
    pub fallback: bool,
}

/// Computes the feasible multiplier range of `direction` from `current`.
///
/// Only coordinates where the direction is nonzero constrain the line. A
/// side left unconstrained (every nonzero coordinate has the same sign) is
/// mirrored from the constrained side, at least one unit long. Both
/// endpoints are re-validated: an infeasible lower endpoint clamps `lower`
/// to 1, an infeasible upper endpoint clamps `upper` to -1.
pub fn line_range(current: &[i64], direction: &[i64]) -> LineRange {
    debug_assert_eq!(current.len(), direction.len());
    let mut lower: Option<i64> = None;
    let mut upper: Option<i64> = None;
    for (&count, &delta) in current.iter().zip(direction) {
        if delta > 0 {
            // t >= ceil(-count / delta)
            let bound = -count.div_euclid(delta);
            lower = Some(lower.map_or(bound, |lb| lb.max(bound)));
        } else if delta < 0 {
            // t <= floor(count / |delta|)
            let bound = count.div_euclid(-delta);
            upper = Some(upper.map_or(bound, |ub| ub.min(bound)));
        }
    }
    let (mut lower, mut upper) = match (lower, upper) {
        (Some(lb), Some(ub)) => (lb, ub),
        (Some(lb), None) => (lb, lb.abs().max(1)),
        (None, Some(ub)) => (-(ub.abs().max(1)), ub),
        (None, None) => (0, 0),
    };
    if !endpoint_feasible(current, direction, lower) {
        lower = 1;
    }
    if !endpoint_feasible(current, direction, upper) {
        upper = -1;
    }
    LineRange { lower, upper }
}

fn endpoint_feasible(current: &[i64], direction: &[i64], step: i64) -> bool {
    current
        .iter()
        .zip(direction)
        .all(|(&count, &delta)| count + step * delta >= 0)
}

/// Draws a nonzero multiplier uniformly from `range`, or a unit step of random
/// sign when the range is degenerate.
pub fn draw_line_step<R: RandomSource + ?Sized>(range: &LineRange, rng: &mut R) -> LineStep {
    if range.is_degenerate() {
        return LineStep {
            step: unit_step(rng),
            fallback: true,
        };
    }
    let step = if range.contains(0) {
        let draw = rng.draw_uniform_int(range.lower, range.upper - 1);
        if draw >= 0 {
            draw + 1
        } else {
            draw
        }
    } else {
        rng.draw_uniform_int(range.lower, range.upper)
    };
    LineStep {
        step,
        fallback: false,
    }
}

fn unit_step<R: RandomSource + ?Sized>(rng: &mut R) -> i64 {
    if rng.draw_uniform_int(0, 1) == 0 {
        -1
    } else {
        1
    }
}

/// Returns `current + step * direction`.
pub fn displace(current: &[i64], direction: &[i64], step: i64) -> Table {
    current
        .iter()
        .zip(direction)
        .map(|(&count, &delta)| count + step * delta)
        .collect()
}

/// Hit-and-run candidate: a uniformly drawn feasible multiple of `direction`.
pub fn hit_and_run<R: RandomSource + ?Sized>(
    current: &[i64],
    direction: &[i64],
    rng: &mut R,
) -> (Table, LineStep) {
    let range = line_range(current, direction);
    let line_step = draw_line_step(&range, rng);
    (displace(current, direction, line_step.step), line_step)
}

/// Adaptive candidate: the end point of a short hypergeometric Metropolis walk
/// of `upper - lower` unit steps along `direction`.
///
/// Degenerate ranges use the same unit-step fallback as hit-and-run.
pub fn adaptive_line_search<R: RandomSource + ?Sized>(
    current: &[i64],
    direction: &[i64],
    rng: &mut R,
) -> (Table, bool) {
    let range = line_range(current, direction);
    if range.is_degenerate() {
        let step = unit_step(rng);
        return (displace(current, direction, step), true);
    }
    let mut walker = current.to_vec();
    for _ in 0..range.width() {
        let step = unit_step(rng);
        let proposal = displace(&walker, direction, step);
        let probability = acceptance::hypergeometric_probability(&walker, &proposal);
        if rng.draw_uniform() < probability {
            walker = proposal;
        }
    }
    (walker, false)
}

/// Move selection weights reinforced by accepted moves.
///
/// Selection is proportional to the weights, so no separate normaliser is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveWeights {
    weights: Vec<f64>,
}

impl MoveWeights {
    /// Uniform weights of one per move.
    pub fn uniform(num_moves: usize) -> Self {
        Self {
            weights: vec![1.0; num_moves],
        }
    }

    /// Increments the weight of `move_index`.
    pub fn reinforce(&mut self, move_index: usize) {
        self.weights[move_index] += 1.0;
    }

    /// Current weights in move order.
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }
}

/// Turns the current table and a selected move into a candidate table.
#[derive(Debug, Clone)]
pub struct ProposalEngine<'a> {
    moves: &'a MoveBasis,
    strategy: Strategy,
    weights: MoveWeights,
}

impl<'a> ProposalEngine<'a> {
    /// Creates an engine over `moves` using `strategy` for every proposal.
    pub fn new(moves: &'a MoveBasis, strategy: Strategy) -> Self {
        Self {
            moves,
            strategy,
            weights: MoveWeights::uniform(moves.len()),
        }
    }

    /// Strategy used by the engine.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Move selection weights; only reinforced under weighted selection.
    pub fn weights(&self) -> &MoveWeights {
        &self.weights
    }

    /// Selects a move and builds the candidate table.
    pub fn propose<R: RandomSource + ?Sized>(
        &self,
        current: &[i64],
        rng: &mut R,
    ) -> Result<Proposal, FiberError> {
        debug_assert_eq!(current.len(), self.moves.cells());
        let move_index = match self.strategy {
            Strategy::WeightedSelection => rng.draw_categorical(self.weights.as_slice())?,
            _ => rng.draw_uniform_int(0, self.moves.len() as i64 - 1) as usize,
        };
        let direction = self.moves.get(move_index);
        let (candidate, fallback) = match self.strategy {
            Strategy::Direct | Strategy::WeightedSelection => {
                (displace(current, direction, 1), false)
            }
            Strategy::HitAndRun => {
                let (candidate, line_step) = hit_and_run(current, direction, rng);
                (candidate, line_step.fallback)
            }
            Strategy::Adaptive => adaptive_line_search(current, direction, rng),
        };
        if fallback {
            trace!(
                move_index,
                strategy = self.strategy.as_str(),
                "degenerate line range, using unit step"
            );
        }
        Ok(Proposal {
            candidate,
            move_index,
            fallback,
        })
    }

    /// Records that the proposal along `move_index` was accepted.
    pub fn reinforce(&mut self, move_index: usize) {
        if self.strategy == Strategy::WeightedSelection {
            self.weights.reinforce(move_index);
        }
    }
}
