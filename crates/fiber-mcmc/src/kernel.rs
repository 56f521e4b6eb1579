use fiber_core::{is_feasible, Chain, ErrorInfo, Fiber, FiberError, MoveBasis, RandomSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::acceptance;
use crate::config::{ChainConfig, SisConfig, Strategy, Target};
use crate::determinism;
use crate::metrics::{AcceptanceAccumulator, RunDiagnostics};
use crate::proposal::ProposalEngine;
use crate::sis::FiberPointSampler;

/// Inputs owned by the caller for the duration of a run.
#[derive(Debug, Clone, Copy)]
pub struct ChainInput<'a> {
    /// Feasible starting table.
    pub initial: &'a [i64],
    /// Moves preserving the sufficient statistics.
    pub moves: &'a MoveBasis,
    /// Constraint system; required when restarts are enabled.
    pub fiber: Option<&'a Fiber>,
}

impl<'a> ChainInput<'a> {
    /// Input without a constraint system.
    pub fn new(initial: &'a [i64], moves: &'a MoveBasis) -> Self {
        Self {
            initial,
            moves,
            fiber: None,
        }
    }

    /// Attaches the constraint system used for restarts.
    pub fn with_fiber(mut self, fiber: &'a Fiber) -> Self {
        self.fiber = Some(fiber);
        self
    }
}

/// Result of a sampler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRun {
    /// Thinned states, one per outer iteration.
    pub chain: Chain,
    /// Time-averaged Metropolis acceptance probability.
    pub acceptance_rate: f64,
    /// Counters collected during the run.
    pub diagnostics: RunDiagnostics,
}

/// Runs a Metropolis chain over the fiber with the supplied randomness.
pub fn run_chain<R: RandomSource + ?Sized>(
    input: &ChainInput<'_>,
    config: &ChainConfig,
    rng: &mut R,
) -> Result<ChainRun, FiberError> {
    validate_input(input, config)?;
    let sampler = match (config.sis.enabled, input.fiber) {
        (true, Some(fiber)) => Some(
            FiberPointSampler::new(fiber)?.with_max_search_nodes(config.sis.max_search_nodes),
        ),
        _ => None,
    };
    let restart_probability = config.sis.probability_for(config.target);

    info!(
        cells = input.initial.len(),
        moves = input.moves.len(),
        iter = config.iter,
        thin = config.thin,
        target = config.target.as_str(),
        strategy = config.strategy.as_str(),
        sis = sampler.is_some(),
        "starting fiber chain"
    );

    let total_steps = config.total_steps();
    let mut engine = ProposalEngine::new(input.moves, config.strategy);
    let mut accumulator = AcceptanceAccumulator::new(total_steps);
    let mut diagnostics = RunDiagnostics {
        raw_steps: total_steps,
        ..RunDiagnostics::default()
    };
    let mut current = input.initial.to_vec();
    let mut chain = Chain::with_capacity(current.len(), config.iter);

    for _ in 0..config.iter {
        for _ in 0..config.thin {
            let restart = match &sampler {
                Some(sampler) if rng.draw_uniform() < restart_probability => {
                    Some(sampler.sample(rng)?)
                }
                _ => None,
            };
            let (candidate, move_index) = match restart {
                Some(table) => {
                    diagnostics.sis_restarts += 1;
                    debug!(restarts = diagnostics.sis_restarts, "sis restart proposed");
                    (table, None)
                }
                None => {
                    let proposal = engine.propose(&current, rng)?;
                    if proposal.fallback {
                        diagnostics.line_fallbacks += 1;
                    }
                    (proposal.candidate, Some(proposal.move_index))
                }
            };

            let (accepted, probability) =
                acceptance::attempt(config.target, &current, &candidate, rng);
            accumulator.record(probability);
            if accepted {
                current = candidate;
                diagnostics.accepted_steps += 1;
                if let Some(move_index) = move_index {
                    engine.reinforce(move_index);
                }
            }
        }
        debug_assert!(is_feasible(&current));
        chain.push(&current);
    }

    if config.strategy == Strategy::WeightedSelection {
        diagnostics.move_weights = Some(engine.weights().as_slice().to_vec());
    }
    let acceptance_rate = accumulator.value();
    info!(
        acceptance_rate,
        accepted = diagnostics.accepted_steps,
        sis_restarts = diagnostics.sis_restarts,
        line_fallbacks = diagnostics.line_fallbacks,
        "fiber chain finished"
    );
    Ok(ChainRun {
        chain,
        acceptance_rate,
        diagnostics,
    })
}

/// Runs a chain seeded from the configuration's seed policy.
pub fn run_seeded(input: &ChainInput<'_>, config: &ChainConfig) -> Result<ChainRun, FiberError> {
    let mut rng = determinism::chain_rng(&config.seed_policy);
    run_chain(input, config, &mut rng)
}

/// Samples the hypergeometric (conditional multinomial) law on the fiber.
///
/// `fiber` is only consulted when `sis_enabled` is set, in which case it is required.
#[allow(clippy::too_many_arguments)]
pub fn sample_hypergeometric_chain<R: RandomSource + ?Sized>(
    current: &[i64],
    moves: &MoveBasis,
    fiber: Option<&Fiber>,
    iter: usize,
    thin: usize,
    strategy: Strategy,
    sis_enabled: bool,
    rng: &mut R,
) -> Result<ChainRun, FiberError> {
    let config = ChainConfig {
        iter,
        thin,
        target: Target::Hypergeometric,
        strategy,
        sis: SisConfig {
            enabled: sis_enabled,
            ..SisConfig::default()
        },
        ..ChainConfig::default()
    };
    let input = ChainInput {
        initial: current,
        moves,
        fiber,
    };
    run_chain(&input, &config, rng)
}

/// Samples the uniform law on the fiber with direct or hit-and-run proposals.
pub fn sample_uniform_chain<R: RandomSource + ?Sized>(
    current: &[i64],
    moves: &MoveBasis,
    iter: usize,
    thin: usize,
    strategy: Strategy,
    rng: &mut R,
) -> Result<ChainRun, FiberError> {
    if !matches!(strategy, Strategy::Direct | Strategy::HitAndRun) {
        return Err(FiberError::Config(
            ErrorInfo::new(
                "strategy-target-mismatch",
                "uniform sampling supports direct and hit-and-run proposals",
            )
            .with_context("strategy", strategy.as_str()),
        ));
    }
    let config = ChainConfig {
        iter,
        thin,
        target: Target::Uniform,
        strategy,
        ..ChainConfig::default()
    };
    run_chain(&ChainInput::new(current, moves), &config, rng)
}

/// Checks that `moves` act on tables shaped like `table`.
pub(crate) fn check_move_length(table: &[i64], moves: &MoveBasis) -> Result<(), FiberError> {
    if table.len() != moves.cells() {
        return Err(FiberError::Config(
            ErrorInfo::new("move-length-mismatch", "moves and table differ in length")
                .with_context("table", table.len())
                .with_context("moves", moves.cells()),
        ));
    }
    Ok(())
}

/// Checks dimensions and feasibility before any randomness is consumed.
fn validate_input(input: &ChainInput<'_>, config: &ChainConfig) -> Result<(), FiberError> {
    config.validate()?;
    check_move_length(input.initial, input.moves)?;
    let cells = input.initial.len();
    if let Some(cell) = input.initial.iter().position(|&count| count < 0) {
        return Err(FiberError::Config(
            ErrorInfo::new("negative-initial-table", "initial table has a negative cell")
                .with_context("cell", cell),
        ));
    }
    match (config.sis.enabled, input.fiber) {
        (true, None) => {
            return Err(FiberError::Config(
                ErrorInfo::new("sis-without-fiber", "restarts need the constraint system")
                    .with_hint("attach the constraint matrix and sufficient statistics"),
            ));
        }
        (sis_enabled, Some(fiber)) => {
            if fiber.cells() != cells {
                return Err(FiberError::Config(
                    ErrorInfo::new(
                        "constraint-length-mismatch",
                        "constraint matrix and table differ in length",
                    )
                    .with_context("table", cells)
                    .with_context("constraints", fiber.cells()),
                ));
            }
            if sis_enabled && !fiber.contains(input.initial) {
                return Err(FiberError::config(
                    "initial-off-fiber",
                    "initial table does not reproduce the sufficient statistics",
                ));
            }
        }
        (false, None) => {}
    }
    Ok(())
}
