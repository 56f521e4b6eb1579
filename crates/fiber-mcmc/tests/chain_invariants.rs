use fiber_core::{ConstraintMatrix, Fiber, MoveBasis, RngHandle};
use fiber_mcmc::{
    run_chain, sample_hypergeometric_chain, sample_uniform_chain, ChainConfig, ChainInput,
    SisConfig, Strategy, Target,
};

/// Row and column sums of an `rows x cols` table stored row-major.
fn independence_margins(rows: usize, cols: usize) -> ConstraintMatrix {
    let mut matrix = Vec::new();
    for r in 0..rows {
        matrix.push((0..rows * cols).map(|cell| i64::from(cell / cols == r)).collect());
    }
    for c in 0..cols {
        matrix.push((0..rows * cols).map(|cell| i64::from(cell % cols == c)).collect());
    }
    ConstraintMatrix::from_rows(matrix).unwrap()
}

/// Basic 2x2 swap moves of the independence model.
fn independence_moves(rows: usize, cols: usize) -> MoveBasis {
    let mut moves = Vec::new();
    for r in 0..rows {
        for r2 in r + 1..rows {
            for c in 0..cols {
                for c2 in c + 1..cols {
                    let mut column = vec![0; rows * cols];
                    column[r * cols + c] = 1;
                    column[r2 * cols + c2] = 1;
                    column[r * cols + c2] = -1;
                    column[r2 * cols + c] = -1;
                    moves.push(column);
                }
            }
        }
    }
    MoveBasis::from_columns(moves).unwrap()
}

const TABLE: [i64; 6] = [3, 0, 2, 1, 4, 2];

#[test]
fn uniform_chain_keeps_cells_nonnegative_and_total_fixed() {
    let moves = MoveBasis::from_columns(vec![vec![1, -1, 0, 0], vec![0, 0, 1, -1]]).unwrap();
    let mut rng = RngHandle::from_seed(2024);
    let run = sample_uniform_chain(&[5, 5, 5, 5], &moves, 1000, 1, Strategy::Direct, &mut rng)
        .unwrap();

    assert_eq!(run.chain.len(), 1000);
    for state in run.chain.states() {
        assert!(state.iter().all(|&count| count >= 0));
        assert_eq!(state.iter().sum::<i64>(), 20);
    }
    assert!(run.acceptance_rate > 0.0 && run.acceptance_rate <= 1.0);
}

#[test]
fn every_strategy_stays_on_the_fiber() {
    let matrix = independence_margins(2, 3);
    let fiber = Fiber::new(matrix.clone(), matrix.apply(&TABLE)).unwrap();
    let moves = independence_moves(2, 3);

    let combinations = [
        (Target::Hypergeometric, Strategy::Direct),
        (Target::Hypergeometric, Strategy::HitAndRun),
        (Target::Hypergeometric, Strategy::Adaptive),
        (Target::Hypergeometric, Strategy::WeightedSelection),
        (Target::Uniform, Strategy::Direct),
        (Target::Uniform, Strategy::HitAndRun),
        (Target::Uniform, Strategy::WeightedSelection),
    ];
    for (seed, (target, strategy)) in combinations.into_iter().enumerate() {
        let config = ChainConfig {
            iter: 300,
            thin: 2,
            target,
            strategy,
            ..ChainConfig::default()
        };
        let mut rng = RngHandle::from_seed(seed as u64);
        let run = run_chain(&ChainInput::new(&TABLE, &moves), &config, &mut rng).unwrap();

        assert_eq!(run.chain.len(), 300);
        assert_eq!(run.diagnostics.raw_steps, 600);
        for state in run.chain.states() {
            assert!(fiber.contains(state), "{target:?}/{strategy:?} left the fiber: {state:?}");
        }
        assert!((0.0..=1.0).contains(&run.acceptance_rate));
    }
}

#[test]
fn hit_and_run_mixes_over_several_states() {
    let moves = independence_moves(2, 3);
    let mut rng = RngHandle::from_seed(77);
    let run = sample_hypergeometric_chain(
        &TABLE,
        &moves,
        None,
        500,
        1,
        Strategy::HitAndRun,
        false,
        &mut rng,
    )
    .unwrap();
    let distinct = fiber_mcmc::reachable_states(&run.chain);
    assert!(distinct.len() > 5);
}

#[test]
fn weighted_selection_reports_reinforced_weights() {
    let moves = independence_moves(2, 3);
    let mut rng = RngHandle::from_seed(5);
    let run = sample_hypergeometric_chain(
        &TABLE,
        &moves,
        None,
        400,
        1,
        Strategy::WeightedSelection,
        false,
        &mut rng,
    )
    .unwrap();

    let weights = run.diagnostics.move_weights.expect("weighted runs report weights");
    assert_eq!(weights.len(), moves.len());
    assert!(weights.iter().all(|&weight| weight >= 1.0));
    let total: f64 = weights.iter().sum();
    assert_eq!(total, (moves.len() + run.diagnostics.accepted_steps) as f64);
}

#[test]
fn unweighted_runs_do_not_report_weights() {
    let moves = independence_moves(2, 3);
    let mut rng = RngHandle::from_seed(5);
    let run = sample_hypergeometric_chain(
        &TABLE,
        &moves,
        None,
        50,
        1,
        Strategy::Direct,
        false,
        &mut rng,
    )
    .unwrap();
    assert!(run.diagnostics.move_weights.is_none());
}

#[test]
fn certain_restarts_replace_every_proposal() {
    let matrix = independence_margins(2, 3);
    let fiber = Fiber::new(matrix.clone(), matrix.apply(&TABLE)).unwrap();
    let moves = independence_moves(2, 3);
    let config = ChainConfig {
        iter: 100,
        thin: 1,
        target: Target::Hypergeometric,
        strategy: Strategy::Direct,
        sis: SisConfig {
            enabled: true,
            probability: Some(1.0),
            ..SisConfig::default()
        },
        ..ChainConfig::default()
    };
    let mut rng = RngHandle::from_seed(11);
    let input = ChainInput::new(&TABLE, &moves).with_fiber(&fiber);
    let run = run_chain(&input, &config, &mut rng).unwrap();

    assert_eq!(run.diagnostics.sis_restarts, 100);
    assert_eq!(run.diagnostics.line_fallbacks, 0);
    for state in run.chain.states() {
        assert!(fiber.contains(state));
    }
}

#[test]
fn restarts_mix_with_regular_proposals() {
    let matrix = independence_margins(2, 3);
    let fiber = Fiber::new(matrix.clone(), matrix.apply(&TABLE)).unwrap();
    let moves = independence_moves(2, 3);
    let mut rng = RngHandle::from_seed(19);
    let run = sample_hypergeometric_chain(
        &TABLE,
        &moves,
        Some(&fiber),
        2000,
        1,
        Strategy::Direct,
        true,
        &mut rng,
    )
    .unwrap();

    // default restart probability for the hypergeometric target is 0.01
    assert!(run.diagnostics.sis_restarts > 0);
    assert!(run.diagnostics.sis_restarts < 100);
    for state in run.chain.states() {
        assert!(fiber.contains(state));
    }
}

#[test]
fn stuck_lines_are_counted_as_fallbacks() {
    // the only move cannot be applied in either direction from a zero corner
    let moves = MoveBasis::from_columns(vec![vec![1, -1, -1, 1]]).unwrap();
    let mut rng = RngHandle::from_seed(4);
    let run = sample_uniform_chain(&[0, 0, 0, 0], &moves, 20, 1, Strategy::HitAndRun, &mut rng)
        .unwrap();
    assert_eq!(run.diagnostics.line_fallbacks, 20);
    assert_eq!(run.diagnostics.accepted_steps, 0);
    assert_eq!(run.acceptance_rate, 0.0);
    assert!(run.chain.states().all(|state| state == [0, 0, 0, 0]));
}
