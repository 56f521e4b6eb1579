mod common;

use common::{Draw, ScriptedSource};
use fiber_core::{ConstraintMatrix, Fiber, MoveBasis};
use fiber_mcmc::{run_chain, ChainConfig, ChainInput, SisConfig, Strategy, Target};

fn swap_moves() -> MoveBasis {
    MoveBasis::from_columns(vec![vec![1, -1], vec![-1, 1]]).unwrap()
}

fn single_step(target: Target, strategy: Strategy, iter: usize) -> ChainConfig {
    ChainConfig {
        iter,
        thin: 1,
        target,
        strategy,
        ..ChainConfig::default()
    }
}

#[test]
fn hit_and_run_draws_move_then_step_then_transition() {
    let moves = swap_moves();
    // move 0; range [-2, 2] without zero maps draw 1 to step 2
    let mut rng = ScriptedSource::new(&[0.5], &[0, 1]);
    let run = run_chain(
        &ChainInput::new(&[2, 2], &moves),
        &single_step(Target::Uniform, Strategy::HitAndRun, 1),
        &mut rng,
    )
    .unwrap();

    assert_eq!(rng.log, vec![Draw::Int(0, 1), Draw::Int(-2, 1), Draw::Uniform]);
    assert!(rng.is_exhausted());
    assert_eq!(run.chain.to_rows(), vec![vec![4, 0]]);
    assert_eq!(run.diagnostics.accepted_steps, 1);
}

#[test]
fn adaptive_draws_a_sign_and_a_uniform_per_inner_step() {
    let moves = swap_moves();
    // range [-1, 1] gives two inner steps:
    //   +1 to (2, 0) with p = 1/2, accepted by 0.2
    //   +1 to (3, -1) with p = 0, the uniform is still drawn
    // the outer step moves (1, 1) -> (2, 0) with p = 1/2, accepted by 0.1
    let mut rng = ScriptedSource::new(&[0.2, 0.0, 0.1], &[0, 1, 1]);
    let run = run_chain(
        &ChainInput::new(&[1, 1], &moves),
        &single_step(Target::Hypergeometric, Strategy::Adaptive, 1),
        &mut rng,
    )
    .unwrap();

    assert_eq!(
        rng.log,
        vec![
            Draw::Int(0, 1),
            Draw::Int(0, 1),
            Draw::Uniform,
            Draw::Int(0, 1),
            Draw::Uniform,
            Draw::Uniform,
        ]
    );
    assert!(rng.is_exhausted());
    assert_eq!(run.chain.to_rows(), vec![vec![2, 0]]);
    assert!((run.acceptance_rate - 0.5).abs() < 1e-12);
}

#[test]
fn weighted_selection_draws_one_categorical_per_step() {
    let moves = swap_moves();
    // (1, 1) -> (0, 2) with p = 1/2, then back with p = 1
    let mut rng = ScriptedSource::new(&[0.4, 0.99], &[1, 0]);
    let run = run_chain(
        &ChainInput::new(&[1, 1], &moves),
        &single_step(Target::Hypergeometric, Strategy::WeightedSelection, 2),
        &mut rng,
    )
    .unwrap();

    assert_eq!(
        rng.log,
        vec![
            Draw::Categorical(vec![1.0, 1.0]),
            Draw::Uniform,
            Draw::Categorical(vec![1.0, 2.0]),
            Draw::Uniform,
        ]
    );
    assert!(rng.is_exhausted());
    assert_eq!(run.chain.to_rows(), vec![vec![0, 2], vec![1, 1]]);
    assert_eq!(run.diagnostics.move_weights, Some(vec![2.0, 2.0]));
}

#[test]
fn restart_gate_comes_first_and_restarts_leave_weights_alone() {
    let matrix = ConstraintMatrix::from_rows(vec![
        vec![1, 1, 0, 0],
        vec![0, 0, 1, 1],
        vec![1, 0, 1, 0],
        vec![0, 1, 0, 1],
    ])
    .unwrap();
    let fiber = Fiber::new(matrix, vec![2, 2, 2, 2]).unwrap();
    let moves = MoveBasis::from_columns(vec![vec![1, -1, -1, 1], vec![-1, 1, 1, -1]]).unwrap();
    let config = ChainConfig {
        sis: SisConfig {
            enabled: true,
            probability: Some(0.5),
            ..SisConfig::default()
        },
        ..single_step(Target::Hypergeometric, Strategy::WeightedSelection, 2)
    };

    // step 1: gate 0.1 restarts; the sampler keeps the cell order (3, 2, 1
    // swap in place), puts 2 in cell 0, forces cells 1 and 2 to 0 and puts
    // 2 in cell 3; (2, 0, 0, 2) is accepted with p = 1/4 by 0.1
    // step 2: gate 0.9 proposes move 1 back to (1, 1, 1, 1), accepted by 0.5
    let mut rng = ScriptedSource::new(&[0.1, 0.1, 0.9, 0.5], &[3, 2, 1, 2, 2, 1]);
    let input = ChainInput::new(&[1, 1, 1, 1], &moves).with_fiber(&fiber);
    let run = run_chain(&input, &config, &mut rng).unwrap();

    assert_eq!(
        rng.log,
        vec![
            Draw::Uniform,
            Draw::Int(0, 3),
            Draw::Int(0, 2),
            Draw::Int(0, 1),
            Draw::Int(0, 2),
            Draw::Int(0, 2),
            Draw::Uniform,
            Draw::Uniform,
            Draw::Categorical(vec![1.0, 1.0]),
            Draw::Uniform,
        ]
    );
    assert!(rng.is_exhausted());
    assert_eq!(run.chain.to_rows(), vec![vec![2, 0, 0, 2], vec![1, 1, 1, 1]]);
    assert_eq!(run.diagnostics.sis_restarts, 1);
    assert_eq!(run.diagnostics.accepted_steps, 2);
    assert_eq!(run.diagnostics.move_weights, Some(vec![1.0, 2.0]));
}
