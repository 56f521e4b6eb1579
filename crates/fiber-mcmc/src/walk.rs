use fiber_core::{Chain, FiberError, MoveBasis, RandomSource, Table};
use indexmap::IndexSet;
use tracing::debug;

use crate::kernel::check_move_length;
use crate::proposal::displace;

/// Applies uniformly selected moves unconditionally, recording every `thin`-th state.
///
/// There is no acceptance step: recorded tables may leave the nonnegative
/// orthant. The walk traces which tables the move graph reaches; it does not
/// sample any distribution on the fiber.
pub fn pure_walk<R: RandomSource + ?Sized>(
    current: &[i64],
    moves: &MoveBasis,
    iter: usize,
    thin: usize,
    rng: &mut R,
) -> Result<Chain, FiberError> {
    if iter == 0 {
        return Err(FiberError::config("zero-iter", "iter must be positive"));
    }
    if thin == 0 {
        return Err(FiberError::config("zero-thin", "thin must be positive"));
    }
    check_move_length(current, moves)?;

    let last_move = moves.len() as i64 - 1;
    let mut state = current.to_vec();
    let mut chain = Chain::with_capacity(state.len(), iter);
    for _ in 0..iter {
        for _ in 0..thin {
            let move_index = rng.draw_uniform_int(0, last_move) as usize;
            state = displace(&state, moves.get(move_index), 1);
        }
        chain.push(&state);
    }
    debug!(iter, thin, "pure walk finished");
    Ok(chain)
}

/// Distinct tables of a chain in first-visit order.
pub fn reachable_states(chain: &Chain) -> IndexSet<Table> {
    chain.states().map(<[i64]>::to_vec).collect()
}
