use fiber_core::{ConstraintMatrix, ErrorInfo, Fiber, FiberError, RandomSource, Table};
use tracing::debug;

use crate::config::SisConfig;

/// Draws single tables from a fiber `{ x >= 0 : A x = b }`.
///
/// Cells are filled one at a time in a random order. Each cell takes a value
/// between zero and the largest count its rows can still absorb, tried in
/// cyclic order from a uniformly drawn start. When a row can no longer be
/// completed the search backtracks. The search is exhaustive, so running out
/// of candidates proves the fiber empty; the node budget caps the work spent
/// on large fibers.
#[derive(Debug, Clone)]
pub struct FiberPointSampler<'a> {
    fiber: &'a Fiber,
    max_search_nodes: usize,
    /// Rows with a positive coefficient, per cell.
    cover: Vec<Vec<(usize, i64)>>,
}

impl<'a> FiberPointSampler<'a> {
    /// Prepares a sampler, checking that the fiber is bounded.
    ///
    /// The constraint matrix must be nonnegative and every cell must appear
    /// with a positive coefficient in some row.
    pub fn new(fiber: &'a Fiber) -> Result<Self, FiberError> {
        let cover = cell_cover(fiber.matrix())?;
        Ok(Self {
            fiber,
            max_search_nodes: SisConfig::default().max_search_nodes,
            cover,
        })
    }

    /// Overrides the node budget of the search.
    pub fn with_max_search_nodes(mut self, max_search_nodes: usize) -> Self {
        self.max_search_nodes = max_search_nodes.max(1);
        self
    }

    /// Returns one table of the fiber.
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Result<Table, FiberError> {
        let margins = self.fiber.margins();
        if let Some((row, &value)) = margins.iter().enumerate().find(|&(_, &v)| v < 0) {
            return Err(FiberError::Feasibility(
                ErrorInfo::new("negative-margin", "sufficient statistic is negative")
                    .with_context("row", row)
                    .with_context("value", value),
            ));
        }

        let cells = self.cover.len();
        let mut open = vec![0usize; margins.len()];
        for rows in &self.cover {
            for &(row, _) in rows {
                open[row] += 1;
            }
        }
        if let Some(row) = (0..margins.len()).find(|&row| open[row] == 0 && margins[row] != 0) {
            return Err(FiberError::Feasibility(empty_fiber().with_context("row", row)));
        }

        let order = shuffled_cells(cells, rng);
        let mut search = Search {
            cover: &self.cover,
            order: &order,
            remaining: margins.to_vec(),
            open,
            table: vec![0; cells],
            nodes: 0,
            budget: self.max_search_nodes,
        };
        match search.fill(0, rng) {
            Outcome::Found => {
                debug!(nodes = search.nodes, cells, "fiber point found");
                debug_assert!(self.fiber.contains(&search.table));
                Ok(search.table)
            }
            Outcome::Exhausted => {
                debug!(nodes = search.nodes, "fiber point search exhausted");
                Err(FiberError::Feasibility(empty_fiber()))
            }
            Outcome::OutOfBudget => {
                debug!(nodes = search.nodes, "fiber point search over budget");
                Err(FiberError::Feasibility(
                    ErrorInfo::new(
                        "search-budget-exhausted",
                        "fiber point search ran out of nodes before finding a table",
                    )
                    .with_context("max_search_nodes", self.max_search_nodes)
                    .with_hint("raise sis.max_search_nodes"),
                ))
            }
        }
    }
}

/// Samples one table of the fiber `{ x >= 0 : matrix x = margins }`.
pub fn sample_one_fiber_point<R: RandomSource + ?Sized>(
    matrix: &ConstraintMatrix,
    margins: &[i64],
    rng: &mut R,
) -> Result<Table, FiberError> {
    let fiber = Fiber::new(matrix.clone(), margins.to_vec())?;
    FiberPointSampler::new(&fiber)?.sample(rng)
}

fn empty_fiber() -> ErrorInfo {
    ErrorInfo::new("empty-fiber", "no nonnegative table reproduces the margins")
}

fn cell_cover(matrix: &ConstraintMatrix) -> Result<Vec<Vec<(usize, i64)>>, FiberError> {
    let mut cover = vec![Vec::new(); matrix.cells()];
    for (row_index, row) in matrix.rows().enumerate() {
        for (cell, &coefficient) in row.iter().enumerate() {
            if coefficient < 0 {
                return Err(FiberError::Config(
                    ErrorInfo::new(
                        "negative-constraint",
                        "fiber sampling needs a nonnegative constraint matrix",
                    )
                    .with_context("row", row_index)
                    .with_context("cell", cell),
                ));
            }
            if coefficient > 0 {
                cover[cell].push((row_index, coefficient));
            }
        }
    }
    if let Some(cell) = cover.iter().position(Vec::is_empty) {
        return Err(FiberError::Config(
            ErrorInfo::new("unbounded-cell", "cell is not constrained by any margin")
                .with_context("cell", cell),
        ));
    }
    Ok(cover)
}

fn shuffled_cells<R: RandomSource + ?Sized>(cells: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cells).collect();
    for index in (1..cells).rev() {
        let swap = rng.draw_uniform_int(0, index as i64) as usize;
        order.swap(index, swap);
    }
    order
}

enum Outcome {
    Found,
    Exhausted,
    OutOfBudget,
}

struct Search<'s> {
    cover: &'s [Vec<(usize, i64)>],
    order: &'s [usize],
    remaining: Vec<i64>,
    /// Unassigned cells with a positive coefficient, per row.
    open: Vec<usize>,
    table: Vec<i64>,
    nodes: usize,
    budget: usize,
}

impl Search<'_> {
    fn fill<R: RandomSource + ?Sized>(&mut self, depth: usize, rng: &mut R) -> Outcome {
        let Some(&cell) = self.order.get(depth) else {
            return Outcome::Found;
        };
        let cover = self.cover;
        let rows = &cover[cell];
        let capacity = rows
            .iter()
            .map(|&(row, coefficient)| self.remaining[row] / coefficient)
            .min()
            .unwrap_or(0);
        for &(row, _) in rows {
            self.open[row] -= 1;
        }

        let start = rng.draw_uniform_int(0, capacity);
        let mut outcome = Outcome::Exhausted;
        for offset in 0..=capacity {
            if self.nodes >= self.budget {
                outcome = Outcome::OutOfBudget;
                break;
            }
            self.nodes += 1;
            let value = (start + offset) % (capacity + 1);
            if self.assign(cell, value) {
                match self.fill(depth + 1, rng) {
                    Outcome::Found => return Outcome::Found,
                    Outcome::OutOfBudget => {
                        self.unassign(cell, value);
                        outcome = Outcome::OutOfBudget;
                        break;
                    }
                    Outcome::Exhausted => {}
                }
            }
            self.unassign(cell, value);
        }

        for &(row, _) in rows {
            self.open[row] += 1;
        }
        outcome
    }

    /// Places `value` in `cell`; returns `false` if a closed row is left unmatched.
    fn assign(&mut self, cell: usize, value: i64) -> bool {
        self.table[cell] = value;
        let mut consistent = true;
        for &(row, coefficient) in &self.cover[cell] {
            self.remaining[row] -= coefficient * value;
            if self.open[row] == 0 && self.remaining[row] != 0 {
                consistent = false;
            }
        }
        consistent
    }

    fn unassign(&mut self, cell: usize, value: i64) {
        self.table[cell] = 0;
        for &(row, coefficient) in &self.cover[cell] {
            self.remaining[row] += coefficient * value;
        }
    }
}
