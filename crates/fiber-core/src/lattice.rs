use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, FiberError};

/// Cell counts of a contingency table, flattened in a fixed cell order.
pub type Table = Vec<i64>;

/// Returns `true` when every cell count is nonnegative.
pub fn is_feasible(table: &[i64]) -> bool {
    table.iter().all(|&count| count >= 0)
}

/// Columns of integer moves preserving the sufficient statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBasis {
    cells: usize,
    moves: Vec<Vec<i64>>,
}

impl MoveBasis {
    /// Builds a basis from its columns, one move per entry.
    pub fn from_columns(moves: Vec<Vec<i64>>) -> Result<Self, FiberError> {
        let Some(first) = moves.first() else {
            return Err(FiberError::Config(
                ErrorInfo::new("empty-move-basis", "move basis contains no moves")
                    .with_hint("supply at least one move column"),
            ));
        };
        let cells = first.len();
        if cells == 0 {
            return Err(FiberError::config(
                "empty-move",
                "moves must have at least one cell",
            ));
        }
        if let Some((index, bad)) = moves.iter().enumerate().find(|(_, m)| m.len() != cells) {
            return Err(FiberError::Config(
                ErrorInfo::new("move-length-mismatch", "moves differ in length")
                    .with_context("expected", cells)
                    .with_context("move", index)
                    .with_context("actual", bad.len()),
            ));
        }
        Ok(Self { cells, moves })
    }

    /// Builds a basis from an `cells x num_moves` matrix stored column-major.
    pub fn from_column_major(cells: usize, data: &[i64]) -> Result<Self, FiberError> {
        if cells == 0 || data.len() % cells != 0 {
            return Err(FiberError::Config(
                ErrorInfo::new("move-matrix-shape", "matrix data does not tile the cell count")
                    .with_context("cells", cells)
                    .with_context("entries", data.len()),
            ));
        }
        Self::from_columns(data.chunks_exact(cells).map(<[i64]>::to_vec).collect())
    }

    /// Number of cells each move spans.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Number of moves in the basis.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Always `false` for a constructed basis; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Move at `index`.
    pub fn get(&self, index: usize) -> &[i64] {
        &self.moves[index]
    }

    /// Iterates the moves in column order.
    pub fn iter(&self) -> impl Iterator<Item = &[i64]> + '_ {
        self.moves.iter().map(Vec::as_slice)
    }
}

/// Design matrix `A` of a linear model, one row per sufficient statistic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintMatrix {
    cells: usize,
    rows: Vec<Vec<i64>>,
}

impl ConstraintMatrix {
    /// Builds the matrix from its rows.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, FiberError> {
        let Some(first) = rows.first() else {
            return Err(FiberError::config(
                "empty-constraint-matrix",
                "constraint matrix has no rows",
            ));
        };
        let cells = first.len();
        if let Some((index, bad)) = rows.iter().enumerate().find(|(_, row)| row.len() != cells) {
            return Err(FiberError::Config(
                ErrorInfo::new("constraint-row-mismatch", "constraint rows differ in length")
                    .with_context("expected", cells)
                    .with_context("row", index)
                    .with_context("actual", bad.len()),
            ));
        }
        Ok(Self { cells, rows })
    }

    /// Number of table cells (columns of `A`).
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Number of sufficient statistics (rows of `A`).
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Iterates the rows of the matrix.
    pub fn rows(&self) -> impl Iterator<Item = &[i64]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Computes `A * table`.
    pub fn apply(&self, table: &[i64]) -> Vec<i64> {
        debug_assert_eq!(table.len(), self.cells);
        self.rows
            .iter()
            .map(|row| row.iter().zip(table).map(|(a, x)| a * x).sum())
            .collect()
    }
}

/// The set `{ x >= 0 : A x = b }` described by a design matrix and its margins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fiber {
    matrix: ConstraintMatrix,
    margins: Vec<i64>,
}

impl Fiber {
    /// Pairs a constraint matrix with the sufficient statistics it must reproduce.
    pub fn new(matrix: ConstraintMatrix, margins: Vec<i64>) -> Result<Self, FiberError> {
        if margins.len() != matrix.num_rows() {
            return Err(FiberError::Config(
                ErrorInfo::new(
                    "margin-length-mismatch",
                    "sufficient statistics do not match the constraint rows",
                )
                .with_context("rows", matrix.num_rows())
                .with_context("margins", margins.len()),
            ));
        }
        Ok(Self { matrix, margins })
    }

    /// Design matrix `A`.
    pub fn matrix(&self) -> &ConstraintMatrix {
        &self.matrix
    }

    /// Sufficient statistics `b`.
    pub fn margins(&self) -> &[i64] {
        &self.margins
    }

    /// Number of cells in tables of this fiber.
    pub fn cells(&self) -> usize {
        self.matrix.cells()
    }

    /// Returns `true` when `table` is nonnegative and reproduces the margins.
    pub fn contains(&self, table: &[i64]) -> bool {
        table.len() == self.cells()
            && is_feasible(table)
            && self.matrix.apply(table) == self.margins
    }
}

/// Thinned states recorded by a sampler run, stored contiguously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    cells: usize,
    states: Vec<i64>,
}

impl Chain {
    /// Allocates storage for `capacity` states of `cells` cells each.
    pub fn with_capacity(cells: usize, capacity: usize) -> Self {
        Self {
            cells,
            states: Vec::with_capacity(cells * capacity),
        }
    }

    /// Appends a state to the chain.
    pub fn push(&mut self, state: &[i64]) {
        debug_assert_eq!(state.len(), self.cells);
        self.states.extend_from_slice(state);
    }

    /// Number of cells per recorded state.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        if self.cells == 0 {
            0
        } else {
            self.states.len() / self.cells
        }
    }

    /// Returns `true` when no state was recorded.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State recorded at position `index`.
    pub fn state(&self, index: usize) -> Option<&[i64]> {
        let start = index.checked_mul(self.cells)?;
        self.states.get(start..start + self.cells)
    }

    /// Last recorded state.
    pub fn last(&self) -> Option<&[i64]> {
        self.len().checked_sub(1).and_then(|index| self.state(index))
    }

    /// Iterates the recorded states in order.
    pub fn states(&self) -> impl Iterator<Item = &[i64]> + '_ {
        self.states.chunks_exact(self.cells.max(1))
    }

    /// Copies the chain into one vector per state.
    pub fn to_rows(&self) -> Vec<Table> {
        self.states().map(<[i64]>::to_vec).collect()
    }
}
