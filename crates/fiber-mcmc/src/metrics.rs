use serde::{Deserialize, Serialize};

/// Time-averaged Metropolis acceptance probability over every raw step.
///
/// Each step adds `probability / total_steps`, whether or not the step is
/// taken, so the final value is the mean acceptance probability rather than
/// the empirical fraction of accepted proposals.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptanceAccumulator {
    total_steps: f64,
    value: f64,
}

impl AcceptanceAccumulator {
    /// Creates an accumulator for a run of `total_steps` raw steps.
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps: total_steps.max(1) as f64,
            value: 0.0,
        }
    }

    /// Adds the probability realised by one raw step.
    pub fn record(&mut self, probability: f64) {
        self.value += probability / self.total_steps;
    }

    /// Current accumulated value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Counters describing what happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Raw steps executed (`iter * thin`).
    pub raw_steps: usize,
    /// Steps whose candidate replaced the current table.
    pub accepted_steps: usize,
    /// Steps whose candidate came from the fiber point sampler.
    pub sis_restarts: usize,
    /// Hit-and-run or adaptive proposals that fell back to a unit step.
    pub line_fallbacks: usize,
    /// Final move selection weights, reported for weighted selection runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_weights: Option<Vec<f64>>,
}

impl RunDiagnostics {
    /// Fraction of raw steps that were accepted.
    pub fn empirical_acceptance(&self) -> f64 {
        if self.raw_steps == 0 {
            0.0
        } else {
            self.accepted_steps as f64 / self.raw_steps as f64
        }
    }
}
