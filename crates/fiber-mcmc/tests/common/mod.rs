use std::collections::VecDeque;

use fiber_core::{FiberError, RandomSource};

/// One draw made against a [`ScriptedSource`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum Draw {
    Uniform,
    Categorical(Vec<f64>),
    Int(i64, i64),
}

/// Replays fixed draws and records every call so step sequences can be
/// checked by hand.
///
/// Integer draws over a single value return it without consuming the script,
/// matching `RngHandle`.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    uniforms: VecDeque<f64>,
    integers: VecDeque<i64>,
    pub log: Vec<Draw>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(uniforms: &[f64], integers: &[i64]) -> Self {
        Self {
            uniforms: uniforms.iter().copied().collect(),
            integers: integers.iter().copied().collect(),
            log: Vec::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.uniforms.is_empty() && self.integers.is_empty()
    }
}

impl RandomSource for ScriptedSource {
    fn draw_uniform(&mut self) -> f64 {
        self.log.push(Draw::Uniform);
        self.uniforms.pop_front().expect("script ran out of uniforms")
    }

    fn draw_categorical(&mut self, weights: &[f64]) -> Result<usize, FiberError> {
        self.log.push(Draw::Categorical(weights.to_vec()));
        let index = self.integers.pop_front().expect("script ran out of integers") as usize;
        assert!(index < weights.len(), "scripted {index} outside {} outcomes", weights.len());
        Ok(index)
    }

    fn draw_uniform_int(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.log.push(Draw::Int(lo, hi));
        let value = self.integers.pop_front().expect("script ran out of integers");
        assert!((lo..=hi).contains(&value), "scripted {value} outside [{lo}, {hi}]");
        value
    }
}
