#![deny(missing_docs)]

//! Metropolis samplers over fibers of contingency tables.
//!
//! A fiber is the set of nonnegative integer tables sharing the sufficient
//! statistics `A x = b`. The samplers walk it with a basis of moves `m`
//! (`A m = 0`), targeting either the hypergeometric (conditional
//! multinomial) law or the uniform law, and the statistics in
//! [`statistics`] turn the recorded chain into Monte Carlo p-values.

/// Metropolis acceptance probabilities for both targets.
pub mod acceptance;
/// YAML/JSON configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Chain driver and public sampling entry points.
pub mod kernel;
/// Acceptance accumulator and run diagnostics.
pub mod metrics;
/// Direct, hit-and-run, adaptive and weighted-selection proposals.
pub mod proposal;
/// Fiber point sampler used for restarts and initial tables.
pub mod sis;
/// Goodness-of-fit statistics over recorded chains.
pub mod statistics;
/// Unconditional lattice walks for connectivity exploration.
pub mod walk;

pub use config::{ChainConfig, SeedPolicy, SisConfig, Strategy, Target};
pub use kernel::{
    run_chain, run_seeded, sample_hypergeometric_chain, sample_uniform_chain, ChainInput,
    ChainRun,
};
pub use metrics::RunDiagnostics;
pub use proposal::{LineRange, LineStep, Proposal, ProposalEngine};
pub use sis::{sample_one_fiber_point, FiberPointSampler};
pub use statistics::{
    cressie_read, exceedance_p_value, likelihood_ratio, neyman, pearson, unnormalized_probability,
};
pub use walk::{pure_walk, reachable_states};
