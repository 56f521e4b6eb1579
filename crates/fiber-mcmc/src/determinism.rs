use fiber_core::{derive_substream_seed, RngHandle};

use crate::config::SeedPolicy;

/// Derives the deterministic seed used for a specific chain.
pub fn chain_seed(master_seed: u64, stream: u64) -> u64 {
    derive_substream_seed(master_seed, stream)
}

/// Builds the RNG owned by the chain described by `policy`.
pub fn chain_rng(policy: &SeedPolicy) -> RngHandle {
    RngHandle::from_seed(chain_seed(policy.master_seed, policy.stream))
}

/// Seeds for `count` independent chains sharing one master seed.
///
/// Chains run concurrently must each own one of these streams rather than
/// share a generator.
pub fn partition_seeds(master_seed: u64, count: usize) -> Vec<u64> {
    (0..count as u64)
        .map(|stream| chain_seed(master_seed, stream))
        .collect()
}
