#![deny(missing_docs)]
#![doc = "Core lattice types, errors and randomness for fiber samplers."]

pub mod errors;
mod lattice;
pub mod rng;

pub use errors::{ErrorInfo, FiberError};
pub use lattice::{is_feasible, Chain, ConstraintMatrix, Fiber, MoveBasis, Table};
pub use rng::{derive_substream_seed, RandomSource, RngHandle};
