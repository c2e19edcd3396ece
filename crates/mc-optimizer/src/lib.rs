//! # mc-optimizer
//!
//! Bounded minimization of expensive objectives.
//!
//! Provides a Latin-hypercube design sampler, the [`Objective`] seam that
//! model training plugs into, run history with first-wins best tracking,
//! and two search strategies: exhaustive screening of a sampled design
//! (parallel) and a sequential Gaussian-process surrogate search.

mod history;
mod objective;
mod sampler;
mod search;
mod surrogate;

pub use history::{Observation, SearchHistory, SearchOutcome};
pub use objective::{checked, Objective};
pub use sampler::LatinHypercube;
pub use search::{BayesianSearch, ExhaustiveSearch, SearchStrategy, StrategyConfig};
pub use surrogate::{expected_improvement, GaussianProcess};
