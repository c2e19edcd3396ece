//! # mc-engine
//!
//! Turns parameter vectors into trained rating models and keeps the best
//! vector per mode on disk.
//!
//! [`ModelFactory`] builds the external model for a `(mode, parameters)`
//! pair, [`EntropyObjective`] scores it, and [`Calibrator`] runs the
//! configured search strategy and persists the winner so later runs load
//! it instead of re-optimizing.

pub mod calibrator;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod factory;
pub mod model;
pub mod objective;

#[cfg(test)]
mod testing;

pub use calibrator::{Calibration, Calibrator};
pub use cli::{CalibrateArgs, ModeReport, RunReport};
pub use config::CalibrationConfig;
pub use diagnostics::Diagnostics;
pub use factory::ModelFactory;
pub use model::{ModelConfig, RatingEngine, RatingModel};
pub use objective::EntropyObjective;
