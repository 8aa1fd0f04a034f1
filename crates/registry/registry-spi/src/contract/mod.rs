//! Contract traits implemented by registry stores
//!
//! - [`ExperimentTracker`]: experiments, runs and their logged data
//! - [`ModelRegistry`]: versioned models on top of tracked artifacts

mod experiment_tracker;
mod model_registry;

pub use experiment_tracker::ExperimentTracker;
pub use model_registry::ModelRegistry;
