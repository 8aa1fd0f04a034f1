//! Registry Service Provider Interface
//!
//! Data model and contracts of the experiment tracker and model registry:
//!
//! - [`model`]: experiments, runs, registered models and their versions
//! - [`ModelUri`]: `runs:/` and `models:/` artifact addresses
//! - [`ExperimentTracker`]: experiments, runs, params, metrics and artifacts
//! - [`ModelRegistry`]: versioned models with a stage lifecycle
//! - [`RegistryError`]: error type for every registry operation

pub mod contract;
pub mod error;
pub mod model;

pub use contract::{ExperimentTracker, ModelRegistry};
pub use error::{RegistryError, Result};
pub use model::{
    Experiment, LoadedModel, ModelUri, ModelVersion, RegisteredModel, Run, RunStatus, Stage,
    VersionSelector, VersionStatus, FLAVOR_KEY,
};
