//! Registry data structures
//!
//! - [`Experiment`] groups the runs of one series
//! - [`Run`] holds the params, metrics and artifacts of one training
//! - [`RegisteredModel`] and [`ModelVersion`] track deployable versions
//! - [`Stage`] is the lifecycle position of a version
//! - [`ModelUri`] addresses a run artifact or a registered version

mod experiment;
mod model_uri;
mod model_version;
mod run;
mod stage;

pub use experiment::Experiment;
pub use model_uri::{LoadedModel, ModelUri, VersionSelector};
pub use model_version::{ModelVersion, RegisteredModel, VersionStatus};
pub use run::{Run, RunStatus};
pub use stage::Stage;

/// Tag key (and artifact field) carrying the model flavor
pub const FLAVOR_KEY: &str = "model_flavor";
