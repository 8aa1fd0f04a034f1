use thiserror::Error;

use crate::model::Stage;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors raised by experiment tracking and the model registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("No experiment selected")]
    NoExperiment,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// `start_run` while another run is still active
    #[error("Run {0} is already active; end it before starting a new one")]
    RunAlreadyActive(String),

    #[error("Registered model not found: {0}")]
    ModelNotFound(String),

    #[error("Version {version} of model '{name}' not found")]
    VersionNotFound { name: String, version: u32 },

    #[error("Model '{name}' has no version in stage {stage}")]
    NoVersionInStage { name: String, stage: Stage },

    #[error("Artifact '{path}' not found in run {run_id}")]
    ArtifactNotFound { run_id: String, path: String },

    #[error("Invalid model URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The flavor is neither tagged on the version nor stored in the artifact
    #[error("Model flavor unknown for {0}")]
    MissingFlavor(String),

    #[error("Version {version} of model '{name}' failed registration")]
    RegistrationFailed { name: String, version: u32 },

    #[error("Version {version} of model '{name}' not ready after {waited_ms} ms")]
    Timeout {
        name: String,
        version: u32,
        waited_ms: u128,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// Shorthand for an [`RegistryError::InvalidUri`]
    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}
