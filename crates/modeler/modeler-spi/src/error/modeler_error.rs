use algorithm_spi::TsError;
use registry_spi::RegistryError;
use thiserror::Error;

/// Result type alias for modeler operations
pub type Result<T> = std::result::Result<T, ModelerError>;

/// Errors raised while training, selecting, deploying or serving models
#[derive(Error, Debug)]
pub enum ModelerError {
    /// Not enough rows for the requested operation
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Model flavor '{0}' not supported")]
    UnknownFlavor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An operation ran before the one it depends on
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("No model could be ranked in the competition")]
    NoWinner,

    #[error("Algorithm error: {0}")]
    Algorithm(#[from] TsError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelerError {
    /// Shorthand for an [`ModelerError::InvalidConfig`]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}
