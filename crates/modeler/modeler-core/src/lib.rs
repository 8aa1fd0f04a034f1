//! Modeler Core Implementations
//!
//! - [`adapters`]: the engines of `algorithm-core` behind [`ForecastModel`]
//! - [`factory`]: models from configuration or from registry artifacts
//! - [`evaluation`]: train/test split and accuracy scores
//! - [`competition`]: ranking of candidates on standardized metrics
//! - [`Modeler`]: the per-series pipeline on top of a registry
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modeler_core::{Modeler, ModelerConfig, Observation};
//! use registry_core::{InMemoryStore, RegistryClient};
//! use serde_json::json;
//!
//! let client = RegistryClient::new(Arc::new(InMemoryStore::new()));
//! let data: Vec<Observation> = Vec::new(); // rows of one key
//! let config = ModelerConfig::default().model("arima_1", json!({ "m": 7 }));
//! let mut modeler = Modeler::new(client, data, config).unwrap();
//! let forecast = modeler.run().unwrap();
//! ```

pub mod adapters;
pub mod competition;
pub mod evaluation;
pub mod factory;
pub mod fallback;
mod modeler;

pub use competition::{competition, PerformanceRow, Standings, PROD_MODEL};
pub use evaluation::{evaluate_model, train_test_split};
pub use factory::{create_all_models, model_generation};
pub use fallback::naive_forecast;
pub use modeler::{DeployOutcome, Modeler, MODEL_ARTIFACT};

// Re-export from API and SPI
pub use modeler_api::{
    ArimaConfig, ColumnConfig, CompetitionMetric, KronosConfig, ModelerConfig, ModelsConfig,
    NeuralConfig, StructuralConfig,
};
pub use modeler_spi::{
    ForecastModel, ForecastPoint, ForecastRow, ModelFlavor, ModelerError, Observation, Result,
    UnitTestStatus,
};
