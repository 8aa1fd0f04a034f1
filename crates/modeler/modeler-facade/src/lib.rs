//! Modeler Facade
//!
//! High-level API for the kronos modeling pipeline. Re-exports the modeler
//! and registry stacks for consumers that only need one dependency.
//!
//! # Example
//!
//! ```ignore
//! use modeler_facade::prelude::*;
//!
//! let store = Arc::new(FileStore::open("/var/lib/kronos")?);
//! let config = ModelerConfig::default().model("arima_1", json!({}));
//! let mut modeler = Modeler::new(RegistryClient::new(store), rows, config)?;
//! for row in modeler.run()? {
//!     println!("{} {} {:.2}", row.key, row.date, row.forecast);
//! }
//! ```

// Re-export everything from core (which includes API and SPI)
pub use modeler_core::*;

/// Registry stores and client
pub mod registry {
    pub use registry_core::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    // Traits
    pub use modeler_spi::ForecastModel;
    pub use registry_spi::{ExperimentTracker, ModelRegistry};

    // Configuration
    pub use modeler_api::{
        ArimaConfig, ColumnConfig, CompetitionMetric, KronosConfig, ModelerConfig, NeuralConfig,
        StructuralConfig,
    };

    // Rows and errors
    pub use modeler_spi::{
        ForecastPoint, ForecastRow, ModelFlavor, ModelerError, Observation, Result,
        UnitTestStatus,
    };
    pub use registry_spi::{RegistryError, Stage};

    // Implementations
    pub use modeler_core::{DeployOutcome, Modeler, PerformanceRow};
    pub use registry_core::{FileStore, InMemoryStore, RegistryClient};
}
