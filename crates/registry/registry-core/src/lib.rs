//! Registry Core Implementations
//!
//! - [`InMemoryStore`]: process-local store, shared by cloning
//! - [`FileStore`]: JSON documents under a root directory
//! - [`RegistryClient`]: current experiment and active-run bookkeeping on top of a store
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use registry_core::{InMemoryStore, RegistryClient};
//!
//! let mut client = RegistryClient::new(Arc::new(InMemoryStore::new()));
//! client.set_experiment("/kronos/experiments/demo").unwrap();
//! let run = client.start_run("first").unwrap();
//! client.log_metric(&run.run_id, "rmse", 1.5).unwrap();
//! client.end_run().unwrap();
//! ```

mod client;
mod file;
mod memory;

pub use client::RegistryClient;
pub use file::FileStore;
pub use memory::InMemoryStore;

// Re-export from SPI
pub use registry_spi::{
    Experiment, ExperimentTracker, LoadedModel, ModelRegistry, ModelUri, ModelVersion,
    RegisteredModel, RegistryError, Result, Run, RunStatus, Stage, VersionStatus, FLAVOR_KEY,
};

/// Fresh identifier for experiments and runs
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn check_metric(key: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RegistryError::InvalidArgument(format!(
            "metric '{}' must be finite, got {}",
            key, value
        )))
    }
}

/// Run id of a `runs:/` source; `models:/` sources carry none
pub(crate) fn source_run_id(source: &str) -> Result<Option<String>> {
    match source.parse::<ModelUri>()? {
        ModelUri::Run { run_id, .. } => Ok(Some(run_id)),
        ModelUri::Model { .. } => Ok(None),
    }
}
