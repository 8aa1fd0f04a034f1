//! Registry client used by the modeler
//!
//! Wraps a shared store with the state of one caller: the current
//! experiment and at most one active run.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use registry_spi::{
    Experiment, ModelRegistry, ModelUri, ModelVersion, RegistryError, Result, Run, RunStatus,
    Stage, VersionStatus,
};
use serde_json::Value;
use tracing::{debug, info, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Experiment and run bookkeeping on top of a [`ModelRegistry`]
pub struct RegistryClient {
    store: Arc<dyn ModelRegistry>,
    experiment: Option<Experiment>,
    active_run: Option<Run>,
    poll_interval: Duration,
}

impl RegistryClient {
    pub fn new(store: Arc<dyn ModelRegistry>) -> Self {
        Self {
            store,
            experiment: None,
            active_run: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Interval between status checks in [`register_model`](Self::register_model)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn ModelRegistry> {
        &self.store
    }

    /// Select (creating if needed) the experiment new runs are started in
    pub fn set_experiment(&mut self, path: &str) -> Result<Experiment> {
        let experiment = self.store.get_or_create_experiment(path)?;
        debug!(path, id = %experiment.experiment_id, "experiment selected");
        self.experiment = Some(experiment.clone());
        Ok(experiment)
    }

    pub fn experiment(&self) -> Option<&Experiment> {
        self.experiment.as_ref()
    }

    pub fn active_run(&self) -> Option<&Run> {
        self.active_run.as_ref()
    }

    /// Start a run in the current experiment; fails while another run is active
    pub fn start_run(&mut self, name: &str) -> Result<Run> {
        if let Some(active) = &self.active_run {
            return Err(RegistryError::RunAlreadyActive(active.run_id.clone()));
        }
        let experiment = self.experiment.as_ref().ok_or(RegistryError::NoExperiment)?;
        let run = self.store.create_run(&experiment.experiment_id, name)?;
        debug!(run_id = %run.run_id, name, "run started");
        self.active_run = Some(run.clone());
        Ok(run)
    }

    /// Finish the active run; does nothing when no run is active
    pub fn end_run(&mut self) -> Result<()> {
        self.end_run_with_status(RunStatus::Finished)
    }

    pub fn end_run_with_status(&mut self, status: RunStatus) -> Result<()> {
        if let Some(run) = self.active_run.take() {
            self.store.set_run_status(&run.run_id, status)?;
            debug!(run_id = %run.run_id, %status, "run ended");
        }
        Ok(())
    }

    pub fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.store.log_param(run_id, key, value)
    }

    pub fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.store.log_metric(run_id, key, value)
    }

    pub fn log_artifact(&self, run_id: &str, path: &str, artifact: Value) -> Result<()> {
        self.store.log_artifact(run_id, path, artifact)
    }

    /// Register `model_uri` under `name` and wait until the version is ready
    pub fn register_model(
        &self,
        model_uri: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<ModelVersion> {
        let created = self.store.register_model(model_uri, name)?;
        let started = Instant::now();

        loop {
            let current = self.store.get_model_version(name, created.version)?;
            match current.status {
                VersionStatus::Ready => {
                    info!(name, version = current.version, "model version registered");
                    return Ok(current);
                }
                VersionStatus::FailedRegistration => {
                    return Err(RegistryError::RegistrationFailed {
                        name: name.to_string(),
                        version: current.version,
                    });
                }
                VersionStatus::PendingRegistration => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        warn!(name, version = current.version, "registration timed out");
                        return Err(RegistryError::Timeout {
                            name: name.to_string(),
                            version: current.version,
                            waited_ms: waited.as_millis(),
                        });
                    }
                    thread::sleep(self.poll_interval.min(timeout - waited));
                }
            }
        }
    }

    /// Move `version` to `stage`
    pub fn promote_model(
        &self,
        version: &ModelVersion,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        let promoted =
            self.store
                .transition_stage(&version.name, version.version, stage, archive_existing)?;
        info!(
            name = %promoted.name,
            version = promoted.version,
            stage = %promoted.current_stage,
            "model version promoted"
        );
        Ok(promoted)
    }

    pub fn set_model_tag(&self, version: &ModelVersion, key: &str, value: &str) -> Result<()> {
        self.store
            .set_model_version_tag(&version.name, version.version, key, value)
    }

    /// Load the artifact behind `model_uri` together with its flavor
    pub fn load_model(&self, model_uri: &str) -> Result<(Value, String)> {
        let uri: ModelUri = model_uri.parse()?;
        let loaded = self.store.load_model(&uri)?;
        let flavor = loaded
            .flavor
            .ok_or_else(|| RegistryError::MissingFlavor(model_uri.to_string()))?;
        debug!(uri = model_uri, %flavor, run_id = %loaded.run_id, "model loaded");
        Ok((loaded.artifact, flavor))
    }
}
