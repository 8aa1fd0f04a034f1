use serde_json::Value;

use crate::error::Result;
use crate::model::{Experiment, Run, RunStatus};

/// Storage of experiments and runs.
///
/// Implementations are shared between threads; every method takes `&self`.
pub trait ExperimentTracker: Send + Sync {
    /// Return the experiment at `path`, creating it when missing
    fn get_or_create_experiment(&self, path: &str) -> Result<Experiment>;

    fn get_experiment_by_path(&self, path: &str) -> Result<Option<Experiment>>;

    /// Start a new run in `experiment_id`
    fn create_run(&self, experiment_id: &str, name: &str) -> Result<Run>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Record a metric; the value must be finite
    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Store a JSON artifact under `path`, replacing any previous one
    fn log_artifact(&self, run_id: &str, path: &str, artifact: Value) -> Result<()>;

    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Value>;

    fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()>;

    fn get_run(&self, run_id: &str) -> Result<Run>;

    /// Runs of an experiment, oldest first
    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>>;
}
