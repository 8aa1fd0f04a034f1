//! Process-local registry store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use registry_spi::{
    Experiment, ExperimentTracker, ModelRegistry, ModelVersion, RegisteredModel, RegistryError,
    Result, Run, RunStatus, Stage,
};
use serde_json::Value;
use tracing::debug;

use crate::{check_metric, new_id, source_run_id};

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    /// Insertion order is creation order
    runs: Vec<Run>,
    models: BTreeMap<String, RegisteredModel>,
}

impl State {
    fn run_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        self.runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| RegistryError::RunNotFound(run_id.to_string()))
    }

    fn model_mut(&mut self, name: &str) -> Result<&mut RegisteredModel> {
        self.models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }
}

/// In-memory store; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| RegistryError::LockPoisoned)
    }
}

impl ExperimentTracker for InMemoryStore {
    fn get_or_create_experiment(&self, path: &str) -> Result<Experiment> {
        let mut state = self.write()?;
        if let Some(existing) = state.experiments.iter().find(|e| e.path == path) {
            return Ok(existing.clone());
        }
        let experiment = Experiment {
            experiment_id: new_id(),
            path: path.to_string(),
            creation_time: Utc::now(),
        };
        debug!(path, id = %experiment.experiment_id, "experiment created");
        state.experiments.push(experiment.clone());
        Ok(experiment)
    }

    fn get_experiment_by_path(&self, path: &str) -> Result<Option<Experiment>> {
        Ok(self
            .read()?
            .experiments
            .iter()
            .find(|e| e.path == path)
            .cloned())
    }

    fn create_run(&self, experiment_id: &str, name: &str) -> Result<Run> {
        let mut state = self.write()?;
        if !state
            .experiments
            .iter()
            .any(|e| e.experiment_id == experiment_id)
        {
            return Err(RegistryError::ExperimentNotFound(experiment_id.to_string()));
        }
        let run = Run::new(new_id(), experiment_id.to_string(), name.to_string());
        state.runs.push(run.clone());
        Ok(run)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.write()?
            .run_mut(run_id)?
            .params
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        check_metric(key, value)?;
        self.write()?
            .run_mut(run_id)?
            .metrics
            .insert(key.to_string(), value);
        Ok(())
    }

    fn log_artifact(&self, run_id: &str, path: &str, artifact: Value) -> Result<()> {
        self.write()?
            .run_mut(run_id)?
            .artifacts
            .insert(path.to_string(), artifact);
        Ok(())
    }

    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Value> {
        let state = self.read()?;
        let run = state
            .runs
            .iter()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| RegistryError::RunNotFound(run_id.to_string()))?;
        run.artifacts
            .get(path)
            .cloned()
            .ok_or_else(|| RegistryError::ArtifactNotFound {
                run_id: run_id.to_string(),
                path: path.to_string(),
            })
    }

    fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.write()?.run_mut(run_id)?.set_status(status);
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<Run> {
        self.read()?
            .runs
            .iter()
            .find(|r| r.run_id == run_id)
            .cloned()
            .ok_or_else(|| RegistryError::RunNotFound(run_id.to_string()))
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        Ok(self
            .read()?
            .runs
            .iter()
            .filter(|r| r.experiment_id == experiment_id)
            .cloned()
            .collect())
    }
}

impl ModelRegistry for InMemoryStore {
    fn register_model(&self, source: &str, name: &str) -> Result<ModelVersion> {
        let run_id = source_run_id(source)?;
        let mut state = self.write()?;
        if let Some(id) = &run_id {
            if !state.runs.iter().any(|r| &r.run_id == id) {
                return Err(RegistryError::RunNotFound(id.clone()));
            }
        }
        let version = state
            .models
            .entry(name.to_string())
            .or_insert_with(|| RegisteredModel::new(name))
            .add_version(source, run_id);
        Ok(version)
    }

    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersion> {
        let state = self.read()?;
        let model = state
            .models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        model.version(version).cloned()
    }

    fn latest_version(&self, name: &str, stage: Option<Stage>) -> Result<Option<ModelVersion>> {
        Ok(self
            .read()?
            .models
            .get(name)
            .and_then(|m| m.latest(stage).cloned()))
    }

    fn set_model_version_tag(
        &self,
        name: &str,
        version: u32,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut state = self.write()?;
        let target = state.model_mut(name)?.version_mut(version)?;
        target.tags.insert(key.to_string(), value.to_string());
        target.last_updated = Utc::now();
        Ok(())
    }

    fn transition_stage(
        &self,
        name: &str,
        version: u32,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.write()?
            .model_mut(name)?
            .transition(version, stage, archive_existing)
    }

    fn list_models(&self) -> Result<Vec<RegisteredModel>> {
        Ok(self.read()?.models.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_spi::{ModelUri, FLAVOR_KEY};
    use serde_json::json;

    fn store_with_run() -> (InMemoryStore, Run) {
        let store = InMemoryStore::new();
        let experiment = store.get_or_create_experiment("/kronos/experiments/k1").unwrap();
        let run = store.create_run(&experiment.experiment_id, "run").unwrap();
        (store, run)
    }

    #[test]
    fn test_experiment_is_reused() {
        let store = InMemoryStore::new();
        let a = store.get_or_create_experiment("/e/1").unwrap();
        let b = store.get_or_create_experiment("/e/1").unwrap();
        assert_eq!(a.experiment_id, b.experiment_id);
        assert!(store.get_experiment_by_path("/e/2").unwrap().is_none());
    }

    #[test]
    fn test_run_logging() {
        let (store, run) = store_with_run();
        store.log_param(&run.run_id, "m", "7").unwrap();
        store.log_metric(&run.run_id, "rmse", 2.5).unwrap();
        store.set_run_status(&run.run_id, RunStatus::Finished).unwrap();

        let stored = store.get_run(&run.run_id).unwrap();
        assert_eq!(stored.params["m"], "7");
        assert_eq!(stored.metrics["rmse"], 2.5);
        assert_eq!(stored.status, RunStatus::Finished);
        assert_eq!(store.list_runs(&run.experiment_id).unwrap().len(), 1);
    }

    #[test]
    fn test_non_finite_metric_rejected() {
        let (store, run) = store_with_run();
        assert!(matches!(
            store.log_metric(&run.run_id, "mape", f64::NAN),
            Err(RegistryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_run_and_experiment() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.create_run("nope", "r"),
            Err(RegistryError::ExperimentNotFound(_))
        ));
        assert!(matches!(
            store.log_param("nope", "k", "v"),
            Err(RegistryError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_register_and_load_by_stage() {
        let (store, run) = store_with_run();
        store
            .log_artifact(&run.run_id, "model", json!({ "model_flavor": "arima", "weights": [1.0] }))
            .unwrap();

        let source = format!("runs:/{}/model", run.run_id);
        let v1 = store.register_model(&source, "k1").unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.run_id.as_deref(), Some(run.run_id.as_str()));

        store.transition_stage("k1", 1, Stage::Production, true).unwrap();
        let loaded = store
            .load_model(&ModelUri::stage("k1", Stage::Production))
            .unwrap();
        assert_eq!(loaded.flavor.as_deref(), Some("arima"));
        assert_eq!(loaded.version.unwrap().version, 1);
    }

    #[test]
    fn test_tag_overrides_artifact_flavor() {
        let (store, run) = store_with_run();
        store
            .log_artifact(&run.run_id, "model", json!({ "model_flavor": "arima" }))
            .unwrap();
        store
            .register_model(&format!("runs:/{}/model", run.run_id), "k1")
            .unwrap();
        store
            .set_model_version_tag("k1", 1, FLAVOR_KEY, "pmdarima")
            .unwrap();

        let loaded = store.load_model(&"models:/k1/1".parse().unwrap()).unwrap();
        assert_eq!(loaded.flavor.as_deref(), Some("pmdarima"));
    }

    #[test]
    fn test_load_missing_stage() {
        let (store, run) = store_with_run();
        store.log_artifact(&run.run_id, "model", json!({})).unwrap();
        store
            .register_model(&format!("runs:/{}/model", run.run_id), "k1")
            .unwrap();
        assert!(matches!(
            store.load_model(&ModelUri::stage("k1", Stage::Production)),
            Err(RegistryError::NoVersionInStage { .. })
        ));
    }

    #[test]
    fn test_register_unknown_run() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.register_model("runs:/ghost/model", "k1"),
            Err(RegistryError::RunNotFound(_))
        ));
        assert!(store.register_model("ftp://x", "k1").is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let store = InMemoryStore::new();
        let clone = store.clone();
        store.get_or_create_experiment("/shared").unwrap();
        assert!(clone.get_experiment_by_path("/shared").unwrap().is_some());
    }
}
