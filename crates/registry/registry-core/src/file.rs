//! File-backed registry store
//!
//! Layout under the root directory:
//!
//! ```text
//! experiments.json          all experiments
//! runs/<run_id>.json        one document per run, artifacts included
//! models/<name>.json        one document per registered model
//! ```
//!
//! Every document is written to a temporary file in the same directory and
//! renamed over the target. Read-modify-write cycles are serialized by a
//! process-wide mutex, so one store can be shared between threads.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use registry_spi::{
    Experiment, ExperimentTracker, ModelRegistry, ModelVersion, RegisteredModel, RegistryError,
    Result, Run, RunStatus, Stage,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{check_metric, new_id, source_run_id};

const EXPERIMENTS_FILE: &str = "experiments.json";
const RUNS_DIR: &str = "runs";
const MODELS_DIR: &str = "models";

/// Registry persisted as JSON documents
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create when missing) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(RUNS_DIR))?;
        fs::create_dir_all(root.join(MODELS_DIR))?;
        debug!(root = %root.display(), "file store opened");
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    fn experiments_path(&self) -> PathBuf {
        self.root.join(EXPERIMENTS_FILE)
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.root
            .join(RUNS_DIR)
            .join(format!("{}.json", encode_file_stem(run_id)))
    }

    fn model_path(&self, name: &str) -> PathBuf {
        self.root
            .join(MODELS_DIR)
            .join(format!("{}.json", encode_file_stem(name)))
    }

    fn load_experiments(&self) -> Result<Vec<Experiment>> {
        Ok(read_json(&self.experiments_path())?.unwrap_or_default())
    }

    fn load_run(&self, run_id: &str) -> Result<Run> {
        read_json(&self.run_path(run_id))?
            .ok_or_else(|| RegistryError::RunNotFound(run_id.to_string()))
    }

    fn load_registered(&self, name: &str) -> Result<RegisteredModel> {
        read_json(&self.model_path(name))?
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))
    }

    /// Load a run, apply `update` and write it back
    fn update_run(&self, run_id: &str, update: impl FnOnce(&mut Run)) -> Result<()> {
        let _guard = self.guard()?;
        let mut run = self.load_run(run_id)?;
        update(&mut run);
        write_json(&self.run_path(run_id), &run)
    }

    fn update_model<T>(
        &self,
        name: &str,
        update: impl FnOnce(&mut RegisteredModel) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.guard()?;
        let mut model = self.load_registered(name)?;
        let out = update(&mut model)?;
        write_json(&self.model_path(name), &model)?;
        Ok(out)
    }

    /// Parse every JSON document in `dir`
    fn read_dir_documents<T: DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>> {
        let mut documents = Vec::new();
        for entry in fs::read_dir(self.root.join(dir))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(document) = read_json(&path)? {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; percent-encode every other byte
fn encode_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl ExperimentTracker for FileStore {
    fn get_or_create_experiment(&self, path: &str) -> Result<Experiment> {
        let _guard = self.guard()?;
        let mut experiments = self.load_experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.path == path) {
            return Ok(existing.clone());
        }
        let experiment = Experiment {
            experiment_id: new_id(),
            path: path.to_string(),
            creation_time: Utc::now(),
        };
        experiments.push(experiment.clone());
        write_json(&self.experiments_path(), &experiments)?;
        debug!(path, id = %experiment.experiment_id, "experiment created");
        Ok(experiment)
    }

    fn get_experiment_by_path(&self, path: &str) -> Result<Option<Experiment>> {
        let _guard = self.guard()?;
        Ok(self
            .load_experiments()?
            .into_iter()
            .find(|e| e.path == path))
    }

    fn create_run(&self, experiment_id: &str, name: &str) -> Result<Run> {
        let _guard = self.guard()?;
        if !self
            .load_experiments()?
            .iter()
            .any(|e| e.experiment_id == experiment_id)
        {
            return Err(RegistryError::ExperimentNotFound(experiment_id.to_string()));
        }
        let run = Run::new(new_id(), experiment_id.to_string(), name.to_string());
        write_json(&self.run_path(&run.run_id), &run)?;
        Ok(run)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update_run(run_id, |run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        check_metric(key, value)?;
        self.update_run(run_id, |run| {
            run.metrics.insert(key.to_string(), value);
        })
    }

    fn log_artifact(&self, run_id: &str, path: &str, artifact: Value) -> Result<()> {
        self.update_run(run_id, |run| {
            run.artifacts.insert(path.to_string(), artifact);
        })
    }

    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Value> {
        let _guard = self.guard()?;
        let mut run = self.load_run(run_id)?;
        run.artifacts
            .remove(path)
            .ok_or_else(|| RegistryError::ArtifactNotFound {
                run_id: run_id.to_string(),
                path: path.to_string(),
            })
    }

    fn set_run_status(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.update_run(run_id, |run| run.set_status(status))
    }

    fn get_run(&self, run_id: &str) -> Result<Run> {
        let _guard = self.guard()?;
        self.load_run(run_id)
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<Run>> {
        let _guard = self.guard()?;
        let mut runs: Vec<Run> = self
            .read_dir_documents::<Run>(RUNS_DIR)?
            .into_iter()
            .filter(|r| r.experiment_id == experiment_id)
            .collect();
        runs.sort_by_key(|r| r.start_time);
        Ok(runs)
    }
}

impl ModelRegistry for FileStore {
    fn register_model(&self, source: &str, name: &str) -> Result<ModelVersion> {
        let run_id = source_run_id(source)?;
        let _guard = self.guard()?;
        if let Some(id) = &run_id {
            if read_json::<Run>(&self.run_path(id))?.is_none() {
                return Err(RegistryError::RunNotFound(id.clone()));
            }
        }
        let path = self.model_path(name);
        let mut model = read_json(&path)?.unwrap_or_else(|| RegisteredModel::new(name));
        let version = model.add_version(source, run_id);
        write_json(&path, &model)?;
        Ok(version)
    }

    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersion> {
        let _guard = self.guard()?;
        self.load_registered(name)?.version(version).cloned()
    }

    fn latest_version(&self, name: &str, stage: Option<Stage>) -> Result<Option<ModelVersion>> {
        let _guard = self.guard()?;
        let model: Option<RegisteredModel> = read_json(&self.model_path(name))?;
        Ok(model.and_then(|m| m.latest(stage).cloned()))
    }

    fn set_model_version_tag(
        &self,
        name: &str,
        version: u32,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.update_model(name, |model| {
            let target = model.version_mut(version)?;
            target.tags.insert(key.to_string(), value.to_string());
            target.last_updated = Utc::now();
            Ok(())
        })
    }

    fn transition_stage(
        &self,
        name: &str,
        version: u32,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.update_model(name, |model| {
            model.transition(version, stage, archive_existing)
        })
    }

    fn list_models(&self) -> Result<Vec<RegisteredModel>> {
        let _guard = self.guard()?;
        let mut models = self.read_dir_documents::<RegisteredModel>(MODELS_DIR)?;
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_spi::ModelUri;
    use serde_json::json;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_encode_file_stem() {
        assert_eq!(encode_file_stem("store_1-a"), "store_1-a");
        assert_eq!(encode_file_stem("a/b c"), "a%2Fb%20c");
        assert_eq!(encode_file_stem(".."), "%2E%2E");
    }

    #[test]
    fn test_data_survives_reopen() {
        let (dir, store) = open_store();
        let experiment = store.get_or_create_experiment("/kronos/experiments/s1").unwrap();
        let run = store.create_run(&experiment.experiment_id, "r").unwrap();
        store.log_param(&run.run_id, "m", "7").unwrap();
        store.log_metric(&run.run_id, "rmse", 0.5).unwrap();
        store
            .log_artifact(&run.run_id, "model", json!({ "model_flavor": "arima" }))
            .unwrap();
        store.register_model(&format!("runs:/{}/model", run.run_id), "s1").unwrap();
        store.transition_stage("s1", 1, Stage::Production, true).unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        let same = reopened
            .get_or_create_experiment("/kronos/experiments/s1")
            .unwrap();
        assert_eq!(same.experiment_id, experiment.experiment_id);

        let runs = reopened.list_runs(&experiment.experiment_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].params["m"], "7");
        assert_eq!(runs[0].metrics["rmse"], 0.5);

        let loaded = reopened
            .load_model(&ModelUri::stage("s1", Stage::Production))
            .unwrap();
        assert_eq!(loaded.flavor.as_deref(), Some("arima"));
    }

    #[test]
    fn test_model_names_with_separators() {
        let (_dir, store) = open_store();
        let experiment = store.get_or_create_experiment("/e").unwrap();
        let run = store.create_run(&experiment.experiment_id, "r").unwrap();
        store.log_artifact(&run.run_id, "model", json!({})).unwrap();

        let source = format!("runs:/{}/model", run.run_id);
        store.register_model(&source, "region/north").unwrap();
        store.register_model(&source, "region north").unwrap();

        let names: Vec<String> = store
            .list_models()
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["region north", "region/north"]);
    }

    #[test]
    fn test_missing_documents() {
        let (_dir, store) = open_store();
        assert!(matches!(store.get_run("nope"), Err(RegistryError::RunNotFound(_))));
        assert!(matches!(
            store.get_model_version("nope", 1),
            Err(RegistryError::ModelNotFound(_))
        ));
        assert!(store.latest_version("nope", None).unwrap().is_none());
        assert!(store.list_models().unwrap().is_empty());
    }

    #[test]
    fn test_no_temporary_files_left() {
        let (dir, store) = open_store();
        let experiment = store.get_or_create_experiment("/e").unwrap();
        for _ in 0..3 {
            store.create_run(&experiment.experiment_id, "r").unwrap();
        }
        let leftovers: Vec<_> = fs::read_dir(dir.path().join(RUNS_DIR))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) != Some("json"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
