use crate::contract::ExperimentTracker;
use crate::error::{RegistryError, Result};
use crate::model::{
    LoadedModel, ModelUri, ModelVersion, RegisteredModel, Stage, VersionSelector, FLAVOR_KEY,
};

/// Versioned model registry backed by tracked run artifacts
pub trait ModelRegistry: ExperimentTracker {
    /// Register the artifact at `source` as the next version of `name`.
    ///
    /// The registered model is created on first use. The new version starts
    /// in [`Stage::None`].
    fn register_model(&self, source: &str, name: &str) -> Result<ModelVersion>;

    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersion>;

    /// Highest version of `name`, optionally restricted to `stage`
    fn latest_version(&self, name: &str, stage: Option<Stage>) -> Result<Option<ModelVersion>>;

    fn set_model_version_tag(&self, name: &str, version: u32, key: &str, value: &str)
        -> Result<()>;

    /// Move a version to `stage`, archiving the versions already there when
    /// `archive_existing` is set
    fn transition_stage(
        &self,
        name: &str,
        version: u32,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion>;

    fn list_models(&self) -> Result<Vec<RegisteredModel>>;

    /// Resolve `uri` to a version (for `models:/` URIs) and load its artifact
    fn load_model(&self, uri: &ModelUri) -> Result<LoadedModel> {
        match uri {
            ModelUri::Run { run_id, path } => {
                let artifact = self.load_artifact(run_id, path)?;
                let flavor = artifact_flavor(&artifact);
                Ok(LoadedModel {
                    artifact,
                    flavor,
                    run_id: run_id.clone(),
                    version: None,
                })
            }
            ModelUri::Model { name, selector } => {
                let version = match selector {
                    VersionSelector::Version(v) => self.get_model_version(name, *v)?,
                    VersionSelector::Latest => self
                        .latest_version(name, None)?
                        .ok_or_else(|| RegistryError::ModelNotFound(name.clone()))?,
                    VersionSelector::Stage(stage) => self
                        .latest_version(name, Some(*stage))?
                        .ok_or_else(|| RegistryError::NoVersionInStage {
                            name: name.clone(),
                            stage: *stage,
                        })?,
                };

                let (run_id, path) = match version.source.parse::<ModelUri>()? {
                    ModelUri::Run { run_id, path } => (run_id, path),
                    ModelUri::Model { .. } => {
                        return Err(RegistryError::invalid_uri(
                            version.source.clone(),
                            "version source must be a runs:/ URI",
                        ))
                    }
                };
                let artifact = self.load_artifact(&run_id, &path)?;
                let flavor = version
                    .tags
                    .get(FLAVOR_KEY)
                    .cloned()
                    .or_else(|| artifact_flavor(&artifact));
                Ok(LoadedModel {
                    artifact,
                    flavor,
                    run_id,
                    version: Some(version),
                })
            }
        }
    }
}

fn artifact_flavor(artifact: &serde_json::Value) -> Option<String> {
    artifact
        .get(FLAVOR_KEY)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
