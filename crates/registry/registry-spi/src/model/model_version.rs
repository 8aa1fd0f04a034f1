//! Registered models and their versions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::Stage;
use crate::error::{RegistryError, Result};

/// Registration status of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    PendingRegistration,
    Ready,
    FailedRegistration,
}

/// One version of a registered model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: u32,
    /// Run that produced the artifact, when the source is a `runs:/` URI
    pub run_id: Option<String>,
    /// URI of the artifact backing this version
    pub source: String,
    pub current_stage: Stage,
    pub status: VersionStatus,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub creation_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// A model name with all of its versions, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub creation_time: DateTime<Utc>,
    #[serde(default)]
    pub versions: Vec<ModelVersion>,
}

impl RegisteredModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_time: Utc::now(),
            versions: Vec::new(),
        }
    }

    /// Append the next version (numbered from 1) in stage `None`
    pub fn add_version(&mut self, source: &str, run_id: Option<String>) -> ModelVersion {
        let next = self.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let version = ModelVersion {
            name: self.name.clone(),
            version: next,
            run_id,
            source: source.to_string(),
            current_stage: Stage::None,
            status: VersionStatus::Ready,
            tags: BTreeMap::new(),
            creation_time: now,
            last_updated: now,
        };
        self.versions.push(version.clone());
        version
    }

    pub fn version(&self, version: u32) -> Result<&ModelVersion> {
        self.versions
            .iter()
            .find(|v| v.version == version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: self.name.clone(),
                version,
            })
    }

    pub fn version_mut(&mut self, version: u32) -> Result<&mut ModelVersion> {
        let name = self.name.clone();
        self.versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or(RegistryError::VersionNotFound { name, version })
    }

    /// Highest version, optionally restricted to one stage
    pub fn latest(&self, stage: Option<Stage>) -> Option<&ModelVersion> {
        self.versions
            .iter()
            .filter(|v| stage.map_or(true, |s| v.current_stage == s))
            .max_by_key(|v| v.version)
    }

    /// Move `version` to `stage`.
    ///
    /// With `archive_existing`, every other version currently in `stage` is
    /// moved to [`Stage::Archived`]. Archiving only applies to Staging and
    /// Production.
    pub fn transition(
        &mut self,
        version: u32,
        stage: Stage,
        archive_existing: bool,
    ) -> Result<ModelVersion> {
        self.version(version)?;
        let now = Utc::now();

        if archive_existing && matches!(stage, Stage::Staging | Stage::Production) {
            for other in self
                .versions
                .iter_mut()
                .filter(|v| v.version != version && v.current_stage == stage)
            {
                other.current_stage = Stage::Archived;
                other.last_updated = now;
            }
        }

        let target = self.version_mut(version)?;
        target.current_stage = stage;
        target.last_updated = now;
        Ok(target.clone())
    }
}
