//! Artifact addresses.
//!
//! - `runs:/<run_id>/<artifact_path>` points at an artifact logged in a run
//! - `models:/<name>/<stage>` resolves to the latest version in a stage
//! - `models:/<name>/<version>` pins a version number
//! - `models:/<name>/latest` resolves to the highest version

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::model_version::ModelVersion;
use super::stage::Stage;
use crate::error::RegistryError;

/// Version part of a `models:/` URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Stage(Stage),
    Version(u32),
    Latest,
}

/// A parsed model URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUri {
    Run { run_id: String, path: String },
    Model { name: String, selector: VersionSelector },
}

impl ModelUri {
    pub fn run(run_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Run {
            run_id: run_id.into(),
            path: path.into(),
        }
    }

    pub fn stage(name: impl Into<String>, stage: Stage) -> Self {
        Self::Model {
            name: name.into(),
            selector: VersionSelector::Stage(stage),
        }
    }
}

impl FromStr for ModelUri {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("runs:/") {
            let (run_id, path) = rest
                .split_once('/')
                .ok_or_else(|| RegistryError::invalid_uri(s, "expected runs:/<run_id>/<path>"))?;
            if run_id.is_empty() || path.is_empty() {
                return Err(RegistryError::invalid_uri(s, "empty run id or artifact path"));
            }
            return Ok(ModelUri::run(run_id, path));
        }

        if let Some(rest) = s.strip_prefix("models:/") {
            let (name, selector) = rest.rsplit_once('/').ok_or_else(|| {
                RegistryError::invalid_uri(s, "expected models:/<name>/<stage-or-version>")
            })?;
            if name.is_empty() || selector.is_empty() {
                return Err(RegistryError::invalid_uri(s, "empty model name or version"));
            }
            let selector = if selector.eq_ignore_ascii_case("latest") {
                VersionSelector::Latest
            } else if let Ok(version) = selector.parse::<u32>() {
                VersionSelector::Version(version)
            } else {
                VersionSelector::Stage(
                    selector
                        .parse()
                        .map_err(|_| RegistryError::invalid_uri(s, "unknown stage"))?,
                )
            };
            return Ok(ModelUri::Model {
                name: name.to_string(),
                selector,
            });
        }

        Err(RegistryError::invalid_uri(
            s,
            "scheme must be runs:/ or models:/",
        ))
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelUri::Run { run_id, path } => write!(f, "runs:/{}/{}", run_id, path),
            ModelUri::Model { name, selector } => match selector {
                VersionSelector::Stage(stage) => write!(f, "models:/{}/{}", name, stage),
                VersionSelector::Version(v) => write!(f, "models:/{}/{}", name, v),
                VersionSelector::Latest => write!(f, "models:/{}/latest", name),
            },
        }
    }
}

/// A model artifact resolved from a [`ModelUri`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub artifact: Value,
    /// Flavor from the version tag, else from the artifact's `model_flavor` field
    pub flavor: Option<String>,
    pub run_id: String,
    /// Registered version, when loaded through a `models:/` URI
    pub version: Option<ModelVersion>,
}
