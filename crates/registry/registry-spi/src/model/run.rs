//! Tracked training runs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "RUNNING"),
            RunStatus::Finished => write!(f, "FINISHED"),
            RunStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One training run: its params, metrics and logged artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub experiment_id: String,
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    /// Artifacts keyed by artifact path
    #[serde(default)]
    pub artifacts: BTreeMap<String, Value>,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Run {
    /// A new running run
    pub fn new(run_id: String, experiment_id: String, name: String) -> Self {
        Self {
            run_id,
            experiment_id,
            name,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            status: RunStatus::Running,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Move to `status`; terminal statuses stamp the end time
    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.end_time = match status {
            RunStatus::Running => None,
            RunStatus::Finished | RunStatus::Failed => Some(Utc::now()),
        };
    }

    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Running
    }
}
