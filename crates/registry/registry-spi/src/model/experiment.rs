use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named container of runs, addressed by a path such as `/kronos/experiments/store_1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub path: String,
    pub creation_time: DateTime<Utc>,
}
