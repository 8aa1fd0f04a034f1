//! Modeler Consumer API
//!
//! Configuration types for modeler consumers: the run configuration, the
//! per-flavor model configurations and the competition metrics.

mod config;
mod engine;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use config::{ColumnConfig, KronosConfig, ModelerConfig, ModelsConfig};
pub use engine::{ArimaConfig, NeuralConfig, StructuralConfig};

// Re-export SPI types
pub use modeler_spi::{
    ForecastModel, ForecastPoint, ForecastRow, ModelFlavor, ModelerError, Observation, Result,
    UnitTestStatus,
};

/// Metric available to the model competition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionMetric {
    /// Root Mean Squared Error
    Rmse,
    /// Mean Absolute Percentage Error, in percent
    Mape,
}

impl CompetitionMetric {
    pub const SUPPORTED: [CompetitionMetric; 2] = [CompetitionMetric::Rmse, CompetitionMetric::Mape];

    /// Metric names are matched lower-cased with whitespace removed
    pub fn normalize(name: &str) -> String {
        name.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitionMetric::Rmse => "rmse",
            CompetitionMetric::Mape => "mape",
        }
    }
}

impl fmt::Display for CompetitionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompetitionMetric {
    type Err = ModelerError;

    fn from_str(s: &str) -> Result<Self> {
        match Self::normalize(s).as_str() {
            "rmse" => Ok(CompetitionMetric::Rmse),
            "mape" => Ok(CompetitionMetric::Mape),
            other => Err(ModelerError::invalid_config(format!(
                "metric '{}' is not supported (rmse, mape)",
                other
            ))),
        }
    }
}
