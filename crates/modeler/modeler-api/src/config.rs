//! Run configuration
//!
//! A configuration document is one flat JSON object:
//!
//! ```json
//! {
//!   "key_col": "id",
//!   "date_col": "date",
//!   "metric_col": "y",
//!   "models": { "pmdarima_1": { "m": 7 }, "prophet_1": {} },
//!   "n_test": 7,
//!   "fcst_horizon": 14,
//!   "fcst_competition_metrics": ["rmse", "mape"],
//!   "fcst_competition_metric_weights": [0.5, 0.5]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use modeler_spi::{ModelFlavor, ModelerError, Result};

/// Model name to model configuration; the flavor is the name prefix before `_`
pub type ModelsConfig = BTreeMap<String, Value>;

/// Column names of the input and output tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub key_col: String,
    pub date_col: String,
    pub metric_col: String,
    pub fcst_col: String,
    pub dt_reference_col: String,
    pub dt_creation_col: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            key_col: "key".to_string(),
            date_col: "date".to_string(),
            metric_col: "value".to_string(),
            fcst_col: "forecast".to_string(),
            dt_reference_col: "reference_date".to_string(),
            dt_creation_col: "creation_date".to_string(),
        }
    }
}

/// Parameters of one modeler run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelerConfig {
    pub models: ModelsConfig,
    /// Processing date; defaults to yesterday
    pub current_date: Option<NaiveDate>,
    /// First forecast day; defaults to the day after `current_date`
    pub fcst_first_date: Option<NaiveDate>,
    /// Rows held out to compare models
    pub n_test: usize,
    /// Days forecast by the deployment unit test
    pub n_unit_test: usize,
    pub fcst_horizon: usize,
    pub fcst_competition_metrics: Vec<String>,
    /// Weights matched to `fcst_competition_metrics` by position
    pub fcst_competition_metric_weights: Vec<f64>,
    /// Drop forecasts for days between the last observation and `fcst_first_date`
    pub future_only: bool,
    /// Seconds to wait for a registered version to become ready
    pub register_timeout_secs: u64,
}

impl Default for ModelerConfig {
    fn default() -> Self {
        Self {
            models: ModelsConfig::new(),
            current_date: None,
            fcst_first_date: None,
            n_test: 7,
            n_unit_test: 7,
            fcst_horizon: 7,
            fcst_competition_metrics: vec!["rmse".to_string(), "mape".to_string()],
            fcst_competition_metric_weights: vec![0.5, 0.5],
            future_only: true,
            register_timeout_secs: 10,
        }
    }
}

impl ModelerConfig {
    /// Add a model configuration
    pub fn model(mut self, name: impl Into<String>, config: Value) -> Self {
        self.models.insert(name.into(), config);
        self
    }

    pub fn current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = Some(date);
        self
    }

    pub fn fcst_first_date(mut self, date: NaiveDate) -> Self {
        self.fcst_first_date = Some(date);
        self
    }

    pub fn n_test(mut self, n_test: usize) -> Self {
        self.n_test = n_test;
        self
    }

    pub fn n_unit_test(mut self, n_unit_test: usize) -> Self {
        self.n_unit_test = n_unit_test;
        self
    }

    pub fn fcst_horizon(mut self, horizon: usize) -> Self {
        self.fcst_horizon = horizon;
        self
    }

    /// Set the competition metrics with their weights
    pub fn competition(mut self, metrics: &[(&str, f64)]) -> Self {
        self.fcst_competition_metrics = metrics.iter().map(|(m, _)| m.to_string()).collect();
        self.fcst_competition_metric_weights = metrics.iter().map(|(_, w)| *w).collect();
        self
    }

    pub fn future_only(mut self, future_only: bool) -> Self {
        self.future_only = future_only;
        self
    }

    /// `(current_date, fcst_first_date)` with defaults resolved against `today`
    pub fn resolve_dates(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let current = self.current_date.unwrap_or(today - Duration::days(1));
        let first = self
            .fcst_first_date
            .unwrap_or(current + Duration::days(1));
        (current, first)
    }

    /// Check the parts of the configuration every run depends on
    pub fn validate(&self) -> Result<()> {
        if self.n_test == 0 {
            return Err(ModelerError::invalid_config("n_test must be positive"));
        }
        if self.fcst_competition_metrics.is_empty() {
            return Err(ModelerError::invalid_config(
                "at least one competition metric is required",
            ));
        }
        if self.fcst_competition_metrics.len() != self.fcst_competition_metric_weights.len() {
            return Err(ModelerError::invalid_config(format!(
                "{} competition metrics but {} weights",
                self.fcst_competition_metrics.len(),
                self.fcst_competition_metric_weights.len()
            )));
        }
        let weights = &self.fcst_competition_metric_weights;
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ModelerError::invalid_config(
                "competition weights must be non-negative with a positive sum",
            ));
        }
        for name in self.models.keys() {
            ModelFlavor::from_model_name(name)?;
        }
        Ok(())
    }
}

/// Complete configuration document: columns, run parameters and store location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KronosConfig {
    #[serde(flatten)]
    pub columns: ColumnConfig,
    #[serde(flatten)]
    pub modeler: ModelerConfig,
    /// Registry directory; overridden by the `--store` flag or `KRONOS_STORE`
    #[serde(default)]
    pub store: Option<PathBuf>,
}

impl KronosConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: KronosConfig = serde_json::from_str(text)?;
        config.modeler.validate()?;
        Ok(config)
    }
}
