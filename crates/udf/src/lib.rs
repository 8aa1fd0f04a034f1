//! Grouped forecasting
//!
//! [`ForecastUdf`] splits a table of observations by key and runs one
//! [`Modeler`] per key, in parallel, against a shared registry store. This is
//! the per-group function a dataframe engine would apply.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kronos_udf::{ForecastUdf, UdfOptions};
//! use registry_core::InMemoryStore;
//!
//! let udf = ForecastUdf::new(Arc::new(InMemoryStore::new()), UdfOptions::default());
//! let forecast = udf.apply(Vec::new());
//! assert!(forecast.is_empty());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use modeler_core::{ForecastRow, Modeler, ModelerConfig, Observation, Result};
use rayon::prelude::*;
use registry_core::{ModelRegistry, RegistryClient};
use tracing::{error, info};

/// Which steps run for every group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UdfMode {
    /// Training, competition, deploy and prediction
    #[default]
    Full,
    /// Prediction from the current Production models only
    PredictOnly,
}

/// Settings shared by every group
#[derive(Debug, Clone, Default)]
pub struct UdfOptions {
    pub config: ModelerConfig,
    pub mode: UdfMode,
    /// Date the default processing dates are derived from; today when unset
    pub today: Option<NaiveDate>,
}

impl UdfOptions {
    pub fn new(config: ModelerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: UdfMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

/// Forecast every key of a table
pub struct ForecastUdf {
    store: Arc<dyn ModelRegistry>,
    options: UdfOptions,
}

impl ForecastUdf {
    pub fn new(store: Arc<dyn ModelRegistry>, options: UdfOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &UdfOptions {
        &self.options
    }

    /// Forecast rows of every key, in key order.
    ///
    /// A key whose pipeline fails is logged and contributes no rows.
    pub fn apply(&self, rows: Vec<Observation>) -> Vec<ForecastRow> {
        let groups: Vec<(String, Vec<Observation>)> = group_by_key(rows).into_iter().collect();
        info!(groups = groups.len(), mode = ?self.options.mode, "forecast udf started");

        let results: Vec<Vec<ForecastRow>> = groups
            .into_par_iter()
            .map(|(key, rows)| match self.apply_group(rows) {
                Ok(forecast) => forecast,
                Err(e) => {
                    error!(%key, error = %e, "group failed");
                    Vec::new()
                }
            })
            .collect();

        results.into_iter().flatten().collect()
    }

    /// Run the pipeline for the rows of one key
    pub fn apply_group(&self, rows: Vec<Observation>) -> Result<Vec<ForecastRow>> {
        let client = RegistryClient::new(Arc::clone(&self.store));
        let config = self.options.config.clone();
        let mut modeler = match self.options.today {
            Some(today) => Modeler::with_today(client, rows, config, today)?,
            None => Modeler::new(client, rows, config)?,
        };
        match self.options.mode {
            UdfMode::Full => modeler.run(),
            UdfMode::PredictOnly => modeler.prediction(),
        }
    }
}

/// Rows of each key, keys in ascending order
pub fn group_by_key(rows: Vec<Observation>) -> BTreeMap<String, Vec<Observation>> {
    let mut groups: BTreeMap<String, Vec<Observation>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.key.clone()).or_default().push(row);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use registry_core::{InMemoryStore, Stage};
    use serde_json::json;

    fn date(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap() + Duration::days(offset)
    }

    fn table(keys: &[&str], days: i64) -> Vec<Observation> {
        let mut rows = Vec::new();
        // Interleaved and newest first, as tables usually arrive
        for i in (0..days).rev() {
            for (k, key) in keys.iter().enumerate() {
                let level = 50.0 * (k + 1) as f64;
                let weekly = [0.0, 2.0, 4.0, 3.0, 1.0, 12.0, 15.0][(i % 7) as usize];
                rows.push(Observation::new(*key, date(i), level + weekly + 0.1 * i as f64));
            }
        }
        rows
    }

    fn options(days: i64) -> UdfOptions {
        let config = ModelerConfig::default()
            .model("arima_1", json!({ "m": 7 }))
            .current_date(date(days - 1));
        UdfOptions::new(config).today(date(days))
    }

    #[test]
    fn test_group_by_key() {
        let groups = group_by_key(table(&["b", "a"], 3));
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(groups["a"].len(), 3);
    }

    #[test]
    fn test_full_mode_forecasts_every_key_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let udf = ForecastUdf::new(store.clone(), options(56));
        let forecast = udf.apply(table(&["z", "m", "a"], 56));

        assert_eq!(forecast.len(), 21);
        let keys: Vec<&str> = forecast.iter().step_by(7).map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
        assert!(forecast.iter().all(|r| r.date >= date(56)));

        let deployed = store.list_models().unwrap();
        assert_eq!(deployed.len(), 3);
        assert!(deployed
            .iter()
            .all(|m| m.latest(Some(Stage::Production)).is_some()));
    }

    #[test]
    fn test_predict_only_skips_training() {
        let store = Arc::new(InMemoryStore::new());
        let udf = ForecastUdf::new(store.clone(), options(56).mode(UdfMode::PredictOnly));
        let forecast = udf.apply(table(&["a", "b"], 56));

        assert_eq!(forecast.len(), 14);
        assert!(store.list_models().unwrap().is_empty());
    }

    #[test]
    fn test_failing_group_contributes_no_rows() {
        let store = Arc::new(InMemoryStore::new());
        let mut options = options(56);
        options.config.fcst_competition_metric_weights = vec![1.0];
        let udf = ForecastUdf::new(store, options);
        assert!(udf.apply(table(&["a"], 56)).is_empty());
    }
}
