use std::collections::BTreeMap;

use algorithm_core::{AutoArima, HistoryForecaster, Predictor};
use chrono::NaiveDate;
use modeler_api::ArimaConfig;
use modeler_spi::{ForecastModel, ForecastPoint, ModelFlavor, Observation, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Automatic ARIMA on the value sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaModel {
    config: ArimaConfig,
    engine: AutoArima,
}

impl ArimaModel {
    pub fn new(config: ArimaConfig) -> Self {
        let engine = AutoArima::new(config.m, config.seasonal);
        Self { config, engine }
    }

    /// Restore a model written by [`ForecastModel::to_artifact`]
    pub fn from_artifact(artifact: &Value) -> Result<Self> {
        let model: Self = super::from_artifact(ModelFlavor::Arima, artifact)?;
        super::check_restored(ModelFlavor::Arima, model.engine.validate())?;
        Ok(model)
    }

    /// Selected `(p, d, q)`, once fitted
    pub fn order(&self) -> Option<(usize, usize, usize)> {
        self.engine.order()
    }
}

impl ForecastModel for ArimaModel {
    fn flavor(&self) -> ModelFlavor {
        ModelFlavor::Arima
    }

    fn params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("m".to_string(), self.config.m.to_string()),
            ("seasonal".to_string(), self.config.seasonal.to_string()),
        ])
    }

    fn fit(&mut self, train: &[Observation]) -> Result<()> {
        self.engine.fit(&super::values(train))?;
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.engine.is_fitted()
    }

    fn forecast_days(
        &self,
        history: &[Observation],
        dates: &[NaiveDate],
    ) -> Result<Vec<ForecastPoint>> {
        let values = self
            .engine
            .forecast_from(&super::values(history), dates.len())?;
        Ok(super::points(dates, values))
    }

    fn to_artifact(&self) -> Result<Value> {
        if !self.is_fitted() {
            return Err(algorithm_core::TsError::NotFitted.into());
        }
        super::to_artifact(ModelFlavor::Arima, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use modeler_spi::ModelerError;

    fn series(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let pattern = [10.0, 12.0, 14.0, 13.0, 11.0, 20.0, 22.0];
        (0..n)
            .map(|i| {
                Observation::new("k", start + Duration::days(i as i64), pattern[i % 7] + 0.05 * i as f64)
            })
            .collect()
    }

    #[test]
    fn test_fit_predict_and_restore() {
        let data = series(70);
        let mut model = ArimaModel::new(ArimaConfig::default());
        assert!(model.to_artifact().is_err());
        model.fit(&data[..63]).unwrap();
        assert!(model.order().is_some());

        let first = data[63].date;
        let points = model.predict(&data, 7, first, true).unwrap();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].date, first);

        let artifact = model.to_artifact().unwrap();
        assert_eq!(artifact["model_flavor"], "arima");
        let restored = ArimaModel::from_artifact(&artifact).unwrap();
        assert_eq!(restored.predict(&data, 7, first, true).unwrap(), points);
    }

    #[test]
    fn test_restore_rejects_mismatched_coefficients() {
        let data = series(70);
        let mut model = ArimaModel::new(ArimaConfig::default());
        model.fit(&data).unwrap();

        let mut artifact = model.to_artifact().unwrap();
        // more AR coefficients than any selectable order
        artifact["state"]["engine"]["model"]["ar_coeffs"] =
            serde_json::json!([0.2, 0.2, 0.2, 0.2, 0.2]);
        assert!(matches!(
            ArimaModel::from_artifact(&artifact),
            Err(ModelerError::InvalidState(_))
        ));
    }

    #[test]
    fn test_params() {
        let model = ArimaModel::new(ArimaConfig { m: 12, seasonal: false });
        let params = model.params();
        assert_eq!(params["m"], "12");
        assert_eq!(params["seasonal"], "false");
    }
}
