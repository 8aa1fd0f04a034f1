use std::collections::BTreeMap;

use algorithm_core::{HistoryForecaster, NeuralForecaster, Predictor, TsError};
use algorithm_spi::NeuralParams;
use chrono::NaiveDate;
use modeler_api::NeuralConfig;
use modeler_spi::{ForecastModel, ForecastPoint, ModelFlavor, Observation, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Neural autoregressor over the last `n_inputs` values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuralModel {
    config: NeuralConfig,
    engine: NeuralForecaster,
}

impl NeuralModel {
    pub fn new(config: NeuralConfig) -> Result<Self> {
        let engine = NeuralForecaster::new(NeuralParams::from(&config))?;
        Ok(Self { config, engine })
    }

    pub fn from_artifact(artifact: &Value) -> Result<Self> {
        let model: Self = super::from_artifact(ModelFlavor::Neural, artifact)?;
        super::check_restored(ModelFlavor::Neural, model.engine.validate())?;
        Ok(model)
    }
}

impl ForecastModel for NeuralModel {
    fn flavor(&self) -> ModelFlavor {
        ModelFlavor::Neural
    }

    fn params(&self) -> BTreeMap<String, String> {
        let c = &self.config;
        BTreeMap::from([
            ("nn_type".to_string(), format!("{:?}", c.nn_type).to_lowercase()),
            ("n_units".to_string(), c.n_units.to_string()),
            ("activation".to_string(), format!("{:?}", c.activation).to_lowercase()),
            ("epochs".to_string(), c.epochs.to_string()),
            ("n_inputs".to_string(), c.n_inputs.to_string()),
            ("learning_rate".to_string(), c.learning_rate.to_string()),
            ("seed".to_string(), c.seed.to_string()),
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
            return Err(TsError::NotFitted.into());
        }
        super::to_artifact(ModelFlavor::Neural, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use modeler_spi::ModelerError;

    fn series(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        (0..n)
            .map(|i| Observation::new("k", start + Duration::days(i as i64), 20.0 + (i % 7) as f64))
            .collect()
    }

    fn small() -> NeuralConfig {
        NeuralConfig {
            n_units: 8,
            n_inputs: 7,
            epochs: 5,
            ..NeuralConfig::default()
        }
    }

    #[test]
    fn test_fit_predict_and_restore() {
        let data = series(42);
        let mut model = NeuralModel::new(small()).unwrap();
        model.fit(&data[..35]).unwrap();

        let points = model.predict(&data, 7, data[35].date, true).unwrap();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| p.value.is_finite()));

        let restored = NeuralModel::from_artifact(&model.to_artifact().unwrap()).unwrap();
        assert_eq!(restored.predict(&data, 7, data[35].date, true).unwrap(), points);
    }

    #[test]
    fn test_restore_rejects_truncated_weights() {
        let data = series(42);
        let mut model = NeuralModel::new(small()).unwrap();
        model.fit(&data).unwrap();

        let mut artifact = model.to_artifact().unwrap();
        artifact["state"]["engine"]["weights"] = serde_json::json!([]);
        assert!(matches!(
            NeuralModel::from_artifact(&artifact),
            Err(ModelerError::InvalidState(_))
        ));
    }

    #[test]
    fn test_gated_networks_from_config() {
        for nn_type in ["lstm", "gru"] {
            let config: NeuralConfig = serde_json::from_value(serde_json::json!({
                "nn_type": nn_type,
                "n_units": 4,
                "n_inputs": 7,
                "epochs": 3
            }))
            .unwrap();
            let data = series(30);
            let mut model = NeuralModel::new(config).unwrap();
            model.fit(&data[..23]).unwrap();
            assert_eq!(model.params()["nn_type"], nn_type);

            let points = model.predict(&data, 7, data[23].date, true).unwrap();
            assert_eq!(points.len(), 7);
            assert!(points.iter().all(|p| p.value.is_finite()));
        }
    }

    #[test]
    fn test_short_history() {
        let data = series(5);
        let mut model = NeuralModel::new(small()).unwrap();
        assert!(matches!(
            model.fit(&data),
            Err(ModelerError::Algorithm(TsError::InsufficientData { .. }))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let config = NeuralConfig {
            n_units: 0,
            ..NeuralConfig::default()
        };
        assert!(NeuralModel::new(config).is_err());
    }
}
