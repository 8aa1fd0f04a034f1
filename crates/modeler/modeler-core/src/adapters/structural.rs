use std::collections::BTreeMap;

use algorithm_core::{StructuralModel as Engine, TsError};
use chrono::NaiveDate;
use modeler_api::StructuralConfig;
use modeler_spi::{ForecastModel, ForecastPoint, ModelFlavor, Observation, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trend, seasonality and holiday regression on calendar dates
///
/// Forecasts depend on the dates only, so the history passed to
/// `forecast_days` is not used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralModel {
    config: StructuralConfig,
    engine: Engine,
}

impl StructuralModel {
    /// `cap` bounds logistic growth; the modeler passes the series maximum.
    pub fn new(config: StructuralConfig, cap: f64) -> Result<Self> {
        let engine = Engine::new(config.to_params(cap))?;
        Ok(Self { config, engine })
    }

    pub fn from_artifact(artifact: &Value) -> Result<Self> {
        let model: Self = super::from_artifact(ModelFlavor::Structural, artifact)?;
        super::check_restored(ModelFlavor::Structural, model.engine.validate())?;
        Ok(model)
    }
}

impl ForecastModel for StructuralModel {
    fn flavor(&self) -> ModelFlavor {
        ModelFlavor::Structural
    }

    fn params(&self) -> BTreeMap<String, String> {
        let params = self.engine.params();
        let mut logged = BTreeMap::new();
        logged.insert("interval_width".to_string(), params.interval_width.to_string());
        logged.insert("growth".to_string(), format!("{:?}", params.growth).to_lowercase());
        logged.insert(
            "seasonality_mode".to_string(),
            format!("{:?}", params.seasonality_mode).to_lowercase(),
        );
        logged.insert("weekly_seasonality".to_string(), params.weekly_seasonality.to_string());
        logged.insert("yearly_seasonality".to_string(), params.yearly_seasonality.to_string());
        logged.insert("daily_seasonality".to_string(), params.daily_seasonality.to_string());
        if let Some(cap) = params.cap {
            logged.insert("cap".to_string(), cap.to_string());
        }
        if let Some(country) = &self.config.country_holidays {
            logged.insert("country_holidays".to_string(), country.clone());
        }
        logged
    }

    fn fit(&mut self, train: &[Observation]) -> Result<()> {
        let dates: Vec<NaiveDate> = train.iter().map(|o| o.date).collect();
        self.engine.fit(&dates, &super::values(train))?;
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.engine.is_fitted()
    }

    fn forecast_days(
        &self,
        _history: &[Observation],
        dates: &[NaiveDate],
    ) -> Result<Vec<ForecastPoint>> {
        let forecasts = self.engine.predict_dates(dates)?;
        Ok(dates
            .iter()
            .zip(forecasts)
            .map(|(&date, f)| ForecastPoint {
                date,
                value: f.value,
                lower: Some(f.lower),
                upper: Some(f.upper),
            })
            .collect())
    }

    fn to_artifact(&self) -> Result<Value> {
        if !self.is_fitted() {
            return Err(TsError::NotFitted.into());
        }
        super::to_artifact(ModelFlavor::Structural, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use algorithm_core::prelude::Growth;
    use chrono::Duration;
    use modeler_spi::ModelerError;

    fn series(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        (0..n)
            .map(|i| {
                let weekend = if i % 7 >= 5 { 10.0 } else { 0.0 };
                Observation::new("k", start + Duration::days(i as i64), 50.0 + 0.2 * i as f64 + weekend)
            })
            .collect()
    }

    #[test]
    fn test_interval_forecast() {
        let data = series(56);
        let config = StructuralConfig {
            country_holidays: None,
            ..StructuralConfig::default()
        };
        let mut model = StructuralModel::new(config, 70.0).unwrap();
        model.fit(&data[..49]).unwrap();

        let points = model.predict(&data, 7, data[49].date, true).unwrap();
        assert_eq!(points.len(), 7);
        for p in &points {
            let (lower, upper) = (p.lower.unwrap(), p.upper.unwrap());
            assert!(lower <= p.value && p.value <= upper);
        }

        let restored = StructuralModel::from_artifact(&model.to_artifact().unwrap()).unwrap();
        assert_eq!(restored.predict(&data, 7, data[49].date, true).unwrap(), points);
    }

    #[test]
    fn test_restore_rejects_missing_trend() {
        let data = series(56);
        let mut model = StructuralModel::new(StructuralConfig::default(), 70.0).unwrap();
        model.fit(&data).unwrap();

        let mut artifact = model.to_artifact().unwrap();
        artifact["state"]["engine"]["trend_coeffs"] = serde_json::json!([]);
        assert!(matches!(
            StructuralModel::from_artifact(&artifact),
            Err(ModelerError::InvalidState(_))
        ));
    }

    #[test]
    fn test_logistic_needs_cap_above_floor() {
        let config = StructuralConfig {
            growth: Growth::Logistic,
            ..StructuralConfig::default()
        };
        assert!(StructuralModel::new(config.clone(), 0.0).is_err());
        let model = StructuralModel::new(config, 100.0).unwrap();
        assert_eq!(model.params()["cap"], "100");
        assert_eq!(model.params()["growth"], "logistic");
    }
}
