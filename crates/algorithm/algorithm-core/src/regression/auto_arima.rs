//! Automatic ARIMA order selection
//!
//! Seasonal differencing at lag `m` (when requested and the series is long
//! enough), a variance test for the regular differencing order `d`, and an
//! AIC grid over `p` and `q`.

use algorithm_spi::{HistoryForecaster, Predictor, Result, TsError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::arima::Arima;

const MAX_P: usize = 3;
const MAX_Q: usize = 2;
const MAX_D: usize = 2;

/// ARIMA with automatic order selection and optional seasonal differencing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoArima {
    /// Seasonal period
    m: usize,
    /// Whether seasonal differencing may be used
    seasonal: bool,
    /// Whether the fitted model differences at lag `m`
    seasonal_differencing: bool,
    /// Selected model, on the seasonally differenced scale if applicable
    model: Option<Arima>,
    /// Training data, the default history for `predict`
    original_data: Vec<f64>,
}

impl AutoArima {
    /// Create an unfitted model
    ///
    /// # Arguments
    ///
    /// * `m` - Seasonal period (values below 2 disable seasonality)
    /// * `seasonal` - Whether to consider seasonal differencing
    pub fn new(m: usize, seasonal: bool) -> Self {
        Self {
            m,
            seasonal,
            seasonal_differencing: false,
            model: None,
            original_data: Vec::new(),
        }
    }

    /// Seasonal period
    pub fn m(&self) -> usize {
        self.m
    }

    /// Whether seasonality is enabled
    pub fn seasonal(&self) -> bool {
        self.seasonal
    }

    /// Selected `(p, d, q)` orders, once fitted
    pub fn order(&self) -> Option<(usize, usize, usize)> {
        self.model.as_ref().map(Arima::params)
    }

    /// Whether the fitted model uses lag-`m` differencing
    pub fn uses_seasonal_differencing(&self) -> bool {
        self.seasonal_differencing
    }

    /// Check deserialized state: the selected model must be consistent and
    /// seasonal differencing needs a period of at least 2.
    pub fn validate(&self) -> Result<()> {
        if self.seasonal_differencing && self.m < 2 {
            return Err(TsError::invalid_parameter(
                "m",
                format!("seasonal differencing with period {}", self.m),
            ));
        }
        match &self.model {
            Some(model) => model.validate(),
            None => Ok(()),
        }
    }

    /// Lag-`lag` differences of `data`
    pub fn seasonal_difference(data: &[f64], lag: usize) -> Vec<f64> {
        if data.len() <= lag {
            return Vec::new();
        }
        (lag..data.len()).map(|i| data[i] - data[i - lag]).collect()
    }

    /// Pick the differencing order that keeps reducing the variance
    fn select_d(data: &[f64]) -> usize {
        let mut d = 0;
        let mut current = data.to_vec();
        while d < MAX_D {
            let next = Arima::difference(&current, 1);
            if next.len() < 3 || variance(&next) >= variance(&current) {
                break;
            }
            current = next;
            d += 1;
        }
        d
    }
}

fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

impl Predictor for AutoArima {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.iter().any(|x| !x.is_finite()) {
            return Err(TsError::InvalidData(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        self.seasonal_differencing =
            self.seasonal && self.m >= 2 && data.len() >= 2 * self.m + 10;
        let working = if self.seasonal_differencing {
            Self::seasonal_difference(data, self.m)
        } else {
            data.to_vec()
        };

        let d = Self::select_d(&working);

        let mut best: Option<(f64, Arima)> = None;
        let mut last_error = TsError::InsufficientData {
            required: d + 10,
            actual: working.len(),
        };

        for p in 0..=MAX_P {
            for q in 0..=MAX_Q {
                let mut candidate = Arima::new(p, d, q)?;
                if let Err(e) = candidate.fit(&working) {
                    last_error = e;
                    continue;
                }
                let aic = candidate.aic(&working);
                if !aic.is_finite() {
                    continue;
                }
                let better = best.as_ref().map_or(true, |(best_aic, _)| aic < *best_aic);
                if better {
                    best = Some((aic, candidate));
                }
            }
        }

        let (aic, model) = best.ok_or(last_error)?;
        debug!(
            order = ?model.params(),
            seasonal_differencing = self.seasonal_differencing,
            aic,
            "auto-arima order selected"
        );

        self.model = Some(model);
        self.original_data = data.to_vec();
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        self.forecast_from(&self.original_data, steps)
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}

impl HistoryForecaster for AutoArima {
    fn forecast_from(&self, history: &[f64], steps: usize) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or(TsError::NotFitted)?;

        if !self.seasonal_differencing {
            return model.forecast_from(history, steps);
        }

        if history.len() <= self.m {
            return Err(TsError::InsufficientData {
                required: self.m + 1,
                actual: history.len(),
            });
        }

        let working = Self::seasonal_difference(history, self.m);
        let differenced = model.forecast_from(&working, steps)?;

        // Undo the lag-m differencing: y[t] = y[t - m] + w[t]
        let mut extended = history.to_vec();
        for value in differenced {
            let base = extended[extended.len() - self.m];
            extended.push(base + value);
        }
        Ok(extended[history.len()..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly_series(n: usize) -> Vec<f64> {
        let pattern = [10.0, 12.0, 14.0, 13.0, 11.0, 20.0, 22.0];
        (0..n).map(|i| pattern[i % 7] + 0.1 * i as f64).collect()
    }

    #[test]
    fn test_validate_restored_state() {
        let mut model = AutoArima::new(7, true);
        model.fit(&weekly_series(70)).unwrap();
        assert!(model.validate().is_ok());

        let mut no_period = model.clone();
        no_period.m = 0;
        assert!(no_period.validate().is_err());

        // more AR coefficients than any selectable order
        let mut state = serde_json::to_value(&model).unwrap();
        state["model"]["ar_coeffs"] = serde_json::json!([0.1, 0.1, 0.1, 0.1, 0.1]);
        let tampered: AutoArima = serde_json::from_value(state).unwrap();
        assert!(matches!(tampered.validate(), Err(TsError::InvalidData(_))));
    }

    #[test]
    fn test_seasonal_difference() {
        let data = vec![1.0, 2.0, 3.0, 5.0, 7.0, 9.0];
        assert_eq!(AutoArima::seasonal_difference(&data, 3), vec![4.0, 5.0, 6.0]);
        assert!(AutoArima::seasonal_difference(&data, 6).is_empty());
    }

    #[test]
    fn test_select_d_on_trend() {
        let trend: Vec<f64> = (0..50).map(|i| 3.0 * i as f64).collect();
        assert!(AutoArima::select_d(&trend) >= 1);

        let alternating: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(AutoArima::select_d(&alternating), 0);
    }

    #[test]
    fn test_fit_predict_seasonal() {
        let data = weekly_series(70);
        let mut model = AutoArima::new(7, true);
        model.fit(&data).unwrap();

        assert!(model.is_fitted());
        assert!(model.uses_seasonal_differencing());
        assert!(model.order().is_some());

        let forecast = model.predict(7).unwrap();
        assert_eq!(forecast.len(), 7);

        // The weekly pattern repeats with a small drift.
        let expected: Vec<f64> = weekly_series(77)[70..].to_vec();
        for (f, e) in forecast.iter().zip(expected.iter()) {
            assert!((f - e).abs() < 2.0, "forecast {} vs expected {}", f, e);
        }
    }

    #[test]
    fn test_short_series_skips_seasonal_differencing() {
        let data = weekly_series(20);
        let mut model = AutoArima::new(7, true);
        model.fit(&data).unwrap();
        assert!(!model.uses_seasonal_differencing());
        assert_eq!(model.predict(3).unwrap().len(), 3);
    }

    #[test]
    fn test_non_seasonal() {
        let data: Vec<f64> = (0..40).map(|i| 2.0 * i as f64 + 1.0).collect();
        let mut model = AutoArima::new(1, true);
        model.fit(&data).unwrap();
        assert!(!model.uses_seasonal_differencing());

        let forecast = model.predict(2).unwrap();
        assert!((forecast[0] - 81.0).abs() < 1.0);
    }

    #[test]
    fn test_too_little_data() {
        let mut model = AutoArima::new(7, true);
        assert!(model.fit(&[1.0, 2.0, 3.0]).is_err());
        assert!(!model.is_fitted());
        assert_eq!(model.predict(1), Err(TsError::NotFitted));
    }

    #[test]
    fn test_forecast_from_requires_season_of_history() {
        let data = weekly_series(70);
        let mut model = AutoArima::new(7, true);
        model.fit(&data).unwrap();
        assert!(matches!(
            model.forecast_from(&data[..5], 3),
            Err(TsError::InsufficientData { .. })
        ));
    }
}
