//! ARIMA(p, d, q) forecaster
//!
//! The series is differenced `d` times, an AR(p) part is solved from the
//! sample autocovariances with the Durbin-Levinson recursion, and a MA(q)
//! part is read off the autocorrelation of the AR residuals. Forecasts are
//! integrated back onto the level of the history they were made from.
//!
//! A fitted model can be applied to a different history through
//! [`HistoryForecaster::forecast_from`]: the coefficients are kept and the
//! new history only supplies lags and residuals.

use algorithm_spi::{HistoryForecaster, Predictor, Result, TsError};
use serde::{Deserialize, Serialize};

const MAX_ORDER: usize = 10;
const MAX_DIFFERENCING: usize = 2;
/// Reflection and MA coefficients are kept inside the unit circle
const COEFF_BOUND: f64 = 0.99;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arima {
    p: usize,
    d: usize,
    q: usize,
    ar_coeffs: Vec<f64>,
    ma_coeffs: Vec<f64>,
    /// Mean of the differenced series
    constant: f64,
    /// Training data, the default history for `predict`
    original_data: Vec<f64>,
    fitted: bool,
}

/// Biased sample autocovariances of `series` for lags `0..=max_lag`
fn autocovariances(series: &[f64], max_lag: usize) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return vec![0.0; max_lag + 1];
    }
    let mean = series.iter().sum::<f64>() / n as f64;
    (0..=max_lag)
        .map(|lag| {
            series
                .iter()
                .zip(series.iter().skip(lag))
                .map(|(a, b)| (a - mean) * (b - mean))
                .sum::<f64>()
                / n as f64
        })
        .collect()
}

impl Arima {
    /// Unfitted model; `p` and `q` go up to 10, `d` up to 2
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        let checks = [
            ("p", p, MAX_ORDER),
            ("d", d, MAX_DIFFERENCING),
            ("q", q, MAX_ORDER),
        ];
        for (name, value, max) in checks {
            if value > max {
                return Err(TsError::invalid_parameter(
                    name,
                    format!("order {} exceeds the maximum of {}", value, max),
                ));
            }
        }

        Ok(Self {
            p,
            d,
            q,
            ar_coeffs: vec![0.0; p],
            ma_coeffs: vec![0.0; q],
            constant: 0.0,
            original_data: Vec::new(),
            fitted: false,
        })
    }

    /// Apply differencing `order` times
    pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
        (0..order).fold(data.to_vec(), |series, _| {
            series.windows(2).map(|w| w[1] - w[0]).collect()
        })
    }

    /// Integrate forecasts made on the `d`-times differenced scale back to
    /// the scale of `history`.
    ///
    /// Level `k` of the differencing chain contributes its last value as the
    /// starting point of the cumulative sum, innermost level first.
    fn undifference(&self, history: &[f64], forecasts: &[f64]) -> Vec<f64> {
        if self.d == 0 {
            return forecasts.to_vec();
        }

        let levels: Vec<Vec<f64>> = (0..self.d)
            .map(|k| Self::difference(history, k))
            .collect();

        let mut result = forecasts.to_vec();
        for level in levels.iter().rev() {
            let mut last = level.last().copied().unwrap_or(0.0);
            for value in result.iter_mut() {
                last += *value;
                *value = last;
            }
        }

        result
    }

    /// AR coefficients from the Yule-Walker equations (Durbin-Levinson)
    fn estimate_ar_coefficients(&self, data: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.p];
        if self.p == 0 {
            return phi;
        }

        let gamma = autocovariances(data, self.p);
        let mut innovation = gamma[0];
        if innovation <= 1e-10 {
            return phi;
        }

        for k in 1..=self.p {
            let partial = gamma[k] - (1..k).map(|j| phi[j - 1] * gamma[k - j]).sum::<f64>();
            let reflection = (partial / innovation).clamp(-COEFF_BOUND, COEFF_BOUND);

            let previous = phi.clone();
            for j in 1..k {
                phi[j - 1] = previous[j - 1] - reflection * previous[k - j - 1];
            }
            phi[k - 1] = reflection;

            innovation *= 1.0 - reflection * reflection;
            if innovation <= 1e-12 {
                break;
            }
        }

        phi
    }

    /// MA coefficients as the residual autocorrelations at lags `1..=q`
    fn estimate_ma_coefficients(&self, residuals: &[f64]) -> Vec<f64> {
        let gamma = autocovariances(residuals, self.q);
        if residuals.is_empty() || gamma[0] <= 1e-10 {
            return vec![0.0; self.q];
        }
        gamma[1..]
            .iter()
            .map(|g| (g / gamma[0]).clamp(-COEFF_BOUND, COEFF_BOUND))
            .collect()
    }

    /// AR-only residuals, used to estimate the MA part
    fn ar_residuals(&self, differenced: &[f64]) -> Vec<f64> {
        let mut residuals = vec![0.0; differenced.len()];
        for i in self.p..differenced.len() {
            let mut prediction = self.constant;
            for j in 0..self.p {
                prediction += self.ar_coeffs[j] * (differenced[i - j - 1] - self.constant);
            }
            residuals[i] = differenced[i] - prediction;
        }
        residuals
    }

    /// One-step-ahead prediction at the end of `series` given its residuals
    fn one_step(&self, series: &[f64], residuals: &[f64]) -> f64 {
        let mut forecast = self.constant;
        for j in 0..self.p {
            if let Some(&value) = series.len().checked_sub(j + 1).and_then(|i| series.get(i)) {
                forecast += self.ar_coeffs[j] * (value - self.constant);
            }
        }
        for j in 0..self.q {
            if let Some(&error) = residuals
                .len()
                .checked_sub(j + 1)
                .and_then(|i| residuals.get(i))
            {
                forecast += self.ma_coeffs[j] * error;
            }
        }
        forecast
    }

    /// One-step-ahead in-sample residuals on the differenced scale
    fn one_step_residuals(&self, differenced: &[f64]) -> Vec<f64> {
        let mut residuals = Vec::with_capacity(differenced.len());
        for i in 0..differenced.len() {
            if i < self.p {
                residuals.push(0.0);
                continue;
            }
            let prediction = self.one_step(&differenced[..i], &residuals);
            residuals.push(differenced[i] - prediction);
        }
        residuals
    }

    /// Akaike information criterion of the fitted model on `data`
    ///
    /// Uses the one-step residuals of the differenced series, skipping the
    /// first `p` warm-up points. Returns `f64::INFINITY` when unfitted or
    /// when the residuals are not finite.
    pub fn aic(&self, data: &[f64]) -> f64 {
        if !self.fitted {
            return f64::INFINITY;
        }
        let differenced = Self::difference(data, self.d);
        let residuals = self.one_step_residuals(&differenced);
        let used = &residuals[self.p.min(residuals.len())..];
        if used.is_empty() || used.iter().any(|r| !r.is_finite()) {
            return f64::INFINITY;
        }

        let n = used.len() as f64;
        let sigma2 = (used.iter().map(|r| r * r).sum::<f64>() / n).max(1e-12);
        let k = (self.p + self.q + 1) as f64;
        n * sigma2.ln() + 2.0 * k
    }

    /// Get model orders
    pub fn params(&self) -> (usize, usize, usize) {
        (self.p, self.d, self.q)
    }

    /// Get AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    /// Get MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coeffs
    }

    /// Minimum number of points `fit` accepts
    pub fn min_fit_len(&self) -> usize {
        self.p + self.d + self.q + 10
    }

    /// Check that deserialized state matches its orders: `p` AR and `q` MA
    /// coefficients, all finite, and for a fitted model enough training data
    /// to forecast from.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.p, self.d, self.q)?;
        if self.ar_coeffs.len() != self.p || self.ma_coeffs.len() != self.q {
            return Err(TsError::InvalidData(format!(
                "ARIMA({}, {}, {}) holds {} AR and {} MA coefficients",
                self.p,
                self.d,
                self.q,
                self.ar_coeffs.len(),
                self.ma_coeffs.len()
            )));
        }
        let coefficients = self.ar_coeffs.iter().chain(&self.ma_coeffs);
        if !self.constant.is_finite() || coefficients.clone().any(|c| !c.is_finite()) {
            return Err(TsError::InvalidData("non-finite ARIMA coefficients".to_string()));
        }
        if self.fitted && self.original_data.len() < self.min_fit_len() {
            return Err(TsError::InsufficientData {
                required: self.min_fit_len(),
                actual: self.original_data.len(),
            });
        }
        Ok(())
    }
}

impl Predictor for Arima {
    fn fit(&mut self, data: &[f64]) -> Result<()> {
        let min_required = self.min_fit_len();
        if data.len() < min_required {
            return Err(TsError::InsufficientData {
                required: min_required,
                actual: data.len(),
            });
        }

        if data.iter().any(|x| !x.is_finite()) {
            return Err(TsError::InvalidData(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        self.original_data = data.to_vec();
        let differenced = Self::difference(data, self.d);
        self.constant = differenced.iter().sum::<f64>() / differenced.len() as f64;
        self.ar_coeffs = self.estimate_ar_coefficients(&differenced);

        let residuals = self.ar_residuals(&differenced);
        self.ma_coeffs = self.estimate_ma_coefficients(&residuals[self.p..]);

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(TsError::NotFitted);
        }
        self.forecast_from(&self.original_data, steps)
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl HistoryForecaster for Arima {
    fn forecast_from(&self, history: &[f64], steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(TsError::NotFitted);
        }

        if steps == 0 {
            return Ok(Vec::new());
        }

        let required = self.d + self.p.max(1);
        if history.len() < required {
            return Err(TsError::InsufficientData {
                required,
                actual: history.len(),
            });
        }
        if history.iter().any(|x| !x.is_finite()) {
            return Err(TsError::InvalidData(
                "History contains NaN or infinite values".to_string(),
            ));
        }

        let mut extended = Self::difference(history, self.d);
        let mut residuals = self.one_step_residuals(&extended);
        let n = extended.len();

        // Future residuals are 0
        for _ in 0..steps {
            let forecast = self.one_step(&extended, &residuals);
            extended.push(forecast);
            residuals.push(0.0);
        }

        let forecasts = self.undifference(history, &extended[n..]);
        if forecasts.iter().any(|x| !x.is_finite()) {
            return Err(TsError::NumericalError(
                "ARIMA recursion diverged".to_string(),
            ));
        }
        Ok(forecasts)
    }
}
