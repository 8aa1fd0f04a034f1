//! Structural time series model on calendar dates
//!
//! Decomposes a daily series into
//!
//! - a **trend**: linear, flat, or logistic between `floor` and `cap`
//! - **weekly** and **yearly** Fourier seasonality
//! - a national **holiday** effect
//!
//! Seasonal and holiday effects are fitted on the detrended series, either as
//! an additive offset or as a relative deviation from the trend
//! (multiplicative mode). Prediction intervals use the in-sample residual
//! spread and the normal quantile of `interval_width`.

pub mod holidays;

use std::f64::consts::PI;

use algorithm_spi::{Growth, Result, SeasonalityMode, StructuralParams, TsError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::regression::solve_ridge;
pub use holidays::HolidayCalendar;

const WEEKLY_ORDER: usize = 3;
const YEARLY_ORDER: usize = 10;
const YEAR_DAYS: f64 = 365.25;
/// History span (days) needed before a seasonality is fitted
const WEEKLY_MIN_SPAN: i64 = 14;
const YEARLY_MIN_SPAN: i64 = 365;
const MIN_POINTS: usize = 3;
/// Logistic targets are clamped into (BOUND, 1 - BOUND) before the logit
const LOGISTIC_BOUND: f64 = 0.01;

/// A point forecast with its prediction interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalForecast {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Trend + seasonality + holidays regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralModel {
    params: StructuralParams,
    calendar: Option<HolidayCalendar>,
    /// First training date; trend time is measured from here
    origin: Option<NaiveDate>,
    /// Training span in days, used to scale trend time into [0, 1]
    t_scale: f64,
    trend_coeffs: Vec<f64>,
    seasonal_coeffs: Vec<f64>,
    use_weekly: bool,
    use_yearly: bool,
    floor: f64,
    cap: f64,
    /// Standard deviation of in-sample residuals
    sigma: f64,
    /// Normal quantile for the interval half-width
    z: f64,
}

impl StructuralModel {
    /// Create an unfitted model
    pub fn new(params: StructuralParams) -> Result<Self> {
        if !(0.0 < params.interval_width && params.interval_width < 1.0) {
            return Err(TsError::invalid_parameter(
                "interval_width",
                "must be between 0 and 1 (exclusive)",
            ));
        }

        let floor = params.floor.unwrap_or(0.0);
        let cap = params.cap.unwrap_or(floor);
        if params.growth == Growth::Logistic {
            if params.cap.is_none() {
                return Err(TsError::invalid_parameter(
                    "cap",
                    "logistic growth requires a cap",
                ));
            }
            if !(cap > floor) || !cap.is_finite() {
                return Err(TsError::invalid_parameter(
                    "cap",
                    format!("cap {} must be greater than floor {}", cap, floor),
                ));
            }
        }

        let calendar = params
            .country_holidays
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(HolidayCalendar::for_country)
            .transpose()?;

        let z = normal_quantile(0.5 + params.interval_width / 2.0);

        Ok(Self {
            params,
            calendar,
            origin: None,
            t_scale: 1.0,
            trend_coeffs: Vec::new(),
            seasonal_coeffs: Vec::new(),
            use_weekly: false,
            use_yearly: false,
            floor,
            cap,
            sigma: 0.0,
            z,
        })
    }

    /// Model parameters
    pub fn params(&self) -> &StructuralParams {
        &self.params
    }

    /// Whether the model has been fitted
    pub fn is_fitted(&self) -> bool {
        self.origin.is_some()
    }

    /// Standard deviation of in-sample residuals
    pub fn residual_std(&self) -> f64 {
        self.sigma
    }

    /// Check deserialized state.
    ///
    /// A fitted model needs the trend coefficients of its growth, one
    /// seasonal coefficient per regressor, a positive time scale and, for
    /// logistic growth, a cap above the floor.
    pub fn validate(&self) -> Result<()> {
        let Some(origin) = self.origin else {
            return Ok(());
        };

        let trend_len = match self.params.growth {
            Growth::Flat => 1,
            Growth::Linear | Growth::Logistic => 2,
        };
        if self.trend_coeffs.len() != trend_len {
            return Err(TsError::InvalidData(format!(
                "{} trend needs {} coefficients, found {}",
                self.params.growth,
                trend_len,
                self.trend_coeffs.len()
            )));
        }

        let regressors = self.features(origin).len();
        if self.seasonal_coeffs.len() != regressors {
            return Err(TsError::InvalidData(format!(
                "{} seasonal regressors but {} coefficients",
                regressors,
                self.seasonal_coeffs.len()
            )));
        }

        let finite = self
            .trend_coeffs
            .iter()
            .chain(&self.seasonal_coeffs)
            .chain([&self.sigma, &self.z])
            .all(|x| x.is_finite());
        if !finite || !(self.t_scale.is_finite() && self.t_scale > 0.0) {
            return Err(TsError::InvalidData(
                "non-finite structural model state".to_string(),
            ));
        }
        if self.params.growth == Growth::Logistic && !(self.cap > self.floor) {
            return Err(TsError::invalid_parameter(
                "cap",
                format!("cap {} must be greater than floor {}", self.cap, self.floor),
            ));
        }
        Ok(())
    }

    /// Fit on dated observations sorted by date
    pub fn fit(&mut self, dates: &[NaiveDate], values: &[f64]) -> Result<()> {
        if dates.len() != values.len() {
            return Err(TsError::InvalidData(format!(
                "{} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if values.len() < MIN_POINTS {
            return Err(TsError::InsufficientData {
                required: MIN_POINTS,
                actual: values.len(),
            });
        }
        if values.iter().any(|x| !x.is_finite()) {
            return Err(TsError::InvalidData(
                "Data contains NaN or infinite values".to_string(),
            ));
        }

        let origin = dates[0];
        let span = (dates[dates.len() - 1] - origin).num_days();
        self.origin = Some(origin);
        self.t_scale = span.max(1) as f64;
        self.use_weekly = self.params.weekly_seasonality && span >= WEEKLY_MIN_SPAN;
        self.use_yearly = self.params.yearly_seasonality && span >= YEARLY_MIN_SPAN;
        if self.params.daily_seasonality {
            debug!("daily seasonality has no effect on daily observations");
        }

        if let Err(e) = self.fit_trend(dates, values) {
            self.origin = None;
            return Err(e);
        }

        let trend: Vec<f64> = dates.iter().map(|&d| self.trend_at(d)).collect();
        let target: Vec<f64> = values
            .iter()
            .zip(trend.iter())
            .map(|(&y, &t)| match self.params.seasonality_mode {
                SeasonalityMode::Additive => y - t,
                SeasonalityMode::Multiplicative => {
                    if t.abs() < 1e-9 {
                        0.0
                    } else {
                        y / t - 1.0
                    }
                }
            })
            .collect();

        let design: Vec<Vec<f64>> = dates.iter().map(|&d| self.features(d)).collect();
        let ridge = 1e-3 * values.len() as f64;
        self.seasonal_coeffs = match solve_ridge(&design, &target, ridge) {
            Ok(coeffs) => coeffs,
            Err(e) => {
                self.origin = None;
                return Err(e);
            }
        };

        let n = values.len() as f64;
        let sse: f64 = dates
            .iter()
            .zip(values.iter())
            .map(|(&d, &y)| (y - self.point_at(d)).powi(2))
            .sum();
        self.sigma = (sse / n).sqrt();

        debug!(
            growth = %self.params.growth,
            mode = %self.params.seasonality_mode,
            weekly = self.use_weekly,
            yearly = self.use_yearly,
            holidays = self.calendar.is_some(),
            sigma = self.sigma,
            "structural model fitted"
        );
        Ok(())
    }

    /// Predict the given dates
    pub fn predict_dates(&self, dates: &[NaiveDate]) -> Result<Vec<IntervalForecast>> {
        if !self.is_fitted() {
            return Err(TsError::NotFitted);
        }
        let half_width = self.z * self.sigma;
        Ok(dates
            .iter()
            .map(|&d| {
                let value = self.point_at(d);
                IntervalForecast {
                    value,
                    lower: value - half_width,
                    upper: value + half_width,
                }
            })
            .collect())
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        let origin = self.origin.unwrap_or(date);
        (date - origin).num_days() as f64 / self.t_scale
    }

    fn fit_trend(&mut self, dates: &[NaiveDate], values: &[f64]) -> Result<()> {
        let n = values.len() as f64;
        self.trend_coeffs = match self.params.growth {
            Growth::Flat => vec![values.iter().sum::<f64>() / n],
            Growth::Linear => {
                let design: Vec<Vec<f64>> = dates
                    .iter()
                    .map(|&d| vec![1.0, self.scaled_time(d)])
                    .collect();
                solve_ridge(&design, values, 1e-9)?
            }
            Growth::Logistic => {
                let range = self.cap - self.floor;
                let logits: Vec<f64> = values
                    .iter()
                    .map(|&y| {
                        let p = ((y - self.floor) / range).clamp(LOGISTIC_BOUND, 1.0 - LOGISTIC_BOUND);
                        (p / (1.0 - p)).ln()
                    })
                    .collect();
                let design: Vec<Vec<f64>> = dates
                    .iter()
                    .map(|&d| vec![1.0, self.scaled_time(d)])
                    .collect();
                solve_ridge(&design, &logits, 1e-9)?
            }
        };
        Ok(())
    }

    fn trend_at(&self, date: NaiveDate) -> f64 {
        let t = self.scaled_time(date);
        match self.params.growth {
            Growth::Flat => self.trend_coeffs[0],
            Growth::Linear => self.trend_coeffs[0] + self.trend_coeffs[1] * t,
            Growth::Logistic => {
                let z = self.trend_coeffs[0] + self.trend_coeffs[1] * t;
                self.floor + (self.cap - self.floor) / (1.0 + (-z).exp())
            }
        }
    }

    /// Seasonal and holiday regressors of one date
    fn features(&self, date: NaiveDate) -> Vec<f64> {
        let day = date.num_days_from_ce() as f64;
        let mut row = Vec::new();
        if self.use_weekly {
            fourier(day, 7.0, WEEKLY_ORDER, &mut row);
        }
        if self.use_yearly {
            fourier(day, YEAR_DAYS, YEARLY_ORDER, &mut row);
        }
        if let Some(calendar) = &self.calendar {
            row.push(if calendar.is_holiday(date) { 1.0 } else { 0.0 });
        }
        row
    }

    fn point_at(&self, date: NaiveDate) -> f64 {
        let trend = self.trend_at(date);
        let seasonal: f64 = self
            .features(date)
            .iter()
            .zip(self.seasonal_coeffs.iter())
            .map(|(x, b)| x * b)
            .sum();
        match self.params.seasonality_mode {
            SeasonalityMode::Additive => trend + seasonal,
            SeasonalityMode::Multiplicative => trend * (1.0 + seasonal),
        }
    }
}

fn fourier(day: f64, period: f64, order: usize, row: &mut Vec<f64>) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * day / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}

/// Inverse of the standard normal CDF (Acklam's rational approximation)
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
