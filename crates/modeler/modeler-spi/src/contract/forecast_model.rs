use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::error::{ModelerError, Result};
use crate::model::{ForecastPoint, ModelFlavor, Observation};

/// A trainable model forecasting calendar days.
///
/// Engines only implement [`forecast_days`](ForecastModel::forecast_days);
/// the date bookkeeping of [`predict`](ForecastModel::predict) is shared.
pub trait ForecastModel: Send {
    fn flavor(&self) -> ModelFlavor;

    /// Hyper-parameters, logged with the training run
    fn params(&self) -> BTreeMap<String, String>;

    /// Fit on training rows sorted by date
    fn fit(&mut self, train: &[Observation]) -> Result<()>;

    fn is_fitted(&self) -> bool;

    /// Forecast `dates`, the consecutive days following the last row of
    /// `history`. Returns one point per date.
    fn forecast_days(
        &self,
        history: &[Observation],
        dates: &[NaiveDate],
    ) -> Result<Vec<ForecastPoint>>;

    /// Serialized fitted state, tagged with the flavor
    fn to_artifact(&self) -> Result<Value>;

    /// Forecast `n_days` days from `fcst_first_date` using the rows of `data`
    /// (sorted by date) observed before that date.
    ///
    /// The model forecasts every day after the last observed one. Days before
    /// `fcst_first_date` are dropped when `future_only` is set.
    fn predict(
        &self,
        data: &[Observation],
        n_days: usize,
        fcst_first_date: NaiveDate,
        future_only: bool,
    ) -> Result<Vec<ForecastPoint>> {
        let end = data.partition_point(|o| o.date < fcst_first_date);
        let history = &data[..end];
        let last_observed = history
            .last()
            .map(|o| o.date)
            .ok_or(ModelerError::InsufficientData {
                required: 1,
                actual: 0,
            })?;

        let dates = forecast_dates(last_observed, fcst_first_date, n_days);
        let points = self.forecast_days(history, &dates)?;
        if points.len() != dates.len() {
            return Err(ModelerError::InvalidState(format!(
                "{} model returned {} points for {} days",
                self.flavor(),
                points.len(),
                dates.len()
            )));
        }

        Ok(points
            .into_iter()
            .filter(|p| !future_only || p.date >= fcst_first_date)
            .collect())
    }
}

/// Days the model has to forecast to reach `n_days` days from
/// `fcst_first_date`: every day from `last_observed + 1` through
/// `fcst_first_date + n_days - 1`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use modeler_spi::forecast_dates;
///
/// let last = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
/// let first = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
/// let dates = forecast_dates(last, first, 2);
/// assert_eq!(dates.len(), 4); // 11th through 14th
/// ```
pub fn forecast_dates(
    last_observed: NaiveDate,
    fcst_first_date: NaiveDate,
    n_days: usize,
) -> Vec<NaiveDate> {
    let difference = (fcst_first_date - last_observed).num_days();
    let horizon = (difference + n_days as i64 - 1).max(0);
    (1..=horizon)
        .map(|i| last_observed + Duration::days(i))
        .collect()
}
