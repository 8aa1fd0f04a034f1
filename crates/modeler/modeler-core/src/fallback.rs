//! Forecast used when no production model can predict

use chrono::NaiveDate;
use modeler_spi::{forecast_dates, ForecastPoint, ModelerError, Observation, Result};

/// Repeat the last value observed before `fcst_first_date` over the same days
/// a model would forecast.
pub fn naive_forecast(
    data: &[Observation],
    n_days: usize,
    fcst_first_date: NaiveDate,
    future_only: bool,
) -> Result<Vec<ForecastPoint>> {
    let end = data.partition_point(|o| o.date < fcst_first_date);
    let last = data[..end].last().ok_or(ModelerError::InsufficientData {
        required: 1,
        actual: 0,
    })?;

    Ok(forecast_dates(last.date, fcst_first_date, n_days)
        .into_iter()
        .filter(|d| !future_only || *d >= fcst_first_date)
        .map(|d| ForecastPoint::new(d, last.value))
        .collect())
}
