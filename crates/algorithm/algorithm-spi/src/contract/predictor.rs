//! Predictor traits for time series algorithms

use crate::error::Result;

/// Common trait for all time series predictors
///
/// Fit-predict interface: `fit` learns parameters from a series and
/// `predict` continues that same series for `steps` points.
///
/// # Example
///
/// ```rust,ignore
/// use algorithm_spi::Predictor;
///
/// fn forecast<P: Predictor>(predictor: &mut P, data: &[f64], horizon: usize) -> algorithm_spi::Result<Vec<f64>> {
///     predictor.fit(data)?;
///     predictor.predict(horizon)
/// }
/// ```
pub trait Predictor {
    /// Fit the model to historical data
    fn fit(&mut self, data: &[f64]) -> Result<()>;

    /// Predict the `steps` values following the training data
    fn predict(&self, steps: usize) -> Result<Vec<f64>>;

    /// Check if the model has been fitted
    fn is_fitted(&self) -> bool;
}

/// Forecasting from an arbitrary history with already fitted parameters
///
/// A deployed model keeps its parameters while new observations keep
/// arriving. Implementors feed `history` through the fitted model (no
/// refit) and return the `steps` values that follow its last point.
pub trait HistoryForecaster: Predictor {
    /// Forecast `steps` values after the end of `history`
    fn forecast_from(&self, history: &[f64], steps: usize) -> Result<Vec<f64>>;
}
