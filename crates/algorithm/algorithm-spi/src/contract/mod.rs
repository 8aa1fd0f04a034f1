//! Contract traits for algorithm implementations
//!
//! - [`Predictor`]: the fit-predict interface
//! - [`HistoryForecaster`]: forecasting from a history other than the training one

mod predictor;

pub use predictor::{HistoryForecaster, Predictor};
