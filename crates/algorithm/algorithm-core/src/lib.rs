//! Algorithm Core Implementations
//!
//! Native forecasting engines, organized by category:
//!
//! - [`regression`]: ARIMA, automatic order selection, least squares
//! - [`structural`]: trend + Fourier seasonality + holiday regression on calendar dates
//! - [`neural`]: one-step-ahead neural autoregressor (dense or recurrent)
//! - [`utils`]: accuracy metrics
//!
//! ## Example
//!
//! ```rust
//! use algorithm_core::prelude::*;
//!
//! let data: Vec<f64> = (1..=40).map(|x| x as f64).collect();
//! let mut model = Arima::new(1, 1, 0).unwrap();
//! model.fit(&data).unwrap();
//! let forecast = model.predict(3).unwrap();
//! assert_eq!(forecast.len(), 3);
//! ```

pub mod neural;
pub mod regression;
pub mod structural;
pub mod utils;

// Re-export from SPI
pub use algorithm_spi::{HistoryForecaster, Predictor, Result, TsError};

pub use neural::NeuralForecaster;
pub use regression::{Arima, AutoArima};
pub use structural::{IntervalForecast, StructuralModel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use algorithm_spi::{HistoryForecaster, Predictor};
    pub use algorithm_spi::{
        Activation, Growth, NeuralParams, NnType, SeasonalityMode, StructuralParams,
    };
    // Engines
    pub use crate::neural::NeuralForecaster;
    pub use crate::regression::{Arima, AutoArima};
    pub use crate::structural::{IntervalForecast, StructuralModel};
    // Error types
    pub use algorithm_spi::{Result, TsError};
}
