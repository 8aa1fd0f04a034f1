//! Algorithm Service Provider Interface
//!
//! Defines the traits and error type shared by every forecasting engine:
//!
//! - [`Predictor`]: fit on a series, predict the steps that follow it
//! - [`HistoryForecaster`]: reuse fitted parameters on a different history
//! - [`model`]: parameter types shared between engines and their configuration
//! - [`TsError`]: standardized error type for all algorithm operations
//! - [`Result`]: convenient result type alias

pub mod contract;
pub mod error;
pub mod model;

pub use contract::{HistoryForecaster, Predictor};
pub use error::{Result, TsError};
pub use model::{Activation, Growth, NeuralParams, NnType, SeasonalityMode, StructuralParams};
