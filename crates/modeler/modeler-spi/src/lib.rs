//! Modeler Service Provider Interface
//!
//! - [`ForecastModel`]: a trainable model that forecasts calendar days
//! - [`Observation`], [`ForecastPoint`], [`ForecastRow`]: input and output rows
//! - [`ModelFlavor`]: the engine family behind a model
//! - [`ModelerError`]: errors of the modeling pipeline

pub mod contract;
pub mod error;
pub mod model;

pub use contract::{forecast_dates, ForecastModel};
pub use error::{ModelerError, Result};
pub use model::{ForecastPoint, ForecastRow, ModelFlavor, Observation, UnitTestStatus};
