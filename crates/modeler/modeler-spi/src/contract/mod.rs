//! Contract traits for modeler implementations

mod forecast_model;

pub use forecast_model::{forecast_dates, ForecastModel};
