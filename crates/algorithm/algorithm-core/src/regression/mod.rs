//! Regression and statistical models for time series forecasting
//!
//! ## Algorithms
//!
//! - **ARIMA**: AutoRegressive Integrated Moving Average
//! - **AutoArima**: seasonal differencing plus AIC order search over ARIMA
//! - **Least squares**: ridge-damped normal equations used by the structural model

pub mod arima;
pub mod auto_arima;
pub mod least_squares;

pub use arima::Arima;
pub use auto_arima::AutoArima;
pub use least_squares::solve_ridge;
