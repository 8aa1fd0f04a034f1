//! Utility functions shared by the forecasting engines

pub mod metrics;

pub use metrics::*;
