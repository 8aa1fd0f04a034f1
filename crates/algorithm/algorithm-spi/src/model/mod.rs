//! Parameter types for the forecasting engines.
//!
//! These live in the SPI so that configuration crates can deserialize them
//! without depending on the engine implementations.

mod neural_params;
mod structural_params;

pub use neural_params::{Activation, NeuralParams, NnType};
pub use structural_params::{Growth, SeasonalityMode, StructuralParams};
