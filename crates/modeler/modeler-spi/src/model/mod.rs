//! Modeler data structures

mod flavor;
mod rows;

pub use flavor::{ModelFlavor, UnitTestStatus};
pub use rows::{ForecastPoint, ForecastRow, Observation};
