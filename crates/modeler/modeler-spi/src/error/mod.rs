//! Error types for the modeling pipeline

mod modeler_error;

pub use modeler_error::{ModelerError, Result};
