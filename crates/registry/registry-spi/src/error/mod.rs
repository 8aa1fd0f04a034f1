//! Error types for registry operations

mod registry_error;

pub use registry_error::{RegistryError, Result};
