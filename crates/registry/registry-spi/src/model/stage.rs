//! Lifecycle stage of a model version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Stage of a registered model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    None,
    Staging,
    Production,
    Archived,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::None => "None",
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Stage {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Stage::None),
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            other => Err(RegistryError::InvalidArgument(format!(
                "unknown stage '{}' (None, Staging, Production, Archived)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("staging".parse::<Stage>().unwrap(), Stage::Staging);
        assert_eq!("PRODUCTION".parse::<Stage>().unwrap(), Stage::Production);
        assert_eq!(" Archived ".parse::<Stage>().unwrap(), Stage::Archived);
        assert!("live".parse::<Stage>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        for stage in [Stage::None, Stage::Staging, Stage::Production, Stage::Archived] {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
    }
}
