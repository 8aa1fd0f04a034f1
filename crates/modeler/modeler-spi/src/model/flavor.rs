//! Engine families and unit test outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelerError;

/// Engine family of a model
///
/// Parsing is case-insensitive and accepts the names of the engines each
/// family replaces: `pmdarima`, `prophet` and `tensorflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFlavor {
    /// Automatic (seasonal) ARIMA
    #[serde(alias = "pmdarima")]
    Arima,
    /// Trend + seasonality + holidays regression
    #[serde(alias = "prophet")]
    Structural,
    /// Dense or recurrent autoregressive network
    #[serde(alias = "tensorflow")]
    Neural,
}

impl ModelFlavor {
    pub const ALL: [ModelFlavor; 3] = [
        ModelFlavor::Arima,
        ModelFlavor::Structural,
        ModelFlavor::Neural,
    ];

    /// Flavor encoded in a model name: the part before the first `_`
    ///
    /// ```rust
    /// use modeler_spi::ModelFlavor;
    ///
    /// assert_eq!(ModelFlavor::from_model_name("prophet_2").unwrap(), ModelFlavor::Structural);
    /// assert!(ModelFlavor::from_model_name("xgb_1").is_err());
    /// ```
    pub fn from_model_name(name: &str) -> Result<Self, ModelerError> {
        let prefix = name.split('_').next().unwrap_or(name);
        prefix.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFlavor::Arima => "arima",
            ModelFlavor::Structural => "structural",
            ModelFlavor::Neural => "neural",
        }
    }
}

impl fmt::Display for ModelFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelFlavor {
    type Err = ModelerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arima" | "pmdarima" => Ok(ModelFlavor::Arima),
            "structural" | "prophet" => Ok(ModelFlavor::Structural),
            "neural" | "tensorflow" => Ok(ModelFlavor::Neural),
            _ => Err(ModelerError::UnknownFlavor(s.to_string())),
        }
    }
}

/// Outcome of the infrastructure test run before a promotion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitTestStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "KO")]
    Ko,
}

impl UnitTestStatus {
    pub fn is_ok(&self) -> bool {
        *self == UnitTestStatus::Ok
    }
}

impl fmt::Display for UnitTestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitTestStatus::Ok => write!(f, "OK"),
            UnitTestStatus::Ko => write!(f, "KO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_aliases() {
        assert_eq!("ARIMA".parse::<ModelFlavor>().unwrap(), ModelFlavor::Arima);
        assert_eq!("pmdarima".parse::<ModelFlavor>().unwrap(), ModelFlavor::Arima);
        assert_eq!("Prophet".parse::<ModelFlavor>().unwrap(), ModelFlavor::Structural);
        assert_eq!("tensorflow".parse::<ModelFlavor>().unwrap(), ModelFlavor::Neural);
        assert!(matches!(
            "lightgbm".parse::<ModelFlavor>(),
            Err(ModelerError::UnknownFlavor(_))
        ));
    }

    #[test]
    fn test_from_model_name() {
        assert_eq!(
            ModelFlavor::from_model_name("pmdarima_1").unwrap(),
            ModelFlavor::Arima
        );
        assert_eq!(
            ModelFlavor::from_model_name("neural").unwrap(),
            ModelFlavor::Neural
        );
    }

    #[test]
    fn test_serde_aliases() {
        let flavor: ModelFlavor = serde_json::from_str("\"prophet\"").unwrap();
        assert_eq!(flavor, ModelFlavor::Structural);
        assert_eq!(serde_json::to_string(&flavor).unwrap(), "\"structural\"");
    }

    #[test]
    fn test_unit_test_status() {
        assert_eq!(UnitTestStatus::Ok.to_string(), "OK");
        assert!(!UnitTestStatus::Ko.is_ok());
    }
}
