//! Structural (trend + seasonality + holidays) model parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TsError;

/// Shape of the trend component
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    /// Straight line through time
    #[default]
    Linear,
    /// Saturating curve between `floor` and `cap`
    Logistic,
    /// Constant level
    Flat,
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Growth::Linear => write!(f, "linear"),
            Growth::Logistic => write!(f, "logistic"),
            Growth::Flat => write!(f, "flat"),
        }
    }
}

impl FromStr for Growth {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Growth::Linear),
            "logistic" => Ok(Growth::Logistic),
            "flat" => Ok(Growth::Flat),
            other => Err(TsError::invalid_parameter(
                "growth",
                format!("'{}' is not one of linear, logistic, flat", other),
            )),
        }
    }
}

/// How seasonal and holiday effects combine with the trend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// `y = trend + seasonal`
    Additive,
    /// `y = trend * (1 + seasonal)`
    #[default]
    Multiplicative,
}

impl fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityMode::Additive => write!(f, "additive"),
            SeasonalityMode::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

impl FromStr for SeasonalityMode {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "additive" => Ok(SeasonalityMode::Additive),
            "multiplicative" => Ok(SeasonalityMode::Multiplicative),
            other => Err(TsError::invalid_parameter(
                "seasonality_mode",
                format!("'{}' is not one of additive, multiplicative", other),
            )),
        }
    }
}

/// Parameters of the structural model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuralParams {
    /// Coverage of the prediction interval, in (0, 1)
    pub interval_width: f64,
    pub growth: Growth,
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    pub seasonality_mode: SeasonalityMode,
    /// Lower saturation level for logistic growth (defaults to 0)
    pub floor: Option<f64>,
    /// Upper saturation level for logistic growth
    pub cap: Option<f64>,
    /// ISO country code whose national holidays become a regressor
    pub country_holidays: Option<String>,
}

impl Default for StructuralParams {
    fn default() -> Self {
        Self {
            interval_width: 0.95,
            growth: Growth::Linear,
            daily_seasonality: false,
            weekly_seasonality: true,
            yearly_seasonality: true,
            seasonality_mode: SeasonalityMode::Multiplicative,
            floor: None,
            cap: None,
            country_holidays: Some("IT".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_parse_case_insensitive() {
        assert_eq!("Logistic".parse::<Growth>().unwrap(), Growth::Logistic);
        assert_eq!(" flat ".parse::<Growth>().unwrap(), Growth::Flat);
        assert!("exponential".parse::<Growth>().is_err());
    }

    #[test]
    fn test_seasonality_mode_display_and_parse() {
        assert_eq!(SeasonalityMode::Additive.to_string(), "additive");
        assert_eq!(
            "MULTIPLICATIVE".parse::<SeasonalityMode>().unwrap(),
            SeasonalityMode::Multiplicative
        );
    }

    #[test]
    fn test_defaults() {
        let params = StructuralParams::default();
        assert_eq!(params.interval_width, 0.95);
        assert_eq!(params.growth, Growth::Linear);
        assert!(!params.daily_seasonality);
        assert!(params.weekly_seasonality);
        assert!(params.yearly_seasonality);
        assert_eq!(params.seasonality_mode, SeasonalityMode::Multiplicative);
        assert_eq!(params.country_holidays.as_deref(), Some("IT"));
    }
}
