//! Per-flavor model configuration
//!
//! Every field is optional in the JSON document; missing fields take the
//! defaults below. Unknown fields (such as a `model_flavor` entry) are
//! ignored.

use algorithm_spi::{
    Activation, Growth, NeuralParams, NnType, SeasonalityMode, StructuralParams,
};
use serde::{Deserialize, Serialize};

/// Automatic ARIMA settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    /// Seasonal period
    pub m: usize,
    pub seasonal: bool,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self { m: 7, seasonal: true }
    }
}

/// Structural model settings
///
/// The cap is not configurable: the modeler passes the series maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralConfig {
    pub interval_width: f64,
    pub growth: Growth,
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    pub seasonality_mode: SeasonalityMode,
    pub floor: Option<f64>,
    pub country_holidays: Option<String>,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            interval_width: 0.95,
            growth: Growth::Linear,
            daily_seasonality: false,
            weekly_seasonality: true,
            yearly_seasonality: true,
            seasonality_mode: SeasonalityMode::Multiplicative,
            floor: None,
            country_holidays: Some("IT".to_string()),
        }
    }
}

impl StructuralConfig {
    /// Engine parameters with the given cap
    pub fn to_params(&self, cap: f64) -> StructuralParams {
        StructuralParams {
            interval_width: self.interval_width,
            growth: self.growth,
            daily_seasonality: self.daily_seasonality,
            weekly_seasonality: self.weekly_seasonality,
            yearly_seasonality: self.yearly_seasonality,
            seasonality_mode: self.seasonality_mode,
            floor: self.floor,
            cap: Some(cap),
            country_holidays: self.country_holidays.clone(),
        }
    }
}

/// Neural autoregressor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    pub nn_type: NnType,
    pub n_units: usize,
    pub activation: Activation,
    pub epochs: usize,
    pub n_inputs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        let params = NeuralParams::default();
        Self {
            nn_type: params.nn_type,
            n_units: params.n_units,
            activation: params.activation,
            epochs: params.epochs,
            n_inputs: params.n_inputs,
            learning_rate: params.learning_rate,
            seed: params.seed,
        }
    }
}

impl From<&NeuralConfig> for NeuralParams {
    fn from(config: &NeuralConfig) -> Self {
        NeuralParams {
            nn_type: config.nn_type,
            n_units: config.n_units,
            activation: config.activation,
            epochs: config.epochs,
            n_inputs: config.n_inputs,
            learning_rate: config.learning_rate,
            seed: config.seed,
        }
    }
}
