//! Neural autoregressor parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TsError;

/// Architecture of the hidden layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NnType {
    /// Fully connected layer over the whole lag window
    Dense,
    /// Elman recurrence stepping through the lag window
    #[default]
    Rnn,
    /// Long short-term memory cell: input, forget and output gates over a cell state
    Lstm,
    /// Gated recurrent unit: update and reset gates
    Gru,
}

impl NnType {
    /// Number of weight blocks per hidden unit
    pub fn gates(&self) -> usize {
        match self {
            NnType::Dense | NnType::Rnn => 1,
            NnType::Gru => 3,
            NnType::Lstm => 4,
        }
    }

    /// Whether the layer steps through the lag window one value at a time
    pub fn is_recurrent(&self) -> bool {
        !matches!(self, NnType::Dense)
    }
}

impl fmt::Display for NnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NnType::Dense => write!(f, "dense"),
            NnType::Rnn => write!(f, "rnn"),
            NnType::Lstm => write!(f, "lstm"),
            NnType::Gru => write!(f, "gru"),
        }
    }
}

impl FromStr for NnType {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dense" => Ok(NnType::Dense),
            "rnn" => Ok(NnType::Rnn),
            "lstm" => Ok(NnType::Lstm),
            "gru" => Ok(NnType::Gru),
            other => Err(TsError::invalid_parameter(
                "nn_type",
                format!("neural network type '{}' not supported (dense, rnn, lstm, gru)", other),
            )),
        }
    }
}

/// Activation of the hidden layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Sigmoid,
    Linear,
}

impl Activation {
    /// Apply the activation
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Linear => x,
        }
    }

    /// Derivative with respect to the pre-activation `x`
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - x.tanh().powi(2),
            Activation::Sigmoid => {
                let s = self.apply(x);
                s * (1.0 - s)
            }
            Activation::Linear => 1.0,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Relu => write!(f, "relu"),
            Activation::Tanh => write!(f, "tanh"),
            Activation::Sigmoid => write!(f, "sigmoid"),
            Activation::Linear => write!(f, "linear"),
        }
    }
}

impl FromStr for Activation {
    type Err = TsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "linear" => Ok(Activation::Linear),
            other => Err(TsError::invalid_parameter(
                "activation",
                format!("'{}' is not one of relu, tanh, sigmoid, linear", other),
            )),
        }
    }
}

/// Parameters of the neural autoregressor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeuralParams {
    pub nn_type: NnType,
    /// Width of the hidden layer
    pub n_units: usize,
    pub activation: Activation,
    pub epochs: usize,
    /// Number of lags used to predict one step ahead
    pub n_inputs: usize,
    pub learning_rate: f64,
    /// Seed for weight initialization and sample shuffling
    pub seed: u64,
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self {
            nn_type: NnType::Rnn,
            n_units: 128,
            activation: Activation::Relu,
            epochs: 25,
            n_inputs: 30,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}
