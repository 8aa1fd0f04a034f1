//! Input and output rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observed value of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub key: String,
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(key: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self {
            key: key.into(),
            date,
            value,
        }
    }
}

/// One forecast day; only the structural engine fills the interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ForecastPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value,
            lower: None,
            upper: None,
        }
    }
}

/// One row of the published forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub key: String,
    pub date: NaiveDate,
    pub forecast: f64,
    /// First forecast date the run was asked for
    pub reference_date: NaiveDate,
    /// Processing date of the run
    pub creation_date: NaiveDate,
}
