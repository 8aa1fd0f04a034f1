//! Engine adapters
//!
//! Each adapter wraps one `algorithm-core` engine behind [`ForecastModel`]
//! and serializes to an artifact of the form
//! `{ "model_flavor": "<flavor>", "state": <adapter> }`.
//!
//! [`ForecastModel`]: modeler_spi::ForecastModel

mod arima;
mod neural;
mod structural;

pub use arima::ArimaModel;
pub use neural::NeuralModel;
pub use structural::StructuralModel;

use algorithm_core::TsError;
use chrono::NaiveDate;
use modeler_spi::{ForecastPoint, ModelFlavor, ModelerError, Observation, Result};
use registry_spi::FLAVOR_KEY;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

const STATE_KEY: &str = "state";

pub(crate) fn values(rows: &[Observation]) -> Vec<f64> {
    rows.iter().map(|o| o.value).collect()
}

/// Pair forecast dates with point values
pub(crate) fn points(dates: &[NaiveDate], values: Vec<f64>) -> Vec<ForecastPoint> {
    dates
        .iter()
        .zip(values)
        .map(|(&date, value)| ForecastPoint::new(date, value))
        .collect()
}

pub(crate) fn to_artifact<T: Serialize>(flavor: ModelFlavor, state: &T) -> Result<Value> {
    let mut artifact = Map::new();
    artifact.insert(FLAVOR_KEY.to_string(), Value::from(flavor.as_str()));
    artifact.insert(STATE_KEY.to_string(), serde_json::to_value(state)?);
    Ok(Value::Object(artifact))
}

pub(crate) fn from_artifact<T: DeserializeOwned>(flavor: ModelFlavor, artifact: &Value) -> Result<T> {
    if let Some(stored) = artifact.get(FLAVOR_KEY).and_then(Value::as_str) {
        let stored: ModelFlavor = stored.parse()?;
        if stored != flavor {
            return Err(ModelerError::InvalidState(format!(
                "artifact holds a {} model, expected {}",
                stored, flavor
            )));
        }
    }
    let state = artifact.get(STATE_KEY).ok_or_else(|| {
        ModelerError::InvalidState(format!("{} artifact has no '{}' field", flavor, STATE_KEY))
    })?;
    Ok(T::deserialize(state)?)
}

/// Map a failed state check of a restored engine to `InvalidState`
pub(crate) fn check_restored(
    flavor: ModelFlavor,
    check: std::result::Result<(), TsError>,
) -> Result<()> {
    check.map_err(|e| ModelerError::InvalidState(format!("corrupt {} artifact: {}", flavor, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_artifact_flavor_mismatch() {
        let artifact = json!({ "model_flavor": "neural", "state": {} });
        let result: Result<Value> = from_artifact(ModelFlavor::Arima, &artifact);
        assert!(matches!(result, Err(ModelerError::InvalidState(_))));
    }

    #[test]
    fn test_artifact_without_state() {
        let artifact = json!({ "model_flavor": "arima" });
        let result: Result<Value> = from_artifact(ModelFlavor::Arima, &artifact);
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_flavor_name_accepted() {
        let artifact = json!({ "model_flavor": "pmdarima", "state": [1, 2] });
        let state: Vec<u32> = from_artifact(ModelFlavor::Arima, &artifact).unwrap();
        assert_eq!(state, vec![1, 2]);
    }
}
