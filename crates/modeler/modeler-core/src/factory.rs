//! Model construction from configuration or from a trained artifact

use std::collections::BTreeMap;

use modeler_api::{ArimaConfig, ModelsConfig, NeuralConfig, StructuralConfig};
use modeler_spi::{ForecastModel, ModelFlavor, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::adapters::{ArimaModel, NeuralModel, StructuralModel};

/// Build a model of `flavor`.
///
/// With a `trained` artifact the fitted model is restored and `config` is
/// ignored; otherwise a fresh model is configured from `config` (`null`
/// means all defaults). `max_value` is the structural cap.
pub fn model_generation(
    flavor: ModelFlavor,
    config: &Value,
    max_value: f64,
    trained: Option<&Value>,
) -> Result<Box<dyn ForecastModel>> {
    if let Some(artifact) = trained {
        return Ok(match flavor {
            ModelFlavor::Arima => Box::new(ArimaModel::from_artifact(artifact)?),
            ModelFlavor::Structural => Box::new(StructuralModel::from_artifact(artifact)?),
            ModelFlavor::Neural => Box::new(NeuralModel::from_artifact(artifact)?),
        });
    }

    Ok(match flavor {
        ModelFlavor::Arima => Box::new(ArimaModel::new(parse_config::<ArimaConfig>(config)?)),
        ModelFlavor::Structural => Box::new(StructuralModel::new(
            parse_config::<StructuralConfig>(config)?,
            max_value,
        )?),
        ModelFlavor::Neural => Box::new(NeuralModel::new(parse_config::<NeuralConfig>(config)?)?),
    })
}

/// One untrained model per configured name.
///
/// The flavor comes from the name prefix. Names whose model cannot be built
/// are logged and left out.
pub fn create_all_models(
    models: &ModelsConfig,
    max_value: f64,
) -> BTreeMap<String, Box<dyn ForecastModel>> {
    let mut created = BTreeMap::new();
    for (name, config) in models {
        let model = ModelFlavor::from_model_name(name)
            .and_then(|flavor| model_generation(flavor, config, max_value, None));
        match model {
            Ok(model) => {
                debug!(model = %name, flavor = %model.flavor(), "model created");
                created.insert(name.clone(), model);
            }
            Err(e) => error!(model = %name, error = %e, "model creation failed"),
        }
    }
    created
}

fn parse_config<T: DeserializeOwned + Default>(config: &Value) -> Result<T> {
    if config.is_null() {
        return Ok(T::default());
    }
    Ok(T::deserialize(config)?)
}
