//! Integration tests for the modeling pipeline against a registry

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use modeler_facade::prelude::*;
use modeler_facade::PROD_MODEL;
use serde_json::json;

fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(offset)
}

fn weekly(key: &str, days: i64) -> Vec<Observation> {
    let pattern = [120.0, 125.0, 130.0, 128.0, 122.0, 160.0, 170.0];
    (0..days)
        .map(|i| Observation::new(key, date(i), pattern[(i % 7) as usize] + 0.2 * i as f64))
        .collect()
}

fn config(days: i64) -> ModelerConfig {
    ModelerConfig::default()
        .model("pmdarima_1", json!({ "model_flavor": "pmdarima", "m": 7 }))
        .model("tensorflow_1", json!({ "nn_type": "dense", "n_units": 8, "n_inputs": 14, "epochs": 10 }))
        .current_date(date(days - 1))
        .fcst_horizon(14)
}

fn modeler(store: Arc<dyn ModelRegistry>, data: Vec<Observation>, config: ModelerConfig) -> Modeler {
    Modeler::new(RegistryClient::new(store), data, config).unwrap()
}

#[test]
fn test_run_deploys_and_forecasts() {
    let store = Arc::new(InMemoryStore::new());
    let mut m = modeler(store.clone(), weekly("store_1", 84), config(84));
    let rows = m.run().unwrap();

    assert_eq!(rows.len(), 14);
    assert_eq!(rows[0].date, date(84));
    assert_eq!(rows[13].date, date(97));
    assert!(rows.iter().all(|r| r.key == "store_1" && r.forecast >= 0.0));

    let model = &store.list_models().unwrap()[0];
    assert_eq!(model.name, "store_1");
    assert_eq!(model.versions.len(), 1);
    assert_eq!(model.versions[0].current_stage, Stage::Production);
}

#[test]
fn test_retraining_archives_previous_production() {
    let store = Arc::new(InMemoryStore::new());
    modeler(store.clone(), weekly("k", 84), config(84)).run().unwrap();

    let mut second = modeler(store.clone(), weekly("k", 91), config(91));
    second.training().unwrap();
    assert!(second.prod_model_eval());
    assert_eq!(second.performances().len(), 3);

    let winner = second.competition().unwrap().winner;
    let outcome = second.deploy().unwrap();
    let versions = &store.list_models().unwrap()[0].versions;
    if winner == PROD_MODEL {
        assert_eq!(outcome, DeployOutcome::Retained);
        assert_eq!(versions.len(), 1);
    } else {
        assert!(outcome.is_ok());
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].current_stage, Stage::Archived);
        assert_eq!(versions[1].current_stage, Stage::Production);
    }
}

#[test]
fn test_prediction_only_uses_production_model() {
    let store = Arc::new(InMemoryStore::new());
    modeler(store.clone(), weekly("k", 84), config(84)).run().unwrap();

    // Two more weeks observed, forecast starts after a gap
    let config = config(98).fcst_first_date(date(101)).fcst_horizon(5);
    let rows = modeler(store, weekly("k", 98), config).prediction().unwrap();
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, (101..106).map(date).collect::<Vec<_>>());
    assert!(rows.iter().all(|r| r.reference_date == date(101)));
    assert!(rows.iter().all(|r| r.creation_date == date(97)));
}

#[test]
fn test_gap_days_kept_without_future_only() {
    let store = Arc::new(InMemoryStore::new());
    let config = config(84).fcst_first_date(date(86)).future_only(false);
    let rows = modeler(store, weekly("k", 84), config).prediction().unwrap();
    // Fallback: days 84 and 85 precede the first forecast day
    assert_eq!(rows.len(), 16);
    assert_eq!(rows[0].date, date(84));
    assert!(rows.iter().all(|r| r.forecast == rows[0].forecast));
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        modeler(store, weekly("k", 84), config(84)).run().unwrap();
    }

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let m = modeler(store.clone(), weekly("k", 84), config(84));
    assert_eq!(m.unit_test("k", Stage::Production), UnitTestStatus::Ok);

    let experiment = store
        .get_experiment_by_path("/kronos/experiments/k")
        .unwrap()
        .unwrap();
    assert_eq!(store.list_runs(&experiment.experiment_id).unwrap().len(), 2);
}
