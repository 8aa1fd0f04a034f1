//! End-to-end tests for kronos
//!
//! Drives complete forecasting cycles through the facade only.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use modeler_facade::prelude::*;

fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 10, 2).unwrap() + Duration::days(offset)
}

/// Daily sales with a weekend peak and a slow upward trend
fn sales(key: &str, days: i64) -> Vec<Observation> {
    (0..days)
        .map(|i| {
            let weekend = if i % 7 >= 5 { 40.0 } else { 0.0 };
            Observation::new(key, date(i), 200.0 + 0.5 * i as f64 + weekend)
        })
        .collect()
}

fn document(days: i64) -> KronosConfig {
    let text = format!(
        r#"{{
            "key_col": "store",
            "models": {{
                "arima_1": {{ "m": 7 }},
                "prophet_1": {{ "country_holidays": null, "yearly_seasonality": false }}
            }},
            "current_date": "{}",
            "n_test": 14,
            "fcst_horizon": 7,
            "fcst_competition_metrics": ["RMSE", "mape"],
            "fcst_competition_metric_weights": [0.7, 0.3]
        }}"#,
        date(days - 1)
    );
    KronosConfig::from_json(&text).unwrap()
}

#[test]
fn e2e_weekly_cycle() {
    let store = Arc::new(InMemoryStore::new());

    // Week 1: first training, nothing in production yet
    let mut first = Modeler::new(
        RegistryClient::new(store.clone()),
        sales("s1", 112),
        document(112).modeler,
    )
    .unwrap();
    let forecast = first.run().unwrap();
    assert_eq!(forecast.len(), 7);
    assert!(first.winning_model_name().is_some());

    // The forecast tracks the weekend peak
    let weekday = forecast.iter().find(|r| r.date == date(114)).unwrap().forecast;
    let weekend = forecast.iter().find(|r| r.date == date(117)).unwrap().forecast;
    assert!(weekend > weekday + 20.0, "weekend {} weekday {}", weekend, weekday);

    // Week 2: the production model competes with fresh candidates
    let mut second = Modeler::new(
        RegistryClient::new(store.clone()),
        sales("s1", 119),
        document(119).modeler,
    )
    .unwrap();
    let forecast = second.run().unwrap();
    assert_eq!(forecast[0].date, date(119));
    assert!(second
        .performances()
        .iter()
        .any(|r| r.model_name == modeler_facade::PROD_MODEL));

    let production = store
        .latest_version("s1", Some(Stage::Production))
        .unwrap()
        .unwrap();
    assert!(production.tags.contains_key("model_flavor"));
}

#[test]
fn e2e_many_keys_share_a_store() {
    let store = Arc::new(InMemoryStore::new());
    for key in ["a", "b", "c"] {
        let rows = Modeler::new(
            RegistryClient::new(store.clone()),
            sales(key, 112),
            document(112).modeler,
        )
        .unwrap()
        .run()
        .unwrap();
        assert!(rows.iter().all(|r| r.key == key));
    }

    let names: Vec<String> = store
        .list_models()
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn e2e_new_key_without_enough_history() {
    let store = Arc::new(InMemoryStore::new());
    let rows = Modeler::new(
        RegistryClient::new(store.clone()),
        sales("fresh", 10),
        document(10).modeler,
    )
    .unwrap()
    .run()
    .unwrap();

    // Nothing trained: the last observed value is carried forward
    assert_eq!(rows.len(), 7);
    let last = sales("fresh", 10)[9].value;
    assert!(rows.iter().all(|r| r.forecast == last));
    assert!(store.list_models().unwrap().is_empty());
}
