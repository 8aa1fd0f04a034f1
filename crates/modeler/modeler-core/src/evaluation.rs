//! Forecast accuracy against held-out values

use std::collections::BTreeMap;

use algorithm_core::utils::{mape, rmse};
use modeler_api::CompetitionMetric;
use modeler_spi::{ModelerError, Observation, Result};
use tracing::error;

/// Split rows sorted by date into training rows and the last `n_test` rows.
///
/// Fails unless at least as many rows remain for training as are held out.
pub fn train_test_split(data: &[Observation], n_test: usize) -> Result<(&[Observation], &[Observation])> {
    let required = 2 * n_test;
    if n_test == 0 || data.len() < required {
        return Err(ModelerError::InsufficientData {
            required: required.max(2),
            actual: data.len(),
        });
    }
    Ok(data.split_at(data.len() - n_test))
}

/// Score `predicted` against `actual` with each requested metric.
///
/// Keys are the normalized metric names. Unsupported metrics are logged and
/// skipped. Scores are `NaN` when the inputs cannot be compared.
pub fn evaluate_model(actual: &[f64], predicted: &[f64], metrics: &[String]) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    for name in metrics {
        let metric = match name.parse::<CompetitionMetric>() {
            Ok(metric) => metric,
            Err(e) => {
                error!(metric = %name, error = %e, "metric skipped");
                continue;
            }
        };
        let score = match metric {
            CompetitionMetric::Rmse => rmse(actual, predicted),
            CompetitionMetric::Mape => mape(actual, predicted),
        };
        scores.insert(metric.as_str().to_string(), score);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, NaiveDate};

    fn rows(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| Observation::new("k", start + Duration::days(i as i64), i as f64))
            .collect()
    }

    #[test]
    fn test_split_holds_out_the_tail() {
        let data = rows(10);
        let (train, test) = train_test_split(&data, 3).unwrap();
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        assert_eq!(test[0].value, 7.0);
    }

    #[test]
    fn test_split_needs_enough_training_rows() {
        let data = rows(5);
        assert!(train_test_split(&data, 3).is_err());
        assert!(train_test_split(&data[..4], 2).is_ok());
        assert!(matches!(
            train_test_split(&data, 0),
            Err(ModelerError::InsufficientData { .. })
        ));
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rmse_and_mape() {
        let scores = evaluate_model(&[100.0, 200.0], &[110.0, 180.0], &names(&["RMSE", " mape"]));
        assert!((scores["rmse"] - 250.0_f64.sqrt()).abs() < 1e-9);
        assert!((scores["mape"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unsupported_metric_skipped() {
        let scores = evaluate_model(&[1.0], &[1.0], &names(&["mae", "rmse"]));
        assert_eq!(scores.len(), 1);
        assert_eq!(scores["rmse"], 0.0);
    }
}
