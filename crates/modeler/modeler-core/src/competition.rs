//! Model competition on standardized test metrics

use std::collections::BTreeMap;

use modeler_api::CompetitionMetric;
use modeler_spi::{ModelFlavor, ModelerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Name of the performance row of the model currently in production
pub const PROD_MODEL: &str = "prod_model";

/// Test-window performance of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub model_name: String,
    pub flavor: ModelFlavor,
    /// Model configuration; `None` for the production model
    pub config: Option<Value>,
    /// Training run; `None` for the production model
    pub run_id: Option<String>,
    /// Normalized metric name to score
    pub metrics: BTreeMap<String, f64>,
}

impl PerformanceRow {
    pub fn is_prod_model(&self) -> bool {
        self.run_id.is_none()
    }
}

/// Winner of a competition with every candidate's weighted score
#[derive(Debug, Clone, PartialEq)]
pub struct Standings {
    pub winner: String,
    /// Model name to weighted average of standardized metrics
    pub scores: BTreeMap<String, f64>,
}

/// Pick the model with the lowest weighted average of standardized metrics.
///
/// Each metric is standardized across candidates as `(x - mean) / std`
/// (sample standard deviation). A metric with fewer than two finite scores
/// or no spread is only centered. Metrics no candidate scored are left out
/// along with their weights, as are candidates whose average is not finite.
/// Ties go to the earlier row.
pub fn competition(rows: &[PerformanceRow], metrics: &[String], weights: &[f64]) -> Result<Standings> {
    let mut columns: Vec<(String, f64)> = Vec::new();
    for (name, &weight) in metrics.iter().zip(weights) {
        let key = CompetitionMetric::normalize(name);
        let scored = rows
            .iter()
            .any(|r| r.metrics.get(&key).map_or(false, |v| v.is_finite()));
        if scored && weight > 0.0 {
            columns.push((key, weight));
        } else if !scored {
            warn!(metric = %key, "metric has no scores, left out of the competition");
        }
    }
    let total_weight: f64 = columns.iter().map(|(_, w)| w).sum();
    if columns.is_empty() || total_weight <= 0.0 {
        return Err(ModelerError::NoWinner);
    }

    let mut sums = vec![0.0; rows.len()];
    for (key, weight) in &columns {
        let values: Vec<f64> = rows
            .iter()
            .map(|r| r.metrics.get(key).copied().unwrap_or(f64::NAN))
            .collect();
        for (sum, z) in sums.iter_mut().zip(standardize(&values)) {
            *sum += weight * z;
        }
    }

    let scores: BTreeMap<String, f64> = rows
        .iter()
        .zip(&sums)
        .map(|(r, sum)| (r.model_name.clone(), sum / total_weight))
        .collect();

    let winner = rows
        .iter()
        .zip(&sums)
        .filter(|(_, sum)| sum.is_finite())
        .fold(None, |best: Option<(&PerformanceRow, f64)>, (row, &sum)| match best {
            Some((_, best_sum)) if best_sum <= sum => best,
            _ => Some((row, sum)),
        })
        .map(|(row, _)| row.model_name.clone())
        .ok_or(ModelerError::NoWinner)?;

    debug!(%winner, ?scores, "competition standings");
    Ok(Standings { winner, scores })
}

fn standardize(values: &[f64]) -> Vec<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let std = if finite.len() > 1 {
        (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    values
        .iter()
        .map(|v| if std > 0.0 { (v - mean) / std } else { v - mean })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, rmse: f64, mape: f64) -> PerformanceRow {
        PerformanceRow {
            model_name: name.to_string(),
            flavor: ModelFlavor::Arima,
            config: None,
            run_id: Some(format!("run-{}", name)),
            metrics: BTreeMap::from([("rmse".to_string(), rmse), ("mape".to_string(), mape)]),
        }
    }

    fn metrics() -> Vec<String> {
        vec!["RMSE".to_string(), "mape".to_string()]
    }

    #[test]
    fn test_dominant_model_wins() {
        let rows = vec![row("a", 10.0, 20.0), row("b", 5.0, 8.0), row("c", 7.0, 9.0)];
        let standings = competition(&rows, &metrics(), &[0.5, 0.5]).unwrap();
        assert_eq!(standings.winner, "b");
        assert_eq!(standings.scores.len(), 3);
    }

    #[test]
    fn test_scales_are_standardized() {
        // mape differences dwarf rmse ones in absolute terms
        let rows = vec![row("a", 1.0, 100.0), row("b", 2.0, 101.0), row("c", 3.0, 90.0)];
        let rmse_only = competition(&rows, &metrics(), &[1.0, 0.0]).unwrap();
        assert_eq!(rmse_only.winner, "a");
        let mape_only = competition(&rows, &metrics(), &[0.0, 1.0]).unwrap();
        assert_eq!(mape_only.winner, "c");
    }

    #[test]
    fn test_single_candidate() {
        let rows = vec![row("only", 3.0, 4.0)];
        let standings = competition(&rows, &metrics(), &[0.5, 0.5]).unwrap();
        assert_eq!(standings.winner, "only");
        assert_eq!(standings.scores["only"], 0.0);
    }

    #[test]
    fn test_non_finite_candidate_excluded() {
        let rows = vec![row("nan", f64::NAN, 1.0), row("ok", 2.0, 3.0)];
        let standings = competition(&rows, &metrics(), &[0.5, 0.5]).unwrap();
        assert_eq!(standings.winner, "ok");
    }

    #[test]
    fn test_tie_goes_to_first_row() {
        let rows = vec![row("first", 2.0, 2.0), row("second", 2.0, 2.0)];
        assert_eq!(competition(&rows, &metrics(), &[0.5, 0.5]).unwrap().winner, "first");
    }

    #[test]
    fn test_no_candidates() {
        assert!(matches!(
            competition(&[], &metrics(), &[0.5, 0.5]),
            Err(ModelerError::NoWinner)
        ));
        let rows = vec![row("a", 1.0, 1.0)];
        let unknown = vec!["mae".to_string()];
        assert!(matches!(
            competition(&rows, &unknown, &[1.0]),
            Err(ModelerError::NoWinner)
        ));
    }
}
