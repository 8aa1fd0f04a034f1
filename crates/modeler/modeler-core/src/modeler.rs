//! Modeling pipeline for one series
//!
//! A [`Modeler`] trains every configured model on the series, compares the
//! candidates with the model currently in production, deploys the winner
//! through Staging to Production and serves the forecast.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate, Utc};
use modeler_api::ModelerConfig;
use modeler_spi::{
    ForecastModel, ForecastPoint, ForecastRow, ModelFlavor, ModelerError, Observation, Result,
    UnitTestStatus,
};
use registry_core::{ModelVersion, RegistryClient, RunStatus, Stage, VersionStatus, FLAVOR_KEY};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::competition::{competition, PerformanceRow, Standings, PROD_MODEL};
use crate::evaluation::{evaluate_model, train_test_split};
use crate::factory::{create_all_models, model_generation};
use crate::fallback::naive_forecast;

/// Artifact path of a trained model inside its run
pub const MODEL_ARTIFACT: &str = "model";

/// Result of [`Modeler::deploy`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// The production model won the competition and stays in place
    Retained,
    /// The winner reached Production; `status` is OK when the version is ready
    Deployed {
        version: ModelVersion,
        status: UnitTestStatus,
    },
    /// The winner failed its unit test and stays in Staging
    Rejected { version: ModelVersion },
}

impl DeployOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(
            self,
            DeployOutcome::Deployed {
                status: UnitTestStatus::Ok,
                ..
            }
        )
    }
}

/// Training, competition, deployment and prediction for the rows of one key
pub struct Modeler {
    client: RegistryClient,
    key_code: String,
    /// Sorted by date
    data: Vec<Observation>,
    config: ModelerConfig,
    current_date: NaiveDate,
    fcst_first_date: NaiveDate,
    max_value: f64,
    /// Index of the first test row, set by training
    split_at: Option<usize>,
    performances: Vec<PerformanceRow>,
    winning_model_name: Option<String>,
}

impl Modeler {
    /// Modeler with dates defaulted against today's UTC date
    pub fn new(client: RegistryClient, data: Vec<Observation>, config: ModelerConfig) -> Result<Self> {
        Self::with_today(client, data, config, Utc::now().date_naive())
    }

    /// Modeler with dates defaulted against `today`
    pub fn with_today(
        client: RegistryClient,
        mut data: Vec<Observation>,
        config: ModelerConfig,
        today: NaiveDate,
    ) -> Result<Self> {
        config.validate()?;
        let key_code = data
            .first()
            .map(|o| o.key.clone())
            .ok_or(ModelerError::InsufficientData {
                required: 1,
                actual: 0,
            })?;
        if let Some(other) = data.iter().find(|o| o.key != key_code) {
            return Err(ModelerError::InvalidState(format!(
                "rows of keys '{}' and '{}' given to one modeler",
                key_code, other.key
            )));
        }

        data.sort_by_key(|o| o.date);
        let max_value = data.iter().map(|o| o.value).fold(f64::NEG_INFINITY, f64::max);
        let (current_date, fcst_first_date) = config.resolve_dates(today);
        debug!(
            key = %key_code,
            rows = data.len(),
            %current_date,
            %fcst_first_date,
            "modeler created"
        );

        Ok(Self {
            client,
            key_code,
            data,
            config,
            current_date,
            fcst_first_date,
            max_value,
            split_at: None,
            performances: Vec::new(),
            winning_model_name: None,
        })
    }

    pub fn key_code(&self) -> &str {
        &self.key_code
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn fcst_first_date(&self) -> NaiveDate {
        self.fcst_first_date
    }

    /// Largest observed value, the structural cap
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn data(&self) -> &[Observation] {
        &self.data
    }

    /// Performance rows collected by training and the production evaluation
    pub fn performances(&self) -> &[PerformanceRow] {
        &self.performances
    }

    pub fn winning_model_name(&self) -> Option<&str> {
        self.winning_model_name.as_deref()
    }

    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Experiment holding the training runs of this key
    pub fn experiment_path(&self) -> String {
        format!("/kronos/experiments/{}", self.key_code)
    }

    fn production_uri(&self) -> String {
        format!("models:/{}/{}", self.key_code, Stage::Production)
    }

    /// Score predictions with the configured competition metrics
    pub fn evaluate_model(&self, actual: &[f64], predicted: &[f64]) -> BTreeMap<String, f64> {
        evaluate_model(actual, predicted, &self.config.fcst_competition_metrics)
    }

    /// Training rows and the `n_test` most recent rows
    pub fn train_test_split(&self) -> Result<(&[Observation], &[Observation])> {
        train_test_split(&self.data, self.config.n_test)
    }

    /// Untrained models for every configured name
    pub fn create_all_models(&self) -> BTreeMap<String, Box<dyn ForecastModel>> {
        create_all_models(&self.config.models, self.max_value)
    }

    /// Model of `flavor`, restored from `trained` when given
    pub fn model_generation(
        &self,
        flavor: ModelFlavor,
        config: &Value,
        trained: Option<&Value>,
    ) -> Result<Box<dyn ForecastModel>> {
        model_generation(flavor, config, self.max_value, trained)
    }

    /// Train and score every configured model, one run per model.
    ///
    /// A model that fails is logged, its run is marked failed and the
    /// remaining models still train.
    pub fn training(&mut self) -> Result<()> {
        let split_at = self.train_test_split()?.0.len();
        self.split_at = Some(split_at);
        let path = self.experiment_path();
        self.client.set_experiment(&path)?;

        let models = self.create_all_models();
        if models.is_empty() {
            warn!(key = %self.key_code, "no model to train");
        }
        info!(key = %self.key_code, models = models.len(), "training started");

        for (name, mut model) in models {
            match self.train_model(&name, model.as_mut(), split_at) {
                Ok(row) => {
                    info!(key = %self.key_code, model = %name, metrics = ?row.metrics, "model trained");
                    self.performances.push(row);
                }
                Err(e) => {
                    error!(key = %self.key_code, model = %name, error = %e, "model training failed");
                    if let Err(e) = self.client.end_run_with_status(RunStatus::Failed) {
                        warn!(key = %self.key_code, error = %e, "could not close failed run");
                    }
                }
            }
        }
        Ok(())
    }

    fn train_model(
        &mut self,
        name: &str,
        model: &mut dyn ForecastModel,
        split_at: usize,
    ) -> Result<PerformanceRow> {
        let run_name = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let run = self.client.start_run(&run_name)?;
        let run_id = run.run_id;

        self.client.log_param(&run_id, "model_name", name)?;
        self.client
            .log_param(&run_id, FLAVOR_KEY, model.flavor().as_str())?;
        for (key, value) in model.params() {
            self.client.log_param(&run_id, &key, &value)?;
        }

        let (train, test) = self.data.split_at(split_at);
        model.fit(train)?;
        self.client
            .log_artifact(&run_id, MODEL_ARTIFACT, model.to_artifact()?)?;

        let metrics = self.score(&*model, test)?;
        for (key, value) in metrics.iter().filter(|(_, v)| v.is_finite()) {
            self.client.log_metric(&run_id, key, *value)?;
        }
        self.client.end_run()?;

        Ok(PerformanceRow {
            model_name: name.to_string(),
            flavor: model.flavor(),
            config: self.config.models.get(name).cloned(),
            run_id: Some(run_id),
            metrics,
        })
    }

    /// Predict the test window and score it against the held-out rows
    fn score(&self, model: &dyn ForecastModel, test: &[Observation]) -> Result<BTreeMap<String, f64>> {
        let (first, last) = match (test.first(), test.last()) {
            (Some(first), Some(last)) => (first.date, last.date),
            _ => {
                return Err(ModelerError::InsufficientData {
                    required: 1,
                    actual: 0,
                })
            }
        };
        let n_days = (last - first).num_days() as usize + 1;
        let predicted = model.predict(&self.data, n_days, first, true)?;

        let (actual, predicted): (Vec<f64>, Vec<f64>) = test
            .iter()
            .filter_map(|o| {
                predicted
                    .iter()
                    .find(|p| p.date == o.date)
                    .map(|p| (o.value, p.value))
            })
            .unzip();
        Ok(self.evaluate_model(&actual, &predicted))
    }

    /// Score the current Production model on the test window.
    ///
    /// Adds the `prod_model` performance row and returns true on success; a
    /// missing or failing production model is only logged.
    pub fn prod_model_eval(&mut self) -> bool {
        match self.evaluate_production() {
            Ok(row) => {
                info!(key = %self.key_code, metrics = ?row.metrics, "production model evaluated");
                self.performances.push(row);
                true
            }
            Err(e) => {
                warn!(key = %self.key_code, error = %e, "production model not evaluated");
                false
            }
        }
    }

    fn evaluate_production(&self) -> Result<PerformanceRow> {
        let split_at = self.split_at.ok_or_else(|| {
            ModelerError::InvalidState("production evaluation needs a training split".to_string())
        })?;
        let model = self.load_registered(&self.production_uri())?;
        let metrics = self.score(model.as_ref(), &self.data[split_at..])?;
        Ok(PerformanceRow {
            model_name: PROD_MODEL.to_string(),
            flavor: model.flavor(),
            config: None,
            run_id: None,
            metrics,
        })
    }

    /// Rank the performance rows and remember the winner
    pub fn competition(&mut self) -> Result<Standings> {
        let standings = competition(
            &self.performances,
            &self.config.fcst_competition_metrics,
            &self.config.fcst_competition_metric_weights,
        )?;
        info!(key = %self.key_code, winner = %standings.winner, "competition won");
        self.winning_model_name = Some(standings.winner.clone());
        Ok(standings)
    }

    /// Check that the `stage` version of the registered model `name` can
    /// forecast `n_unit_test` days after the current date
    pub fn unit_test(&self, name: &str, stage: Stage) -> UnitTestStatus {
        let uri = format!("models:/{}/{}", name, stage);
        let first = self.current_date + Days::days(1);
        let n_days = self.config.n_unit_test;

        let outcome = self
            .load_registered(&uri)
            .and_then(|model| model.predict(&self.data, n_days, first, true));
        match outcome {
            Ok(points) if points.len() == n_days => UnitTestStatus::Ok,
            Ok(points) => {
                error!(%uri, expected = n_days, actual = points.len(), "unit test returned wrong length");
                UnitTestStatus::Ko
            }
            Err(e) => {
                error!(%uri, error = %e, "unit test failed");
                UnitTestStatus::Ko
            }
        }
    }

    /// Register the competition winner and promote it to Production if its
    /// unit test passes
    pub fn deploy(&mut self) -> Result<DeployOutcome> {
        let winner = self
            .winning_model_name
            .as_deref()
            .ok_or_else(|| ModelerError::InvalidState("no competition winner to deploy".to_string()))?;
        let row = self
            .performances
            .iter()
            .find(|r| r.model_name == winner)
            .ok_or_else(|| ModelerError::InvalidState(format!("no performance row for '{}'", winner)))?;

        let run_id = match &row.run_id {
            Some(run_id) => run_id,
            None => {
                info!(key = %self.key_code, "production model retained");
                return Ok(DeployOutcome::Retained);
            }
        };

        let source = format!("runs:/{}/{}", run_id, MODEL_ARTIFACT);
        let timeout = Duration::from_secs(self.config.register_timeout_secs);
        let version = self.client.register_model(&source, &self.key_code, timeout)?;
        self.client
            .set_model_tag(&version, FLAVOR_KEY, row.flavor.as_str())?;

        let staged = self.client.promote_model(&version, Stage::Staging, true)?;
        let unit_test = self.unit_test(&self.key_code, Stage::Staging);
        info!(key = %self.key_code, version = staged.version, %unit_test, "unit test done");
        if !unit_test.is_ok() {
            return Ok(DeployOutcome::Rejected { version: staged });
        }

        let promoted = self.client.promote_model(&staged, Stage::Production, true)?;
        let status = if promoted.status == VersionStatus::Ready {
            UnitTestStatus::Ok
        } else {
            UnitTestStatus::Ko
        };
        info!(key = %self.key_code, version = promoted.version, %status, "model deployed");
        Ok(DeployOutcome::Deployed {
            version: promoted,
            status,
        })
    }

    /// Forecast `fcst_horizon` days from the first forecast date.
    ///
    /// Uses the Production model, or repeats the last observed value when it
    /// cannot predict. Negative forecasts are clamped to zero.
    pub fn prediction(&self) -> Result<Vec<ForecastRow>> {
        let horizon = self.config.fcst_horizon;
        let future_only = self.config.future_only;

        let points = match self.load_registered(&self.production_uri()).and_then(|model| {
            model.predict(&self.data, horizon, self.fcst_first_date, future_only)
        }) {
            Ok(points) => points,
            Err(e) => {
                error!(
                    key = %self.key_code,
                    error = %e,
                    "production model could not predict, repeating last value"
                );
                naive_forecast(&self.data, horizon, self.fcst_first_date, future_only)?
            }
        };

        Ok(points.into_iter().map(|p| self.forecast_row(p)).collect())
    }

    fn forecast_row(&self, point: ForecastPoint) -> ForecastRow {
        ForecastRow {
            key: self.key_code.clone(),
            date: point.date,
            forecast: point.value.max(0.0),
            reference_date: self.fcst_first_date,
            creation_date: self.current_date,
        }
    }

    /// Training, production evaluation, competition, deploy and prediction.
    ///
    /// Only a failing prediction is an error; earlier steps are logged and
    /// the forecast still comes from whatever is in production.
    pub fn run(&mut self) -> Result<Vec<ForecastRow>> {
        info!(key = %self.key_code, "modeler run started");
        match self.training() {
            Ok(()) => {
                self.prod_model_eval();
                match self.competition().and_then(|_| self.deploy()) {
                    Ok(outcome) => debug!(key = %self.key_code, ?outcome, "deploy finished"),
                    Err(e) => error!(key = %self.key_code, error = %e, "no model deployed"),
                }
            }
            Err(e) => error!(key = %self.key_code, error = %e, "training failed"),
        }
        self.prediction()
    }

    fn load_registered(&self, uri: &str) -> Result<Box<dyn ForecastModel>> {
        let (artifact, flavor) = self.client.load_model(uri)?;
        self.model_generation(flavor.parse()?, &Value::Null, Some(&artifact))
    }
}
