//! # kronos
//!
//! Command-line interface for kronos: train, deploy and forecast every key of
//! a CSV table, and inspect the model registry.

mod table;

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use kronos_udf::{ForecastUdf, UdfMode, UdfOptions};
use modeler_core::KronosConfig;
use registry_core::{ExperimentTracker, FileStore, ModelRegistry, FLAVOR_KEY};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const STORE_ENV: &str = "KRONOS_STORE";
/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "kronos=info,modeler_core=info,kronos_udf=info,registry_core=info";

#[derive(Parser)]
#[command(name = "kronos")]
#[command(about = "Time series forecasting with a model registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, deploy and forecast every key of a table
    Run {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// JSON configuration document
        #[arg(short, long)]
        config: PathBuf,

        /// Registry directory (default: KRONOS_STORE, then the config's "store")
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Forecast with the current Production models only
        #[arg(long)]
        predict_only: bool,
    },

    /// List registered model versions
    Models {
        /// Registry directory (default: KRONOS_STORE)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Only the model registered for this key
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List the runs of an experiment with their metrics
    Runs {
        /// Registry directory (default: KRONOS_STORE)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Experiment path, e.g. /kronos/experiments/<key>
        #[arg(short, long)]
        experiment: String,
    },
}

/// Store directory from the flag, the environment or the configuration
fn resolve_store(flag: Option<PathBuf>, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(path) = std::env::var(STORE_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    match configured {
        Some(path) => Ok(path.to_path_buf()),
        None => bail!("No registry store given: use --store or set {}", STORE_ENV),
    }
}

fn open_store(path: &Path) -> Result<FileStore> {
    FileStore::open(path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn run_pipeline(
    input: PathBuf,
    config: PathBuf,
    store: Option<PathBuf>,
    output: Option<PathBuf>,
    predict_only: bool,
) -> Result<()> {
    let text = fs::read_to_string(&config)
        .with_context(|| format!("Failed to read config {}", config.display()))?;
    let config = KronosConfig::from_json(&text)
        .with_context(|| format!("Invalid config {}", config.display()))?;

    let store_path = resolve_store(store, config.store.as_deref())?;
    let store = Arc::new(open_store(&store_path)?);

    let file = File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
    let rows = table::read_observations(BufReader::new(file), &config.columns)?;
    info!(rows = rows.len(), store = %store_path.display(), "input loaded");

    let mode = if predict_only {
        UdfMode::PredictOnly
    } else {
        UdfMode::Full
    };
    let udf = ForecastUdf::new(store, UdfOptions::new(config.modeler.clone()).mode(mode));
    let forecast = udf.apply(rows);
    info!(rows = forecast.len(), "forecast ready");

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            table::write_forecast(file, &forecast, &config.columns)?;
            println!("Forecast written to {}", path.display());
        }
        None => table::write_forecast(io::stdout().lock(), &forecast, &config.columns)?,
    }
    Ok(())
}

fn list_models(store: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let store = open_store(&resolve_store(store, None)?)?;
    let models = store.list_models()?;

    println!(
        "{:<24} {:>7} {:<11} {:<20} {:<12} {}",
        "NAME", "VERSION", "STAGE", "STATUS", "FLAVOR", "RUN"
    );
    for model in models
        .iter()
        .filter(|m| name.as_ref().map_or(true, |n| &m.name == n))
    {
        for version in &model.versions {
            println!(
                "{:<24} {:>7} {:<11} {:<20} {:<12} {}",
                version.name,
                version.version,
                version.current_stage.to_string(),
                format!("{:?}", version.status),
                version.tags.get(FLAVOR_KEY).map_or("-", String::as_str),
                version.run_id.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}

fn list_runs(store: Option<PathBuf>, experiment: String) -> Result<()> {
    let store = open_store(&resolve_store(store, None)?)?;
    let found = store
        .get_experiment_by_path(&experiment)?
        .with_context(|| format!("Experiment '{}' not found", experiment))?;

    for run in store.list_runs(&found.experiment_id)? {
        let model = run.params.get("model_name").map_or("-", String::as_str);
        let metrics = serde_json::to_string(&run.metrics)?;
        println!(
            "{}  {:<26} {:<9} {:<16} {}",
            run.run_id,
            run.name,
            format!("{:?}", run.status),
            model,
            metrics
        );
    }
    Ok(())
}

fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            store,
            output,
            predict_only,
        } => run_pipeline(input, config, store, output, predict_only),

        Commands::Models { store, name } => list_models(store, name),

        Commands::Runs { store, experiment } => list_runs(store, experiment),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "kronos", "run", "--input", "data.csv", "--config", "kronos.json", "--predict-only",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                input,
                predict_only,
                store,
                ..
            } => {
                assert_eq!(input, PathBuf::from("data.csv"));
                assert!(predict_only);
                assert!(store.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_flag_wins_over_config() {
        let store = resolve_store(Some(PathBuf::from("/flag")), Some(Path::new("/config"))).unwrap();
        assert_eq!(store, PathBuf::from("/flag"));
    }

    #[test]
    fn test_default_log_filter_covers_workspace() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        for target in ["kronos", "modeler_core", "kronos_udf", "registry_core"] {
            assert!(
                DEFAULT_LOG_FILTER.contains(&format!("{}=info", target)),
                "{} missing",
                target
            );
        }
    }

    #[test]
    fn test_run_pipeline_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("data.csv");
        let config = dir.path().join("kronos.json");
        let output = dir.path().join("forecast.csv");

        let mut csv = String::from("key,date,value\n");
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..5 {
            let date = start + chrono::Duration::days(i);
            csv.push_str(&format!("a,{},{}\n", date, 10 + i));
        }
        fs::write(&input, csv).unwrap();
        fs::write(&config, r#"{ "current_date": "2024-01-05", "fcst_horizon": 3 }"#).unwrap();

        run_pipeline(
            input,
            config,
            Some(dir.path().join("store")),
            Some(output.clone()),
            true,
        )
        .unwrap();

        let text = fs::read_to_string(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "key,date,forecast,reference_date,creation_date");
        assert_eq!(lines[1], "a,2024-01-06,14,2024-01-06,2024-01-05");
        assert_eq!(lines.len(), 4);
    }
}
