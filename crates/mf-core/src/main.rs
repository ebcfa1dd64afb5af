//! Metricflow CLI: run the estimation engine over JSON files.
//!
//! `estimate` folds a batch of observations into a (optionally pre-seeded)
//! state record and prints the result; `calibrate` analyzes an exported
//! estimate history. Both operate on the in-memory store, so persistence is
//! limited to the optional state import/export files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mf_common::{Error, MetricKey, OutputFormat, PersistedState, Result};
use mf_config::EngineConfig;
use mf_core::state::{Estimate, Observation};
use mf_core::store::MemoryStore;
use mf_core::{calibrate, EstimationService};

#[derive(Parser)]
#[command(name = "mf-core", version, about = "Metricflow state estimation engine")]
struct Cli {
    /// Engine configuration file (JSON); defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output rendering.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fold an observation batch into a metric's state and print the result.
    Estimate {
        #[arg(long)]
        user: String,
        #[arg(long)]
        metric: String,
        /// JSON file holding an array of observations.
        #[arg(long)]
        observations: PathBuf,
        /// Forecast horizon in days.
        #[arg(long)]
        horizon: Option<u32>,
        /// Persisted state record to resume from.
        #[arg(long)]
        state: Option<PathBuf>,
        /// Where to write the posterior state record.
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
    /// Analyze an exported estimate history for noise mis-tuning.
    Calibrate {
        /// JSON file holding an array of historical estimates.
        #[arg(long)]
        estimates: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {}", err.code(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Estimate {
            user,
            metric,
            observations,
            horizon,
            state,
            state_out,
        } => {
            let key = MetricKey::new(user, metric);
            let store = MemoryStore::new();

            if let Some(path) = state {
                let raw = std::fs::read_to_string(path)?;
                let record: PersistedState = serde_json::from_str(&raw)?;
                if !mf_common::schema::is_compatible(&record.schema_version) {
                    return Err(Error::Config(format!(
                        "incompatible state schema version {}",
                        record.schema_version
                    )));
                }
                store.seed_state(&key, record);
            }

            let raw = std::fs::read_to_string(observations)?;
            let batch: Vec<Observation> = serde_json::from_str(&raw)?;

            let service = EstimationService::new(store, config)?;
            let response = service.estimate(&key, &batch, horizon)?;

            if let Some(path) = state_out {
                let record = response.state.to_persisted();
                std::fs::write(path, serde_json::to_string_pretty(&record)?)?;
            }

            print_json(&response, cli.format)
        }
        Command::Calibrate { estimates } => {
            let raw = std::fs::read_to_string(estimates)?;
            let history: Vec<Estimate> = serde_json::from_str(&raw)?;
            let report = calibrate::analyze(&history, &config.calibration, &config.filter)?;
            print_json(&report, cli.format)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
    };
    println!("{rendered}");
    Ok(())
}
