#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the block activity matrix.
//!
//! Uses `indicatif-log-bridge` (via [`block_activity_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the stage bar never fight for the terminal.

use std::path::PathBuf;
use std::time::Instant;

use block_activity::PipelineConfig;
use block_activity::pipeline::{load_catalog, run};
use block_activity::progress::ProgressCallback;
use block_activity::sink::CsvSink;
use block_activity_cli_utils::IndicatifProgress;
use block_activity_source::{JsonRecordLoader, RecordLoader};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "block_activity",
    about = "Film permit and 311 complaint counts per tax block per day"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the input files (overrides `BLOCK_ACTIVITY_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the tax block by day matrix
    Run {
        /// First day of the observation window (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Last day of the observation window, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Rebuild the intersection catalog even if a cache exists
        #[arg(long)]
        refresh: bool,
        /// Where to write the CSV matrix
        #[arg(long)]
        output: Option<PathBuf>,
        /// Read complaints and permits from this `DuckDB` store instead of
        /// the JSON exports
        #[cfg(feature = "duckdb")]
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Build (or load) the intersection catalog cache only
    Intersections {
        /// Rebuild the catalog even if a cache exists
        #[arg(long)]
        refresh: bool,
    },
    /// Copy the complaint and permit JSON exports into a `DuckDB` store
    #[cfg(feature = "duckdb")]
    Import {
        /// Store to (re)create
        #[arg(long)]
        store: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = block_activity_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let start = Instant::now();

    match cli.command {
        Commands::Run {
            start_date,
            end_date,
            refresh,
            output,
            #[cfg(feature = "duckdb")]
            store,
        } => {
            if let Some(date) = start_date {
                config.start_date = date;
            }
            if let Some(date) = end_date {
                config.end_date = date;
            }
            if output.is_some() {
                config.output_path = output;
            }
            config.refresh |= refresh;

            #[cfg(feature = "duckdb")]
            let loader: Box<dyn RecordLoader> = match store {
                Some(path) => Box::new(block_activity_source::DuckDbLoader::open(&path)?),
                None => Box::new(json_loader(&config)?),
            };
            #[cfg(not(feature = "duckdb"))]
            let loader: Box<dyn RecordLoader> = Box::new(json_loader(&config)?);

            let mut sink = CsvSink::new(config.output_file());
            let progress = IndicatifProgress::stages_bar(&multi, "Starting");
            let report = run(&config, loader.as_ref(), &mut sink, &progress)?;

            log::info!(
                "Wrote {} rows to {} in {:.1}s",
                report.output_rows,
                sink.path().display(),
                start.elapsed().as_secs_f64()
            );
        }
        Commands::Intersections { refresh } => {
            config.refresh |= refresh;
            let spinner = IndicatifProgress::stages_bar(&multi, "Loading intersection catalog");
            let catalog = load_catalog(&config);
            spinner.finish_and_clear();
            let catalog = catalog?;
            log::info!(
                "Intersection catalog has {} street pairs ({:.1}s)",
                catalog.len(),
                start.elapsed().as_secs_f64()
            );
        }
        #[cfg(feature = "duckdb")]
        Commands::Import { store } => {
            let exports = JsonRecordLoader::new(config.complaints_file(), config.permits_file());
            let spinner = IndicatifProgress::stages_bar(&multi, "Importing exports");
            let imported = block_activity_source::store::open(&store)
                .and_then(|conn| block_activity_source::store::import_json(&conn, &exports));
            spinner.finish_and_clear();
            let counts = imported?;
            log::info!(
                "Imported {} complaints and {} permits into {} ({:.1}s)",
                counts.complaints,
                counts.permits,
                store.display(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}

fn json_loader(config: &PipelineConfig) -> Result<JsonRecordLoader, Box<dyn std::error::Error>> {
    let loader = JsonRecordLoader::new(config.complaints_file(), config.permits_file());
    loader.check_inputs()?;
    Ok(loader)
}
