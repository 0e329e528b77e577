//! Pokeria KPI report
//!
//! Reads the configured daily CSV and writes `daily_kpi.csv` and
//! `summary.json` into the output directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pokeria_core::ingest::IngestPolicy;
use pokeria_core::{Pipeline, SummaryOptions};
use pokeria_shared::{AppConfig, AppError};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pokeria=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let app_error = err.downcast_ref::<AppError>();
            error!(
                code = app_error.map_or("INTERNAL_ERROR", AppError::error_code),
                "{err:#}"
            );
            ExitCode::from(app_error.map_or(1, AppError::exit_code))
        }
    }
}

fn run() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::load().map_err(AppError::from)?;
    config.validate()?;

    let input = File::open(&config.input.path)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to open {}", config.input.path))?;
    info!(path = %config.input.path, "Reading daily table");

    let analysis = Pipeline::from_config(&config)
        .run(BufReader::new(input))
        .map_err(AppError::from)?;
    let summary = analysis
        .summary(&SummaryOptions::from(&config.report))
        .map_err(AppError::from)?;

    let output_dir = Path::new(&config.report.output_dir);
    fs::create_dir_all(output_dir)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let table_path = output_dir.join("daily_kpi.csv");
    let table = File::create(&table_path)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to create {}", table_path.display()))?;
    let delimiter = IngestPolicy::from(&config.input).delimiter;
    analysis
        .write_daily_table(BufWriter::new(table), Some(&summary.range), delimiter)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to write {}", table_path.display()))?;

    let summary_path = output_dir.join("summary.json");
    let json = serde_json::to_string_pretty(&summary)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    fs::write(&summary_path, json)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    info!(
        start = %summary.range.start(),
        end = %summary.range.end(),
        revenue = %summary.period.revenue,
        pct_ingredient = %summary.period.pct_ingredient,
        critical_days = summary.period.critical_days,
        "Report written to {}",
        output_dir.display()
    );

    Ok(())
}
