mod config;
mod loader;
mod report;

use clap::Parser;
use config::{Cli, Config};
use loader::{LoadErr, load_dataset};
use report::RunReport;
use scheduler::{ScheduleErr, TimeslotIndex, expand_rows, write_schedule};
use std::io;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Anything that stops a run before the timetable is written
#[derive(Debug, thiserror::Error)]
enum RunErr {
    #[error(transparent)]
    Load(#[from] LoadErr),
    #[error(transparent)]
    Schedule(#[from] ScheduleErr),
    #[error("failed to write run report: {0}")]
    Report(#[from] io::Error),
}

fn run(config: &Config) -> Result<(), RunErr> {
    info!("loading input tables from {}", config.data_dir.display());
    let dataset = load_dataset(&config.data_dir)?;

    let outcome = scheduler::schedule(&dataset, &config.scheduler)?;
    info!(
        "placed {} of {} sessions",
        outcome.assignments.len(),
        outcome.session_count
    );

    let index = TimeslotIndex::build(&dataset.timeslots, &config.scheduler);
    let rows = expand_rows(&outcome.assignments, &index);
    write_schedule(&config.output, &rows)?;

    if let Some(path) = &config.report {
        RunReport::from(&outcome).write(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = Config::from(Cli::parse());

    // Setup formatting and environment for trace
    let fmt_layer = fmt::layer().with_file(true).with_line_number(true).pretty();
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
