/// # donation-etl CLI
///
/// Command parsing and dispatch. Pipeline logic lives in [`crate::pipeline`];
/// this module only wires configuration to it and prints results.
///
/// - `run`: one ETL run, optionally followed by an export of the cleaned records.
/// - `schedule`: re-run on a fixed interval until the process is stopped.
/// - `logs`: print the tail of the log file.
///
/// [`run`] is the programmatic entry point shared by `main` and the tests.
use crate::config::PipelineConfig;
use crate::export::ExportFormat;
use crate::load_config::load_config_or_default;
use crate::logging;
use crate::model::RunOutput;
use crate::pipeline::Pipeline;
use crate::schedule::{minutes, schedule_pipeline};
use crate::session::Session;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for donation-etl: extract, clean, aggregate and persist donations.
#[derive(Parser)]
#[clap(
    name = "donation-etl",
    version,
    about = "Extract, clean, aggregate and persist donation records"
)]
pub struct Cli {
    /// Path to the YAML config file (defaults to ./donation-etl.yaml when present)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the pipeline once
    Run {
        /// Fetch from the remote endpoint instead of the local fixture
        #[clap(long)]
        remote: bool,
        /// Export the cleaned records after a successful run
        #[clap(long, value_enum)]
        export: Option<ExportFormat>,
    },
    /// Run the pipeline on a fixed interval, forever
    Schedule {
        /// Minutes between runs (overrides schedule.interval_minutes)
        #[clap(long)]
        interval_minutes: Option<u64>,
    },
    /// Print the last lines of the pipeline log
    Logs {
        #[clap(long, default_value_t = 50)]
        lines: usize,
    },
}

/// Loads the configuration named by `cli` and executes its command.
pub async fn run(cli: Cli) -> Result<()> {
    let config = load_config_or_default(cli.config)?;
    execute(cli.command, &config).await
}

/// Executes `command` against an already loaded configuration.
pub async fn execute(command: Commands, config: &PipelineConfig) -> Result<()> {
    match command {
        Commands::Run { remote, export } => {
            tracing::info!(command = "run", remote, "Starting pipeline run");
            let pipeline = Pipeline::from_config(config)?;
            let mut session = Session::new(&pipeline);
            match session.run(remote).await {
                Ok(output) => {
                    println!("Pipeline complete.");
                    print_run(output);
                }
                Err(e) => {
                    eprintln!("[ERROR] Pipeline failed: {e}");
                    return Err(e.into());
                }
            }
            if let Some(format) = export {
                let path = session.export(format)?;
                println!("Exported to {}", path.display());
            }
            Ok(())
        }
        Commands::Schedule { interval_minutes } => {
            let interval = minutes(interval_minutes.unwrap_or(config.schedule.interval_minutes));
            if interval.is_zero() {
                anyhow::bail!("--interval-minutes must be positive");
            }
            tracing::info!(command = "schedule", interval_secs = interval.as_secs(), "Starting scheduler");
            let pipeline = Pipeline::from_config(config)?;
            schedule_pipeline(&pipeline, interval).await;
            Ok(())
        }
        Commands::Logs { lines } => {
            for line in logging::tail(&config.log.file, lines)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn print_run(output: &RunOutput) {
    println!("Run {}: {} donations processed", output.run_id, output.donations.len());
    println!("{:>12} {:>14} {:>10}", "campaign_id", "total_amount", "count");
    for s in &output.stats {
        println!(
            "{:>12} {:>14.2} {:>10}",
            s.campaign_id, s.total_amount, s.donation_count
        );
    }
}
