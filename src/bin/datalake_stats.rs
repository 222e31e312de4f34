use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use datalake_stats::app::App;
use datalake_stats::config::ConfigLoader;
use datalake_stats::error::StatsError;
use datalake_stats::output::{JsonOutput, OutputMode};
use datalake_stats::sink::PostgresSink;

#[derive(Parser)]
#[command(name = "datalake-stats")]
#[command(about = "Collect proteomics and NGS data lake statistics into the data warehouse")]
#[command(version)]
struct Cli {
    /// Scan every dataset and print the reports as JSON without touching the database
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<StatsError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &StatsError) -> u8 {
    match error {
        StatsError::MissingConfig(_)
        | StatsError::InvalidConfig { .. }
        | StatsError::InvalidAccountName(_)
        | StatsError::InvalidContainerName(_)
        | StatsError::InvalidPrefix(_) => 2,
        StatsError::BlobHttp(_) | StatsError::BlobStatus { .. } | StatsError::Database(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.dry_run {
        OutputMode::DryRun
    } else {
        OutputMode::Warehouse
    };

    let config = ConfigLoader::from_env()?;
    let pipeline_run_id = Uuid::new_v4();
    info!(%pipeline_run_id, ?output_mode, "start collecting stats");

    let proteomics = config.proteomics.client(config.page_size)?;
    let ngs = config.ngs.client(config.page_size)?;

    let summary = match output_mode {
        OutputMode::DryRun => {
            let app = App::new(proteomics, ngs, JsonOutput);
            app.collect_all(pipeline_run_id, &config.datasets)?
        }
        OutputMode::Warehouse => {
            let database = ConfigLoader::database_from_env()?;
            let sink = PostgresSink::new(&database)?;
            let app = App::new(proteomics, ngs, sink);
            app.collect_all(pipeline_run_id, &config.datasets)?
        }
    };

    info!(
        %pipeline_run_id,
        jobs = summary.jobs.len(),
        "finished collecting stats"
    );
    Ok(())
}
