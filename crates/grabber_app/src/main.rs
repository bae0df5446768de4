mod cli;
mod config;
mod console;

use std::io;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::Result;
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn, LogDestination};
use grabber_engine::{BatchOrchestrator, ChannelSink, ReqwestFetcher, RunStatus};

use cli::Args;
use config::{load_job_file, JobFile, JobPlan};
use console::spawn_renderer;

/// Conventional exit status for a run stopped by SIGINT.
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    engine_logging::initialize(LogDestination::File, args.log_level(), &args.log_file);
    engine_info!("grabber {} starting", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(RunStatus::Completed(summary)) => {
            engine_info!("Run complete: {:?}", summary);
            ExitCode::SUCCESS
        }
        Ok(RunStatus::Cancelled) => ExitCode::from(EXIT_CANCELLED),
        Err(err) => {
            engine_error!("Run failed: {:#}", err);
            eprintln!("grabber: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunStatus> {
    let file = match &args.job {
        Some(path) => load_job_file(path)?,
        None => JobFile::default(),
    };
    let plan = JobPlan::resolve(&args, file)?;
    engine_info!(
        "Job: {} pages {}..={} into {:?}",
        plan.listing.base_url(),
        plan.listing.start_page(),
        plan.listing.end_page(),
        plan.output
    );
    let fetcher = Arc::new(ReqwestFetcher::new(plan.fetch.clone())?);

    let (event_tx, event_rx) = mpsc::channel();
    let renderer = spawn_renderer(io::stdout(), event_rx);

    let orchestrator = BatchOrchestrator::new(
        fetcher,
        Arc::new(ChannelSink::new(event_tx)),
        plan.batch.clone(),
    )
    .with_profile(plan.profile.clone());

    let state = orchestrator.state();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_info!("Interrupt received, cancelling run");
            state.cancel();
        }
    });

    // The orchestrator owns the last sender; it is dropped when `run`
    // returns, which ends the renderer loop.
    let result = orchestrator
        .run(&plan.listing, &plan.output, plan.concurrency)
        .await;
    if renderer.await.is_err() {
        engine_warn!("Console renderer panicked");
    }
    Ok(result?)
}
