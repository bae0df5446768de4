//! Command-line arguments. Every job option is optional here so that a job
//! file can supply it; flags win over the file.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Walk paginated gallery listings and download every item's archive.
#[derive(Parser, Debug)]
#[command(name = "grabber")]
#[command(author, version, about)]
pub struct Args {
    /// Listing URL of the first page; a `page-N` segment or `page=N` query is rewritten per page
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// First listing page to scan
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Last listing page to scan (defaults to the start page)
    #[arg(long)]
    pub end_page: Option<u32>,

    /// Folder the archives are written to
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Simultaneous downloads; values above 3 are clamped
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// RON job file with listing, delays, retries and selectors
    #[arg(short = 'j', long)]
    pub job: Option<PathBuf>,

    /// Pause between listing pages in milliseconds
    #[arg(long)]
    pub page_delay_ms: Option<u64>,

    /// Pause between download batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Requests per download before giving up
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Diagnostic log file
    #[arg(long, default_value = "grabber.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
