//! Grabber engine: fetching, link resolution and the download pipeline.
mod decode;
mod download;
mod fetch;
mod filename;
mod orchestrator;
mod pace;
mod pagination;
mod parse;
mod persist;
mod resolver;
mod sink;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use download::{DownloadSettings, Downloader};
pub use fetch::{DownloadBody, FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{archive_filename, fallback_title, progress_id, sanitize_title, MAX_TITLE_CHARS};
pub use orchestrator::{BatchOrchestrator, BatchSettings};
pub use pace::{Pacer, TokioPacer};
pub use pagination::PaginationDriver;
pub use parse::{first_links, first_text, PageParser, ScraperPageParser};
pub use persist::{ensure_output_dir, PartialDownload, PersistError};
pub use resolver::{ItemPage, LinkResolver};
pub use sink::ChannelSink;
pub use types::{
    DownloadOutcome, FailureKind, FetchError, FetchMetadata, FetchOutput, Hop, ResolveError,
    RunError, RunStatus,
};
