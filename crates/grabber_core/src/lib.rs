//! Grabber core: job data model, shared batch state and event types.
mod event;
mod job;
mod listing;
mod selector;
mod state;

pub use event::{EngineEvent, EventSink, ProgressEvent, RunSummary};
pub use job::{DownloadJob, JobStatus, Resolution, TransitionError};
pub use listing::{page_url, ListingDescriptor, ListingError};
pub use selector::{SelectorProfile, SelectorStrategy, StrategyKind};
pub use state::{effective_concurrency, BatchState, MAX_CONCURRENCY};

/// Absolute URL of one downloadable entity found on a listing page.
pub type ItemRef = String;
