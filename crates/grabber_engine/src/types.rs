use std::fmt;

use grabber_core::RunSummary;

use crate::persist::PersistError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP 503, which the remote uses to signal "slow down".
    pub fn is_unavailable(&self) -> bool {
        self.kind == FailureKind::HttpStatus(503)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    InvalidConfig,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::InvalidConfig => write!(f, "invalid client configuration"),
            FailureKind::HttpStatus(503) => write!(f, "http status 503 (temporarily unavailable)"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// Which step of the item → download page → binary chain failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    ItemPage,
    DownloadPage,
    FinalLink,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hop::ItemPage => write!(f, "hop 1 (item page)"),
            Hop::DownloadPage => write!(f, "hop 2 (download page link)"),
            Hop::FinalLink => write!(f, "hop 3 (final download link)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no selector matched for {task}")]
    NoMatch { task: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { bytes: u64, attempts: u32 },
    Failed { error: FetchError, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl DownloadOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            DownloadOutcome::Completed { attempts, .. }
            | DownloadOutcome::Failed { attempts, .. }
            | DownloadOutcome::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed(RunSummary),
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("cannot prepare output directory: {0}")]
    OutputDir(#[from] PersistError),
}
