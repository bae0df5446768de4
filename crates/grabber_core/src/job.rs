use std::path::{Path, PathBuf};

use thiserror::Error;

/// Outcome of chasing an item page down to its binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub title: String,
    /// `None` when any hop of the chain failed.
    pub final_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    SkippedExists,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal job transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One item's download, owned by the worker that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    destination: PathBuf,
    source_url: Option<String>,
    title: String,
    attempts: u32,
    status: JobStatus,
}

impl DownloadJob {
    pub fn new(title: impl Into<String>, destination: PathBuf) -> Self {
        Self {
            destination,
            source_url: None,
            title: title.into(),
            attempts: 0,
            status: JobStatus::Pending,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn set_source_url(&mut self, url: impl Into<String>) {
        self.source_url = Some(url.into());
    }

    pub fn record_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Pending, JobStatus::InProgress)
    }

    pub fn skip_existing(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Pending, JobStatus::SkippedExists)
    }

    pub fn succeed(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::InProgress, JobStatus::Succeeded)
    }

    pub fn fail(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::InProgress, JobStatus::Failed)
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::InProgress, JobStatus::Cancelled)
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<(), TransitionError> {
        if self.status != from {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
