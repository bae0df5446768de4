use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use grabber_core::{BatchState, EventSink};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::filename::progress_id;
use crate::pace::Pacer;
use crate::{DownloadOutcome, FailureKind, FetchError, Fetcher};

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub max_attempts: u32,
    /// Attempt N waits `(N - 1) * backoff_unit` before starting.
    pub backoff_unit: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(5),
        }
    }
}

enum AttemptResult {
    Done(u64),
    Cancelled,
    Failed(FetchError),
}

/// Streams one binary to disk with linear-backoff retries.
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn EventSink>,
    settings: DownloadSettings,
}

impl Downloader {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        pacer: Arc<dyn Pacer>,
        sink: Arc<dyn EventSink>,
        settings: DownloadSettings,
    ) -> Self {
        Self {
            fetcher,
            pacer,
            sink,
            settings,
        }
    }

    /// Download `url` to `destination`, making at most `max_attempts` requests.
    ///
    /// A cancelled or failed download may leave a partial file behind; the
    /// caller removes it.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        title: &str,
        max_attempts: u32,
        state: &BatchState,
    ) -> DownloadOutcome {
        let max_attempts = max_attempts.max(1);
        let line_id = progress_id(title);
        let mut last_error = FetchError::new(FailureKind::Network, "no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let wait = self.settings.backoff_unit * (attempt - 1);
                self.sink.log(format!(
                    "Waiting {}s before retrying: {title} (attempt {attempt} of {max_attempts})",
                    wait.as_secs_f32()
                ));
                self.pacer.pause(wait).await;
            }
            if state.is_cancelled() {
                return DownloadOutcome::Cancelled {
                    attempts: attempt - 1,
                };
            }

            self.sink
                .named_progress(&line_id, format!("Starting download: {title}"));
            match self.attempt(url, destination, title, &line_id, state).await {
                AttemptResult::Done(bytes) => {
                    self.sink
                        .named_progress(&line_id, format!("Download complete: {title}"));
                    engine_info!("Downloaded {} ({} bytes, attempt {})", url, bytes, attempt);
                    return DownloadOutcome::Completed {
                        bytes,
                        attempts: attempt,
                    };
                }
                AttemptResult::Cancelled => {
                    engine_info!("Download of {} cancelled mid-stream", url);
                    return DownloadOutcome::Cancelled { attempts: attempt };
                }
                AttemptResult::Failed(err) => {
                    engine_warn!("Attempt {} for {} failed: {}", attempt, url, err);
                    if attempt < max_attempts {
                        if err.is_unavailable() {
                            self.sink.log(format!(
                                "Server temporarily unavailable: {title} - retrying in {}s",
                                (self.settings.backoff_unit * attempt).as_secs_f32()
                            ));
                        } else {
                            self.sink
                                .log(format!("Download error: {title} - {err} (will retry)"));
                        }
                    }
                    last_error = err;
                }
            }
        }

        let cause = if last_error.is_unavailable() {
            "server temporarily unavailable".to_string()
        } else {
            last_error.to_string()
        };
        self.sink.log(format!(
            "Download failed after {max_attempts} attempts: {title} - {cause}"
        ));
        DownloadOutcome::Failed {
            error: last_error,
            attempts: max_attempts,
        }
    }

    async fn attempt(
        &self,
        url: &str,
        destination: &Path,
        title: &str,
        line_id: &str,
        state: &BatchState,
    ) -> AttemptResult {
        let mut body = match self.fetcher.open_download(url).await {
            Ok(body) => body,
            Err(err) => return AttemptResult::Failed(err),
        };
        let mut file = match File::create(destination).await {
            Ok(file) => file,
            Err(err) => return AttemptResult::Failed(io_error(destination, err)),
        };

        let mut written: u64 = 0;
        while let Some(chunk) = body.chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => return AttemptResult::Failed(err),
            };
            if let Err(err) = file.write_all(&chunk).await {
                return AttemptResult::Failed(io_error(destination, err));
            }
            written += chunk.len() as u64;

            if let Some(total) = body.content_length {
                let percent = written as f64 / total as f64 * 100.0;
                self.sink.named_progress(
                    line_id,
                    format!("Downloading: {title} ({percent:.1}%)"),
                );
            }
            if state.is_cancelled() {
                let _ = file.flush().await;
                return AttemptResult::Cancelled;
            }
        }

        if let Err(err) = file.flush().await {
            return AttemptResult::Failed(io_error(destination, err));
        }
        engine_debug!("Wrote {} bytes to {:?}", written, destination);
        AttemptResult::Done(written)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Io, format!("{}: {err}", path.display()))
}
