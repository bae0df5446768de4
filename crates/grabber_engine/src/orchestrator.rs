use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use grabber_core::{
    effective_concurrency, BatchState, DownloadJob, EngineEvent, EventSink, JobStatus,
    ListingDescriptor, RunSummary, SelectorProfile, TransitionError,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::download::{DownloadSettings, Downloader};
use crate::filename::archive_filename;
use crate::pace::{Pacer, TokioPacer};
use crate::pagination::PaginationDriver;
use crate::parse::{PageParser, ScraperPageParser};
use crate::persist::{ensure_output_dir, PartialDownload};
use crate::resolver::LinkResolver;
use crate::{DownloadOutcome, Fetcher, RunError, RunStatus};

#[derive(Debug, Clone)]
pub struct BatchSettings {
    /// Items submitted to the worker pool per batch.
    pub batch_size: usize,
    /// Pause between batch submissions.
    pub batch_delay: Duration,
    /// Pause between listing pages.
    pub page_delay: Duration,
    /// Pause before an item's download link is resolved.
    pub politeness_delay: Duration,
    pub download: DownloadSettings,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(3),
            page_delay: Duration::from_secs(2),
            politeness_delay: Duration::from_secs(1),
            download: DownloadSettings::default(),
        }
    }
}

/// Runs one job: discovery, then resolution and download of every item on a
/// bounded pool. `run` consumes the orchestrator, so its state and
/// cancellation flag belong to exactly one job.
pub struct BatchOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
    profile: Arc<SelectorProfile>,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn EventSink>,
    settings: BatchSettings,
    state: Arc<BatchState>,
}

impl BatchOrchestrator {
    pub fn new(fetcher: Arc<dyn Fetcher>, sink: Arc<dyn EventSink>, settings: BatchSettings) -> Self {
        Self {
            fetcher,
            parser: Arc::new(ScraperPageParser),
            profile: Arc::new(SelectorProfile::default()),
            pacer: Arc::new(TokioPacer),
            sink,
            settings,
            state: Arc::new(BatchState::new()),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn PageParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_profile(mut self, profile: SelectorProfile) -> Self {
        self.profile = Arc::new(profile);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Shared state of this job; cancel through it from any thread.
    pub fn state(&self) -> Arc<BatchState> {
        self.state.clone()
    }

    pub fn cancel(&self) {
        self.state.cancel();
    }

    pub async fn run(
        self,
        listing: &ListingDescriptor,
        destination: &Path,
        concurrency: usize,
    ) -> Result<RunStatus, RunError> {
        if let Err(err) = ensure_output_dir(destination) {
            let err = RunError::from(err);
            engine_error!("Job setup failed for {:?}: {}", destination, err);
            self.sink.emit(EngineEvent::Fatal(err.to_string()));
            return Err(err);
        }

        let resolver = Arc::new(LinkResolver::new(
            self.fetcher.clone(),
            self.parser.clone(),
            self.profile.clone(),
            self.sink.clone(),
        ));
        let driver = PaginationDriver::new(
            resolver.clone(),
            self.pacer.clone(),
            self.sink.clone(),
            self.settings.page_delay,
        );

        let items = driver.discover(listing, &self.state).await;
        if self.state.is_cancelled() {
            return Ok(self.cancelled());
        }

        let total = items.len();
        self.state.set_total(total);
        self.sink.aggregate(0, total);

        let workers = effective_concurrency(concurrency);
        self.sink.log(format!(
            "Using {workers} concurrent downloads (requested {concurrency})"
        ));

        let worker = ItemWorker {
            resolver,
            downloader: Arc::new(Downloader::new(
                self.fetcher.clone(),
                self.pacer.clone(),
                self.sink.clone(),
                self.settings.download.clone(),
            )),
            pacer: self.pacer.clone(),
            sink: self.sink.clone(),
            state: self.state.clone(),
            destination: destination.to_path_buf(),
            politeness_delay: self.settings.politeness_delay,
            max_attempts: self.settings.download.max_attempts,
        };
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<Option<DownloadJob>> = JoinSet::new();

        let batch_size = self.settings.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);
        'submit: for (index, batch) in items.chunks(batch_size).enumerate() {
            for item in batch {
                if self.state.is_cancelled() {
                    break 'submit;
                }
                let worker = worker.clone();
                let semaphore = semaphore.clone();
                let item = item.clone();
                tasks.spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return None;
                    };
                    worker.process(&item).await
                });
            }
            if index + 1 < batch_count {
                self.pacer.pause(self.settings.batch_delay).await;
            }
        }

        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(job)) => tally(&mut summary, job.status()),
                Ok(None) => {}
                Err(err) => {
                    engine_error!("Item task panicked: {}", err);
                    summary.failed += 1;
                    // A panic always lands before the item recorded its completion.
                    self.state
                        .record_completion(|completed, total| self.sink.aggregate(completed, total));
                }
            }
        }

        if self.state.is_cancelled() {
            return Ok(self.cancelled());
        }

        engine_info!(
            "Run finished: {} ok, {} failed, {} skipped",
            summary.succeeded,
            summary.failed,
            summary.skipped
        );
        self.sink.log("All download tasks complete".to_string());
        self.sink.emit(EngineEvent::Finished(summary));
        Ok(RunStatus::Completed(summary))
    }

    fn cancelled(&self) -> RunStatus {
        engine_info!("Run cancelled");
        self.sink.log("Download cancelled".to_string());
        RunStatus::Cancelled
    }
}

fn tally(summary: &mut RunSummary, status: JobStatus) {
    match status {
        JobStatus::Succeeded => summary.succeeded += 1,
        JobStatus::SkippedExists => summary.skipped += 1,
        JobStatus::Cancelled => summary.cancelled += 1,
        JobStatus::Failed | JobStatus::Pending | JobStatus::InProgress => summary.failed += 1,
    }
}

/// Everything one item task needs, cloned into each task.
#[derive(Clone)]
struct ItemWorker {
    resolver: Arc<LinkResolver>,
    downloader: Arc<Downloader>,
    pacer: Arc<dyn Pacer>,
    sink: Arc<dyn EventSink>,
    state: Arc<BatchState>,
    destination: PathBuf,
    politeness_delay: Duration,
    max_attempts: u32,
}

impl ItemWorker {
    /// `None` when cancellation arrived before the item started.
    async fn process(&self, item_url: &str) -> Option<DownloadJob> {
        if self.state.is_cancelled() {
            return None;
        }
        let job = self.run_job(item_url).await;
        self.state
            .record_completion(|completed, total| self.sink.aggregate(completed, total));
        Some(job)
    }

    async fn run_job(&self, item_url: &str) -> DownloadJob {
        let page = self.resolver.open_item(item_url).await;
        let title = self.resolver.title(&page);
        let path = self.destination.join(archive_filename(&title));
        let mut job = DownloadJob::new(title, path);

        if job.destination().exists() {
            self.sink.log(format!("Skipping existing: {}", job.title()));
            settle(&mut job, DownloadJob::skip_existing);
            return job;
        }
        settle(&mut job, DownloadJob::start);

        self.pacer.pause(self.politeness_delay).await;
        let Some(url) = self.resolver.final_url(&page).await else {
            self.sink
                .log(format!("No download link found: {}", job.title()));
            settle(&mut job, DownloadJob::fail);
            return job;
        };
        job.set_source_url(url.clone());

        let partial = match PartialDownload::create(job.destination()) {
            Ok(partial) => partial,
            Err(err) => {
                self.sink
                    .log(format!("Download error: {} - {err}", job.title()));
                settle(&mut job, DownloadJob::fail);
                return job;
            }
        };
        let outcome = self
            .downloader
            .download(
                &url,
                partial.path(),
                job.title(),
                self.max_attempts,
                &self.state,
            )
            .await;
        job.record_attempts(outcome.attempts());
        match outcome {
            DownloadOutcome::Completed { .. } => match partial.commit() {
                Ok(_) => settle(&mut job, DownloadJob::succeed),
                Err(err) => {
                    self.sink
                        .log(format!("Download error: {} - {err}", job.title()));
                    settle(&mut job, DownloadJob::fail);
                }
            },
            DownloadOutcome::Failed { .. } => {
                partial.discard();
                settle(&mut job, DownloadJob::fail);
            }
            DownloadOutcome::Cancelled { .. } => {
                partial.discard();
                settle(&mut job, DownloadJob::cancel);
            }
        }
        job
    }
}

fn settle(job: &mut DownloadJob, step: fn(&mut DownloadJob) -> Result<(), TransitionError>) {
    if let Err(err) = step(job) {
        engine_warn!("Job {}: {}", job.title(), err);
    }
}
