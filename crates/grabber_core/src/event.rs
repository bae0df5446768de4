/// User-facing progress emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Append-only status line.
    Log(String),
    /// A logical line identified by `id` that sinks may update in place.
    NamedProgress { id: String, text: String },
    /// Whole-batch completion counter.
    AggregateProgress { completed: usize, total: usize },
}

/// Per-outcome tally of one finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(ProgressEvent),
    /// Every item was processed and the run was not cancelled.
    Finished(RunSummary),
    /// The run could not be set up; no per-item work happened after this.
    Fatal(String),
}

/// Fire-and-forget receiver of engine events.
///
/// Events from one task arrive in emission order; events from concurrent
/// workers may interleave.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);

    fn log(&self, text: String) {
        self.emit(EngineEvent::Progress(ProgressEvent::Log(text)));
    }

    fn named_progress(&self, id: &str, text: String) {
        self.emit(EngineEvent::Progress(ProgressEvent::NamedProgress {
            id: id.to_string(),
            text,
        }));
    }

    fn aggregate(&self, completed: usize, total: usize) {
        self.emit(EngineEvent::Progress(ProgressEvent::AggregateProgress {
            completed,
            total,
        }));
    }
}
