use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use engine_logging::engine_warn;
use grabber_core::{EngineEvent, ProgressEvent, RunSummary};
use tokio::task::JoinHandle;

/// Minimum gap between two percent updates of the same download line.
pub const PROGRESS_THROTTLE: Duration = Duration::from_millis(500);

/// Renders engine events as timestamped console lines.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    throttle: Duration,
    last_update: HashMap<String, Instant>,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, throttle: Duration) -> Self {
        Self {
            out,
            throttle,
            last_update: HashMap::new(),
        }
    }

    pub fn render(&mut self, event: &EngineEvent) -> io::Result<()> {
        self.render_at(event, Instant::now())
    }

    fn render_at(&mut self, event: &EngineEvent, now: Instant) -> io::Result<()> {
        match event {
            EngineEvent::Progress(ProgressEvent::Log(text)) => self.line(text),
            EngineEvent::Progress(ProgressEvent::NamedProgress { id, text }) => {
                if is_percent_update(text) {
                    let recent = self
                        .last_update
                        .get(id)
                        .is_some_and(|last| now.duration_since(*last) < self.throttle);
                    if recent {
                        return Ok(());
                    }
                }
                self.last_update.insert(id.clone(), now);
                self.line(text)
            }
            EngineEvent::Progress(ProgressEvent::AggregateProgress { completed, total }) => {
                self.line(&format!("Progress: {}", format_aggregate(*completed, *total)))
            }
            EngineEvent::Finished(summary) => self.line(&format_summary(summary)),
            EngineEvent::Fatal(message) => self.line(&format!("Fatal: {message}")),
        }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        writeln!(self.out, "[{stamp}] {text}")?;
        self.out.flush()
    }

    fn into_inner(self) -> W {
        self.out
    }
}

/// `NN% (done/total)`; an empty batch counts as complete.
/// Renders `events` on the blocking pool until every sender has gone, then
/// hands back the writer.
pub fn spawn_renderer<W>(out: W, events: Receiver<EngineEvent>) -> JoinHandle<W>
where
    W: Write + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut console = ConsoleRenderer::new(out, PROGRESS_THROTTLE);
        for event in events {
            if let Err(err) = console.render(&event) {
                engine_warn!("Console output failed: {}", err);
                break;
            }
        }
        console.into_inner()
    })
}

pub fn format_aggregate(completed: usize, total: usize) -> String {
    let percent = if total == 0 {
        100
    } else {
        completed.saturating_mul(100) / total
    };
    format!("{percent}% ({completed}/{total})")
}

fn format_summary(summary: &RunSummary) -> String {
    format!(
        "Finished: {} downloaded, {} skipped, {} failed of {}",
        summary.succeeded, summary.skipped, summary.failed, summary.total
    )
}

fn is_percent_update(text: &str) -> bool {
    text.ends_with("%)")
}
