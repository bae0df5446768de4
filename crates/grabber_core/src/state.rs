use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Hard ceiling on simultaneous downloads, whatever the caller asks for.
pub const MAX_CONCURRENCY: usize = 3;

/// Clamp a requested worker count into `1..=MAX_CONCURRENCY`.
pub fn effective_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

/// State shared by every worker of one job.
///
/// `completed` only grows and `cancelled` only flips from false to true.
#[derive(Debug, Default)]
pub struct BatchState {
    total: AtomicUsize,
    completed: Mutex<usize>,
    cancelled: AtomicBool,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Release);
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count one finished item and hand `(completed, total)` to `report`
    /// while the counter is still held, so reports never go backwards.
    pub fn record_completion<F>(&self, report: F) -> usize
    where
        F: FnOnce(usize, usize),
    {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        report(*completed, self.total());
        *completed
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
