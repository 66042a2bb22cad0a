use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag handed to each install. Clones share the
/// flag, so giving one token to several installs cancels all of them at once.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Receives whole-pipeline progress in `[0, 1]`. Returning `false` asks the
/// install to stop.
pub trait ProgressReporter {
    fn report(&mut self, fraction: f64) -> bool;
}

impl<F> ProgressReporter for F
where
    F: FnMut(f64) -> bool,
{
    fn report(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _fraction: f64) -> bool {
        true
    }
}
