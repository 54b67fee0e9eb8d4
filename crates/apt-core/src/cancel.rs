use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared cooperative-cancellation flag, cloned cheaply and polled by
/// every long-running inner loop (fusion, whitelisting, ranking-flatten)
/// and by the pipeline controller between stages.
///
/// Modeled as a token rather than by interrupting a thread: a query that
/// observes cancellation mid-stage simply stops and reports `None`: earlier,
/// fully-completed stages remain valid in the cache.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
