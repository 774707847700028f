use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A deferred request to stop the server.
///
/// Raised while a request is being answered, after a failure the server can not recover from.
/// The server checks it each time a connection finishes, so the response in flight is still
/// delivered before the listener goes away.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }
}
