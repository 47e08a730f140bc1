//! Sync progress output: indicatif bars on a terminal, tracing events otherwise.

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use vidsync::sync::{ProgressCallback, SyncProgress};

use interactive::InteractiveReporter;
use logging::LoggingReporter;

/// Anything that can render engine progress events.
pub trait ProgressSink: Send + Sync {
    fn handle(&self, event: SyncProgress);

    /// Called once after the run returns, whatever its outcome.
    fn finish(&self) {}
}

/// Shared handle to the sink chosen for the current terminal.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::with_sink(InteractiveReporter::new())
        } else {
            Self::with_sink(LoggingReporter)
        }
    }

    pub fn with_sink(sink: impl ProgressSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn as_callback(&self) -> ProgressCallback {
        let sink = Arc::clone(&self.sink);
        Box::new(move |event| sink.handle(event))
    }

    pub fn finish(&self) {
        self.sink.finish();
    }
}
