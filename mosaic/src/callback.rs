//! Progress and result reporting for long-running operations.
//!
//! Indexing a directory and running a preload cycle both touch many files.
//! Rather than aborting on the first bad file, they report each failure
//! through [`RequestCallback::on_request_error`] and let the callback decide
//! whether to keep going.

use tracing::{debug, info, warn};

use crate::error::MosaicError;

/// Receiver for progress and errors of a multi-task request.
///
/// Every method has a no-op default so implementors override only what they
/// need.
pub trait RequestCallback {
    fn on_request_started(&mut self) {}

    /// Progress of task `task_index` of `task_count`, plus the overall total.
    fn on_request_progress(
        &mut self,
        _task_index: usize,
        _task_count: usize,
        _task_progress: u64,
        _task_max: u64,
        _total_progress: u64,
        _total_max: u64,
    ) {
    }

    fn on_request_complete(&mut self) {}

    /// A task failed. `fatal` is `true` when retrying cannot help.
    ///
    /// Return `true` to continue with the remaining tasks.
    fn on_request_error(&mut self, _cause: &MosaicError, _message: &str, _fatal: bool) -> bool {
        true
    }

    fn on_request_canceled(&mut self) {}
}

/// Callback that ignores everything and always continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCallback;

impl RequestCallback for NullCallback {}

/// Callback that forwards every event to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct LoggingCallback {
    /// Label attached to every event.
    pub request: String,
    /// Number of errors seen so far.
    pub errors: usize,
}

impl LoggingCallback {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            errors: 0,
        }
    }
}

impl RequestCallback for LoggingCallback {
    fn on_request_started(&mut self) {
        info!(request = %self.request, "Request started");
    }

    fn on_request_progress(
        &mut self,
        task_index: usize,
        task_count: usize,
        _task_progress: u64,
        _task_max: u64,
        total_progress: u64,
        total_max: u64,
    ) {
        debug!(
            request = %self.request,
            task = task_index,
            tasks = task_count,
            progress = total_progress,
            max = total_max,
            "Request progress"
        );
    }

    fn on_request_complete(&mut self) {
        info!(request = %self.request, errors = self.errors, "Request complete");
    }

    fn on_request_error(&mut self, cause: &MosaicError, message: &str, fatal: bool) -> bool {
        self.errors += 1;
        warn!(request = %self.request, error = %cause, fatal, "{}", message);
        true
    }

    fn on_request_canceled(&mut self) {
        warn!(request = %self.request, "Request canceled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_continue() {
        let mut cb = NullCallback;
        cb.on_request_started();
        cb.on_request_progress(0, 1, 1, 1, 1, 1);
        assert!(cb.on_request_error(&MosaicError::CursorClosed, "closed", true));
        cb.on_request_complete();
    }

    #[test]
    fn test_logging_callback_counts_errors() {
        let mut cb = LoggingCallback::new("index");
        assert!(cb.on_request_error(&MosaicError::CursorClosed, "first", true));
        assert!(cb.on_request_error(&MosaicError::DatabaseClosed, "second", false));
        assert_eq!(cb.errors, 2);
    }
}
