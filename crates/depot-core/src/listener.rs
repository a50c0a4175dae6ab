//! Per-request download listeners
//!
//! A caller that passes listeners to `get_resource` gets the fetch in the
//! background and learns the outcome through these callbacks instead of the
//! return value.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

/// Receives the outcome of one `get_resource` request.
pub trait DownloadListener: Send + Sync {
    /// The artifact is available at `file`.
    fn success(&self, file: &Path) -> anyhow::Result<()>;

    /// The artifact could not be fetched to `file`.
    fn failure(&self, file: &Path, reason: &str) -> anyhow::Result<()>;
}

impl<T: DownloadListener + ?Sized> DownloadListener for Arc<T> {
    fn success(&self, file: &Path) -> anyhow::Result<()> {
        (**self).success(file)
    }
    fn failure(&self, file: &Path, reason: &str) -> anyhow::Result<()> {
        (**self).failure(file, reason)
    }
}

/// A listener that ignores every outcome.
///
/// Passing one forces the background path without caring about the result
/// (e.g. prefetching).
#[derive(Debug, Clone, Copy)]
pub struct NullListener;

impl DownloadListener for NullListener {
    fn success(&self, _: &Path) -> anyhow::Result<()> {
        Ok(())
    }
    fn failure(&self, _: &Path, _: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Hands the outcome of a joined download to a task waiting on `get_resource`.
pub(crate) struct Completion(Mutex<Option<oneshot::Sender<Result<(), String>>>>);

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Result<(), String>>) {
        let (tx, rx) = oneshot::channel();
        (Self(Mutex::new(Some(tx))), rx)
    }

    fn complete(&self, outcome: Result<(), String>) {
        let sender = self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = sender {
            // The waiter may have been cancelled
            let _ = tx.send(outcome);
        }
    }
}

impl DownloadListener for Completion {
    fn success(&self, _: &Path) -> anyhow::Result<()> {
        self.complete(Ok(()));
        Ok(())
    }
    fn failure(&self, _: &Path, reason: &str) -> anyhow::Result<()> {
        self.complete(Err(reason.to_string()));
        Ok(())
    }
}

/// Shared handle to a listener, as queued on a download job.
pub type SharedListener = Arc<dyn DownloadListener>;

/// Report success to every listener. A listener error is logged and does not
/// stop delivery to the rest.
pub(crate) fn notify_success(listeners: &[SharedListener], file: &Path) {
    for listener in listeners {
        if let Err(e) = listener.success(file) {
            tracing::warn!(file = %file.display(), error = %e, "download listener failed on success");
        }
    }
}

/// Report failure to every listener, isolating listener errors.
pub(crate) fn notify_failure(listeners: &[SharedListener], file: &Path, reason: &str) {
    for listener in listeners {
        if let Err(e) = listener.failure(file, reason) {
            tracing::warn!(file = %file.display(), error = %e, "download listener failed on failure");
        }
    }
}
