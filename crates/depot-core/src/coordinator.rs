//! Download coordination
//!
//! Tracks one in-flight job per destination path, gates background
//! downloads behind a semaphore, and remembers which source URLs failed
//! recently so they are not hammered again inside the backoff window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use depot_schema::ResourceDescriptor;
use futures::FutureExt;
use tokio::sync::{Semaphore, oneshot};

use crate::config::RepositoryConfig;
use crate::error::{FetchError, RepositoryError};
use crate::events::{EventBus, EventKind};
use crate::executor::Executor;
use crate::io::download::download_and_verify;
use crate::io::transport::Transport;
use crate::listener::{Completion, SharedListener, notify_failure, notify_success};

enum Join {
    Queued,
    Ready(Vec<SharedListener>),
    Launch,
}

enum Wait {
    Done,
    Queued(oneshot::Receiver<Result<(), String>>),
    Run,
}

/// Releases a path registered by an inline fetch if its task is dropped
/// before the download finishes.
struct InlineJob<'a> {
    coordinator: &'a DownloadCoordinator,
    dest: &'a Path,
    finished: bool,
}

impl Drop for InlineJob<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let queued = self.coordinator.take_job(self.dest);
            notify_failure(&queued, self.dest, "download cancelled");
        }
    }
}

/// Deduplicates, gates and retries artifact downloads.
pub struct DownloadCoordinator {
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    retry_attempts: u32,
    retry_delay: Duration,
    backoff_window: Duration,
    /// Source URL -> instant its last fetch gave up.
    failures: Mutex<HashMap<String, Instant>>,
    /// Destination path -> listeners waiting on the in-flight fetch.
    jobs: Mutex<HashMap<PathBuf, Vec<SharedListener>>>,
    gate: Arc<Semaphore>,
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("backoff_window", &self.backoff_window)
            .field("available_permits", &self.gate.available_permits())
            .finish_non_exhaustive()
    }
}

impl DownloadCoordinator {
    /// Coordinator with retry, backoff and concurrency taken from `config`.
    pub fn new(
        transport: Arc<dyn Transport>,
        events: Arc<EventBus>,
        config: &RepositoryConfig,
    ) -> Self {
        Self {
            transport,
            events,
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay,
            backoff_window: config.backoff_window,
            failures: Mutex::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
            gate: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
        }
    }

    /// Whether `url` failed within the backoff window.
    pub fn is_suppressed(&self, url: &str) -> bool {
        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures
            .get(url)
            .is_some_and(|at| at.elapsed() < self.backoff_window)
    }

    /// Number of destination paths with a fetch in flight.
    pub fn in_flight(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn record_failure(&self, url: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), Instant::now());
    }

    fn clear_failure(&self, url: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url);
    }

    fn take_job(&self, dest: &Path) -> Vec<SharedListener> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(dest)
            .unwrap_or_default()
    }

    /// Run the attempt loop for `rd` into `dest` on the current task.
    ///
    /// Emits `StartDownload`, then `EndDownload` on success or `Error`
    /// followed by `EndDownload` on failure.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's fault once attempts are exhausted, or the
    /// first [`FetchError::NotFound`].
    async fn fetch(&self, rd: &ResourceDescriptor, dest: &Path) -> Result<(), FetchError> {
        self.events.emit(EventKind::StartDownload, rd, None);
        tracing::info!(resource = %rd, url = %rd.url, "downloading");

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            match download_and_verify(self.transport.as_ref(), &rd.url, dest, &rd.id).await {
                Ok(size) => break Ok(size),
                Err(e) if !e.is_retryable() || attempt >= self.retry_attempts => break Err(e),
                Err(e) => {
                    tracing::warn!(
                        resource = %rd,
                        attempt,
                        of = self.retry_attempts,
                        error = %e,
                        "download attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        };

        match outcome {
            Ok(size) => {
                self.clear_failure(&rd.url);
                tracing::info!(resource = %rd, size, path = %dest.display(), "downloaded");
                self.events.emit(EventKind::EndDownload, rd, None);
                Ok(())
            }
            Err(e) => {
                self.record_failure(&rd.url);
                tracing::warn!(resource = %rd, attempts = attempt, error = %e, "download failed");
                self.events.emit(EventKind::Error, rd, Some(&e));
                self.events.emit(EventKind::EndDownload, rd, Some(&e));
                Err(e)
            }
        }
    }

    /// Fetch `rd` into `dest` and wait for the outcome.
    ///
    /// Waits on the job already running for `dest` if there is one, without
    /// starting a second transport fetch. Otherwise registers `dest` and
    /// runs the attempt loop on the current task, so requests arriving
    /// meanwhile queue behind it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Fetch`] when this call ran the download and
    /// it failed, or [`RepositoryError::Joined`] when the joined job failed.
    pub async fn fetch_and_wait(
        &self,
        rd: &ResourceDescriptor,
        dest: &Path,
    ) -> Result<(), RepositoryError> {
        let waiter = {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(queued) = jobs.get_mut(dest) {
                tracing::debug!(resource = %rd, waiting = queued.len(), "waiting on in-flight download");
                let (completion, rx) = Completion::channel();
                queued.push(Arc::new(completion));
                Wait::Queued(rx)
            } else if dest.is_file() {
                Wait::Done
            } else {
                jobs.insert(dest.to_path_buf(), Vec::new());
                Wait::Run
            }
        };

        match waiter {
            Wait::Done => Ok(()),
            Wait::Run => self.run_registered(rd, dest).await,
            Wait::Queued(rx) => match rx.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(RepositoryError::Joined(reason)),
                Err(_) => Err(RepositoryError::Joined("download abandoned".to_string())),
            },
        }
    }

    async fn run_registered(&self, rd: &ResourceDescriptor, dest: &Path) -> Result<(), RepositoryError> {
        let mut job = InlineJob {
            coordinator: self,
            dest,
            finished: false,
        };
        let outcome = self.fetch(rd, dest).await;
        job.finished = true;

        let queued = self.take_job(dest);
        match &outcome {
            Ok(()) => notify_success(&queued, dest),
            Err(e) => notify_failure(&queued, dest, &e.to_string()),
        }
        outcome.map_err(Into::into)
    }

    /// Fetch `rd` into `dest` on `executor`, reporting to `listeners`.
    ///
    /// Joins an existing job for `dest` if there is one. Otherwise waits for
    /// a download permit and hands the attempt loop to the executor. Every
    /// listener is notified exactly once, after the outcome is known.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Executor`] if the download gate is closed;
    /// the queued listeners are told about the failure first.
    pub async fn fetch_in_background(
        self: &Arc<Self>,
        executor: &dyn Executor,
        rd: ResourceDescriptor,
        dest: PathBuf,
        listeners: Vec<SharedListener>,
    ) -> Result<(), RepositoryError> {
        let join = {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(queued) = jobs.get_mut(&dest) {
                tracing::debug!(resource = %rd, waiting = queued.len(), "joining in-flight download");
                queued.extend(listeners);
                Join::Queued
            } else if dest.is_file() {
                // The previous job finished between the caller's cache check and here
                Join::Ready(listeners)
            } else {
                jobs.insert(dest.clone(), listeners);
                Join::Launch
            }
        };

        match join {
            Join::Queued => return Ok(()),
            Join::Ready(listeners) => {
                notify_success(&listeners, &dest);
                return Ok(());
            }
            Join::Launch => {}
        }

        let permit = match Arc::clone(&self.gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                let queued = self.take_job(&dest);
                notify_failure(&queued, &dest, &e.to_string());
                return Err(RepositoryError::Executor(e.to_string()));
            }
        };

        let this = Arc::clone(self);
        executor.execute(
            async move {
                let outcome = this.fetch(&rd, &dest).await;
                let queued = this.take_job(&dest);
                drop(permit);
                match outcome {
                    Ok(()) => notify_success(&queued, &dest),
                    Err(e) => notify_failure(&queued, &dest, &e.to_string()),
                }
            }
            .boxed(),
        );
        Ok(())
    }
}
