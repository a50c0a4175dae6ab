//! Repository core
//!
//! The only type callers talk to. Owns the index, the download coordinator
//! and the event bus, and implements fetch-on-demand over the
//! content-addressed cache.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use depot_schema::descriptor::is_file_name_part;
use depot_schema::{ContentHash, ResourceDescriptor, VersionRange};

use crate::config::RepositoryConfig;
use crate::coordinator::DownloadCoordinator;
use crate::error::RepositoryError;
use crate::events::{EventBus, EventKind, RepositoryListener};
use crate::executor::Executor;
use crate::io::transport::Transport;
use crate::listener::{SharedListener, notify_success};
use crate::paths::{artifact_dir, hosting_dir};
use crate::reconcile::{self, ReconcileReport};
use crate::store::IndexStore;

/// Content-addressed artifact repository with fetch-on-demand caching.
pub struct ResourceRepository {
    config: RepositoryConfig,
    store: IndexStore,
    events: Arc<EventBus>,
    coordinator: Arc<DownloadCoordinator>,
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for ResourceRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRepository")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResourceRepository`]. Explicit settings win over `config`.
pub struct RepositoryBuilder {
    config: RepositoryConfig,
    transport: Option<Arc<dyn Transport>>,
    executor: Option<Arc<dyn Executor>>,
}

impl RepositoryBuilder {
    /// Source of artifact bytes. Defaults to HTTP.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Where background downloads run. Defaults to the current runtime.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Background downloads allowed to run at once.
    pub fn max_concurrent_downloads(mut self, n: usize) -> Self {
        self.config.max_concurrent_downloads = n;
        self
    }

    /// Attempts per download before giving up.
    pub fn retry_attempts(mut self, n: u32) -> Self {
        self.config.retry_attempts = n;
        self
    }

    /// Pause between attempts.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// How long a failed source is left alone.
    pub fn backoff_window(mut self, window: Duration) -> Self {
        self.config.backoff_window = window;
        self
    }

    /// Assemble the repository.
    ///
    /// Without an explicit executor the current tokio runtime is used.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] for unusable settings and
    /// [`RepositoryError::Executor`] if no executor was given and no runtime
    /// is running.
    pub fn build(self) -> Result<ResourceRepository, RepositoryError> {
        self.config.validate()?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(
                tokio::runtime::Handle::try_current()
                    .map_err(|e| RepositoryError::Executor(e.to_string()))?,
            ),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        let events = Arc::new(EventBus::new());
        let coordinator = Arc::new(DownloadCoordinator::new(
            transport,
            Arc::clone(&events),
            &self.config,
        ));

        Ok(ResourceRepository {
            store: IndexStore::new(&self.config.index_file),
            config: self.config,
            events,
            coordinator,
            executor,
        })
    }
}

#[cfg(feature = "network")]
fn default_transport() -> Result<Arc<dyn Transport>, RepositoryError> {
    let transport = crate::io::transport::HttpTransport::new()?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "network"))]
fn default_transport() -> Result<Arc<dyn Transport>, RepositoryError> {
    Ok(Arc::new(crate::io::transport::LocalTransport))
}

impl ResourceRepository {
    /// Start configuring a repository.
    pub fn builder(config: RepositoryConfig) -> RepositoryBuilder {
        RepositoryBuilder {
            config,
            transport: None,
            executor: None,
        }
    }

    /// Repository with the default transport on the current runtime.
    pub fn new(config: RepositoryConfig) -> Result<Self, RepositoryError> {
        Self::builder(config).build()
    }

    /// Effective settings.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Subscribe to repository events.
    pub fn add_listener(&self, listener: Arc<dyn RepositoryListener>) {
        self.events.add_listener(listener);
    }

    /// Unsubscribe `listener`; returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn RepositoryListener>) -> bool {
        self.events.remove_listener(listener)
    }

    /// Where the artifact for `rd` lives (or will live) in the cache.
    pub fn cache_path(&self, rd: &ResourceDescriptor) -> PathBuf {
        artifact_dir(&self.config.cache_dir, &rd.id.to_hex()).join(rd.file_name())
    }

    /// Descriptors vouched for by `repo`, or all of them.
    ///
    /// `expr` is reserved and currently ignored.
    pub async fn filter(
        &self,
        repo: Option<&str>,
        expr: Option<&str>,
    ) -> Result<Vec<ResourceDescriptor>, RepositoryError> {
        if let Some(expr) = expr {
            tracing::debug!(expr, "filter expression ignored");
        }
        let guard = self.store.lock().await?;
        Ok(guard
            .index()
            .descriptors
            .iter()
            .filter(|rd| repo.is_none_or(|r| rd.is_owned_by(r)))
            .cloned()
            .collect())
    }

    /// The descriptor for `id`, if indexed.
    pub async fn get_descriptor(
        &self,
        id: &ContentHash,
    ) -> Result<Option<ResourceDescriptor>, RepositoryError> {
        let guard = self.store.lock().await?;
        Ok(guard.index().get(id).cloned())
    }

    /// Record that `repo` vouches for `rd`.
    ///
    /// An existing descriptor with the same hash gains `repo`; otherwise `rd`
    /// is inserted owned by `repo` alone. The index is written before `Add`
    /// is emitted. A name or version that is not a plain file name fragment
    /// is rejected with [`RepositoryError::InvalidName`].
    pub async fn add(&self, repo: &str, rd: ResourceDescriptor) -> Result<(), RepositoryError> {
        if !rd.has_safe_file_name() {
            return Err(RepositoryError::InvalidName(rd.to_string()));
        }
        let stored = {
            let mut guard = self.store.lock().await?;
            let index = guard.index_mut();
            let stored = match index.position(&rd.id) {
                Some(pos) => {
                    let existing = &mut index.descriptors[pos];
                    existing.repositories.insert(repo.to_string());
                    existing.clone()
                }
                None => {
                    let mut rd = rd;
                    rd.repositories = BTreeSet::from([repo.to_string()]);
                    index.descriptors.push(rd.clone());
                    rd
                }
            };
            guard.save().await?;
            stored
        };

        tracing::debug!(resource = %stored, repo, "added");
        self.events.emit(EventKind::Add, &stored, None);
        Ok(())
    }

    /// Withdraw `repo`'s claim on `id`, or remove it outright when `repo` is
    /// `None`. Returns whether anything changed.
    pub async fn delete(
        &self,
        repo: Option<&str>,
        id: &ContentHash,
    ) -> Result<bool, RepositoryError> {
        let removed = {
            let mut guard = self.store.lock().await?;
            let Some(pos) = guard.index().position(id) else {
                return Ok(false);
            };

            let removed = match repo {
                None => Some(guard.index_mut().descriptors.remove(pos)),
                Some(repo) => {
                    if !guard.index().descriptors[pos].is_owned_by(repo) {
                        return Ok(false);
                    }
                    let index = guard.index_mut();
                    let rd = &mut index.descriptors[pos];
                    rd.repositories.remove(repo);
                    if rd.repositories.is_empty() {
                        Some(index.descriptors.remove(pos))
                    } else {
                        None
                    }
                }
            };
            guard.save().await?;
            removed
        };

        if let Some(rd) = removed {
            tracing::debug!(resource = %rd, "removed");
            self.events.emit(EventKind::Remove, &rd, None);
        }
        Ok(true)
    }

    /// Drop the cached bytes for `id`. The index is left alone.
    pub async fn delete_cache(&self, id: &ContentHash) -> Result<bool, RepositoryError> {
        let dir = artifact_dir(&self.config.cache_dir, &id.to_hex());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "cache cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Descriptors called `name`, optionally within `range` and owned by
    /// `repo`, ascending by version.
    pub async fn find(
        &self,
        repo: Option<&str>,
        name: &str,
        range: Option<&VersionRange>,
    ) -> Result<Vec<ResourceDescriptor>, RepositoryError> {
        let guard = self.store.lock().await?;
        let mut found: Vec<ResourceDescriptor> = guard
            .index()
            .descriptors
            .iter()
            .filter(|rd| rd.name == name)
            .filter(|rd| repo.is_none_or(|r| rd.is_owned_by(r)))
            .filter(|rd| range.is_none_or(|r| r.matches(&rd.version)))
            .cloned()
            .collect();
        found.sort_by(ResourceDescriptor::index_order);
        Ok(found)
    }

    /// Scratch directory `<cache>/hosting/<name>`, created on demand.
    pub async fn get_cache_dir(&self, name: &str) -> Result<PathBuf, RepositoryError> {
        if name.is_empty()
            || name == "."
            || !is_file_name_part(name)
            || Path::new(name).is_absolute()
        {
            return Err(RepositoryError::InvalidName(name.to_string()));
        }
        let dir = hosting_dir(&self.config.cache_dir).join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Write the index if it has unsaved changes.
    pub async fn save(&self) -> Result<bool, RepositoryError> {
        self.store.lock().await?.save().await
    }

    /// Path to the artifact for `id`, fetching it if necessary.
    ///
    /// - Unknown `id`: `Ok(None)`.
    /// - Cached: the path, after telling `listeners` about it.
    /// - Source failed within the backoff window: `Ok(None)`.
    /// - No listeners: downloads on this task (or waits on the download
    ///   already running for the same file) and returns the path, or the
    ///   fault as `Err`.
    /// - With listeners: downloads in the background (or joins the download
    ///   already running for the same file) and returns the path right away.
    ///   The file exists only once a listener has been told so.
    pub async fn get_resource(
        &self,
        id: &ContentHash,
        listeners: Vec<SharedListener>,
    ) -> Result<Option<PathBuf>, RepositoryError> {
        let Some(rd) = self.get_descriptor(id).await? else {
            return Ok(None);
        };
        let path = self.cache_path(&rd);

        if path.is_file() {
            tracing::debug!(resource = %rd, "cache hit");
            notify_success(&listeners, &path);
            return Ok(Some(path));
        }

        if self.coordinator.is_suppressed(&rd.url) {
            tracing::warn!(resource = %rd, url = %rd.url, "source failed recently, not retrying yet");
            return Ok(None);
        }

        if listeners.is_empty() {
            self.coordinator.fetch_and_wait(&rd, &path).await?;
            return Ok(Some(path));
        }

        self.coordinator
            .fetch_in_background(self.executor.as_ref(), rd, path.clone(), listeners)
            .await?;
        Ok(Some(path))
    }

    /// Clean up after an unclean shutdown.
    ///
    /// Deletes interrupted download files and reports artifact directories
    /// no descriptor points at; `prune` deletes those too. Run it before
    /// starting downloads.
    pub async fn reconcile(&self, prune: bool) -> Result<ReconcileReport, RepositoryError> {
        let known: HashSet<String> = {
            let guard = self.store.lock().await?;
            guard
                .index()
                .descriptors
                .iter()
                .map(|rd| rd.id.to_hex())
                .collect()
        };
        let cache_dir = self.config.cache_dir.clone();
        let report = tokio::task::spawn_blocking(move || reconcile::scan(&cache_dir, &known, prune))
            .await
            .map_err(std::io::Error::other)??;

        if !report.temp_files_removed.is_empty() || !report.orphaned.is_empty() {
            tracing::info!(
                temp_files = report.temp_files_removed.len(),
                orphaned = report.orphaned.len(),
                pruned = report.pruned,
                "cache reconciled"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::transport::LocalTransport;

    async fn repo(dir: &Path) -> ResourceRepository {
        ResourceRepository::builder(RepositoryConfig::new(dir))
            .transport(Arc::new(LocalTransport))
            .build()
            .unwrap()
    }

    fn rd(name: &str, version: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(
            ContentHash::of_bytes(format!("{name}@{version}").as_bytes()),
            name,
            version,
            format!("file:///nowhere/{name}-{version}.jar"),
        )
    }

    #[tokio::test]
    async fn delete_of_unknown_or_unowned_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(dir.path()).await;
        let d = rd("lib", "1.0");

        assert!(!repo.delete(None, &d.id).await.unwrap());
        repo.add("central", d.clone()).await.unwrap();
        assert!(!repo.delete(Some("other"), &d.id).await.unwrap());
        assert!(repo.get_descriptor(&d.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn add_ignores_incoming_membership() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(dir.path()).await;
        let mut d = rd("lib", "1.0");
        d.repositories.insert("smuggled".into());

        repo.add("central", d.clone()).await.unwrap();

        let stored = repo.get_descriptor(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.repositories, BTreeSet::from(["central".to_string()]));
    }

    #[tokio::test]
    async fn add_rejects_names_that_escape_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(dir.path()).await;

        for (name, version) in [("../../escaped", "1.0"), ("lib", "../1.0"), ("a/b", "1.0")] {
            let d = rd(name, version);
            assert!(
                matches!(repo.add("central", d.clone()).await, Err(RepositoryError::InvalidName(_))),
                "{name} {version} accepted"
            );
            assert!(repo.get_descriptor(&d.id).await.unwrap().is_none());
        }
        assert!(!dir.path().join("index.json").exists());
    }

    #[tokio::test]
    async fn hosting_names_are_single_components() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(dir.path()).await;

        let scratch = repo.get_cache_dir("mirror").await.unwrap();
        assert_eq!(scratch, dir.path().join("cache").join("hosting").join("mirror"));
        assert!(scratch.is_dir());

        for bad in ["", "..", "a/b", "..hidden", "a\\b", "/abs"] {
            assert!(
                matches!(repo.get_cache_dir(bad).await, Err(RepositoryError::InvalidName(_))),
                "{bad} accepted"
            );
        }
    }

    #[tokio::test]
    async fn filter_by_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(dir.path()).await;
        repo.add("a", rd("one", "1.0")).await.unwrap();
        repo.add("b", rd("two", "1.0")).await.unwrap();

        assert_eq!(repo.filter(None, None).await.unwrap().len(), 2);
        let only_a = repo.filter(Some("a"), Some("(name=*)")).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].name, "one");
    }

    #[test]
    fn build_without_runtime_needs_executor() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResourceRepository::builder(RepositoryConfig::new(dir.path()))
            .transport(Arc::new(LocalTransport))
            .build()
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Executor(_)));
    }
}
