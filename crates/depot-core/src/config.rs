//! Repository configuration.
//!
//! Resolution order: explicit builder values, then `DEPOT_*` environment
//! variables, then `<home>/depot.toml`, then defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::RepositoryError;

/// Default bound on concurrent background downloads.
pub const DEFAULT_MAX_DOWNLOADS: usize = 5;

/// Default number of attempts per fetch.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default circuit-breaker window after a failed fetch.
pub const DEFAULT_BACKOFF_WINDOW: Duration = Duration::from_secs(4 * 3600);

/// Settings for a [`crate::ResourceRepository`].
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Root of the content-addressed cache.
    pub cache_dir: PathBuf,
    /// Location of the index file.
    pub index_file: PathBuf,
    /// Permits on the background download gate.
    pub max_concurrent_downloads: usize,
    /// Attempts per fetch, including the first.
    pub retry_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
    /// How long a failed source URL is left alone.
    pub backoff_window: Duration,
}

impl RepositoryConfig {
    /// Defaults rooted at `home`: `<home>/cache` and `<home>/index.json`.
    pub fn new(home: &Path) -> Self {
        Self {
            cache_dir: home.join("cache"),
            index_file: home.join("index.json"),
            max_concurrent_downloads: DEFAULT_MAX_DOWNLOADS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            backoff_window: DEFAULT_BACKOFF_WINDOW,
        }
    }

    /// Defaults for `home`, overlaid with `<home>/depot.toml` if present and
    /// then with the environment.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] if the file or a variable is malformed.
    pub fn load(home: &Path) -> Result<Self, RepositoryError> {
        let mut config = Self::new(home);

        let file = crate::paths::config_file(home);
        match std::fs::read_to_string(&file) {
            Ok(text) => {
                let overrides: ConfigFile = toml::from_str(&text)
                    .map_err(|e| RepositoryError::Config(format!("{}: {e}", file.display())))?;
                config.apply_file(home, overrides);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults for the resolved depot home, overlaid with the environment.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] if no home directory can be found
    /// or a variable is malformed.
    pub fn from_env() -> Result<Self, RepositoryError> {
        let home = crate::paths::try_depot_home().ok_or_else(|| {
            RepositoryError::Config("Could not determine home directory. Set DEPOT_HOME.".into())
        })?;
        Self::load(&home)
    }

    fn apply_file(&mut self, home: &Path, file: ConfigFile) {
        if let Some(dir) = file.cache_dir {
            self.cache_dir = home.join(dir);
        }
        if let Some(index) = file.index_file {
            self.index_file = home.join(index);
        }
        if let Some(n) = file.max_concurrent_downloads {
            self.max_concurrent_downloads = n;
        }
        if let Some(n) = file.retry_attempts {
            self.retry_attempts = n;
        }
        if let Some(secs) = file.retry_delay_secs {
            self.retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = file.backoff_secs {
            self.backoff_window = Duration::from_secs(secs);
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), RepositoryError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RepositoryError> {
            value
                .trim()
                .parse()
                .map_err(|_| RepositoryError::Config(format!("{key}: invalid value '{value}'")))
        }

        if let Some(v) = var("DEPOT_MAX_DOWNLOADS") {
            self.max_concurrent_downloads = parse("DEPOT_MAX_DOWNLOADS", &v)?;
        }
        if let Some(v) = var("DEPOT_RETRY_ATTEMPTS") {
            self.retry_attempts = parse("DEPOT_RETRY_ATTEMPTS", &v)?;
        }
        if let Some(v) = var("DEPOT_RETRY_DELAY_SECS") {
            self.retry_delay = Duration::from_secs(parse("DEPOT_RETRY_DELAY_SECS", &v)?);
        }
        if let Some(v) = var("DEPOT_BACKOFF_SECS") {
            self.backoff_window = Duration::from_secs(parse("DEPOT_BACKOFF_SECS", &v)?);
        }
        Ok(())
    }

    /// Reject settings the coordinator cannot run with.
    pub(crate) fn validate(&self) -> Result<(), RepositoryError> {
        if self.max_concurrent_downloads == 0 {
            return Err(RepositoryError::Config(
                "max_concurrent_downloads must be at least 1".into(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(RepositoryError::Config(
                "retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// On-disk form of `depot.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    cache_dir: Option<PathBuf>,
    index_file: Option<PathBuf>,
    max_concurrent_downloads: Option<usize>,
    retry_attempts: Option<u32>,
    retry_delay_secs: Option<u64>,
    backoff_secs: Option<u64>,
}
