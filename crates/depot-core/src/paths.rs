use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the depot home directory, or None if the user's home cannot be resolved.
pub fn try_depot_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("DEPOT_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".depot"))
}

/// Configuration file: <home>/depot.toml
pub fn config_file(home: &Path) -> PathBuf {
    home.join("depot.toml")
}

/// Artifact directory for a content hash: <cache>/<hex>
pub fn artifact_dir(cache: &Path, hex: &str) -> PathBuf {
    cache.join(hex)
}

/// Named scratch area root: <cache>/hosting
pub fn hosting_dir(cache: &Path) -> PathBuf {
    cache.join("hosting")
}
