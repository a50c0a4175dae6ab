//! Startup reconciliation between the cache directory and the index.
//!
//! Cache files and index entries are written independently, so after a crash
//! the cache can hold half-written downloads or artifacts nobody indexes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::io::download::{TEMP_PREFIX, TEMP_SUFFIX};

/// What a reconciliation pass found and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Interrupted download files that were deleted.
    pub temp_files_removed: Vec<PathBuf>,
    /// Artifact directories whose hash is not in the index.
    pub orphaned: Vec<PathBuf>,
    /// Whether `orphaned` was deleted.
    pub pruned: bool,
}

fn is_hash_dir(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_temp_file(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Scan `cache_dir` against the set of indexed hex hashes.
///
/// Blocking; callers run it on the blocking pool.
pub(crate) fn scan(
    cache_dir: &Path,
    known: &HashSet<String>,
    prune: bool,
) -> std::io::Result<ReconcileReport> {
    let mut report = ReconcileReport {
        pruned: prune,
        ..Default::default()
    };
    if !cache_dir.is_dir() {
        return Ok(report);
    }

    for entry in WalkDir::new(cache_dir).min_depth(1).max_depth(2) {
        let entry = entry.map_err(std::io::Error::other)?;
        let name = entry.file_name().to_string_lossy();

        if entry.depth() == 1 && entry.file_type().is_dir() {
            if is_hash_dir(&name) && !known.contains(&*name) {
                report.orphaned.push(entry.path().to_path_buf());
            }
        } else if entry.depth() == 2 && entry.file_type().is_file() && is_temp_file(&name) {
            std::fs::remove_file(entry.path())?;
            tracing::debug!(path = %entry.path().display(), "removed interrupted download");
            report.temp_files_removed.push(entry.path().to_path_buf());
        }
    }

    if prune {
        for dir in &report.orphaned {
            std::fs::remove_dir_all(dir)?;
            tracing::info!(path = %dir.display(), "pruned unindexed artifact");
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ORPHAN: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn layout(root: &Path) {
        for dir in [KNOWN, ORPHAN, "hosting"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        std::fs::write(root.join(KNOWN).join("lib-1.0.jar"), b"ok").unwrap();
        std::fs::write(root.join(KNOWN).join(".download-x1.tmp"), b"half").unwrap();
        std::fs::write(root.join(ORPHAN).join("old-0.1.jar"), b"stale").unwrap();
    }

    #[test]
    fn reports_without_pruning() {
        let dir = tempfile::tempdir().unwrap();
        layout(dir.path());
        let known = HashSet::from([KNOWN.to_string()]);

        let report = scan(dir.path(), &known, false).unwrap();

        assert_eq!(report.orphaned, [dir.path().join(ORPHAN)]);
        assert_eq!(report.temp_files_removed.len(), 1);
        assert!(!report.pruned);
        assert!(dir.path().join(ORPHAN).exists());
        assert!(dir.path().join(KNOWN).join("lib-1.0.jar").exists());
        assert!(!dir.path().join(KNOWN).join(".download-x1.tmp").exists());
        assert!(dir.path().join("hosting").exists());
    }

    #[test]
    fn prune_removes_orphans() {
        let dir = tempfile::tempdir().unwrap();
        layout(dir.path());
        let known = HashSet::from([KNOWN.to_string()]);

        let report = scan(dir.path(), &known, true).unwrap();

        assert!(report.pruned);
        assert!(!dir.path().join(ORPHAN).exists());
        assert!(dir.path().join(KNOWN).exists());
    }

    #[test]
    fn missing_cache_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let report = scan(&dir.path().join("nope"), &HashSet::new(), true).unwrap();
        assert!(report.orphaned.is_empty());
        assert!(report.temp_files_removed.is_empty());
    }
}
