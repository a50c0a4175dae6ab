//! Persistent index
//!
//! Loaded on first access, held in memory behind an async mutex, and written
//! back only when a mutation raised the dirty flag. Writes go to a temp file
//! in the index's directory and are renamed over the old file.

use std::io::Write;
use std::path::{Path, PathBuf};

use depot_schema::IndexFile;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::RepositoryError;

/// The parsed index plus whether it has unsaved changes.
#[derive(Debug, Default)]
pub struct LoadedIndex {
    index: IndexFile,
    dirty: bool,
}

/// Lazily loaded, lock-guarded index file.
#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    state: Mutex<Option<LoadedIndex>>,
}

impl IndexStore {
    /// Store backed by `path`. Nothing is read until the first lock.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock the index, loading it from disk on first use.
    ///
    /// Mutation and persistence happen under the same guard.
    pub async fn lock(&self) -> Result<IndexGuard<'_>, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.is_none() {
            let index = load(&self.path).await?;
            tracing::debug!(
                path = %self.path.display(),
                descriptors = index.descriptors.len(),
                "index loaded"
            );
            *state = Some(LoadedIndex {
                index,
                dirty: false,
            });
        }
        let loaded = MutexGuard::map(state, |s| s.get_or_insert_with(LoadedIndex::default));
        Ok(IndexGuard {
            path: &self.path,
            loaded,
        })
    }
}

/// Exclusive access to the loaded index.
pub struct IndexGuard<'a> {
    path: &'a Path,
    loaded: MappedMutexGuard<'a, LoadedIndex>,
}

impl IndexGuard<'_> {
    pub fn index(&self) -> &IndexFile {
        &self.loaded.index
    }

    /// Mutable access. Raises the dirty flag.
    pub fn index_mut(&mut self) -> &mut IndexFile {
        self.loaded.dirty = true;
        &mut self.loaded.index
    }

    pub fn is_dirty(&self) -> bool {
        self.loaded.dirty
    }

    /// Write the index if it changed since the last successful write.
    ///
    /// Returns whether a write happened. The flag is only cleared once the
    /// rename has succeeded.
    pub async fn save(&mut self) -> Result<bool, RepositoryError> {
        if !self.loaded.dirty {
            return Ok(false);
        }
        let text = self.loaded.index.render()?;
        write_atomic(self.path.to_path_buf(), text).await?;
        self.loaded.dirty = false;
        tracing::debug!(
            path = %self.path.display(),
            increment = self.loaded.index.increment,
            "index saved"
        );
        Ok(true)
    }
}

async fn load(path: &Path) -> Result<IndexFile, RepositoryError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(IndexFile::parse(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IndexFile::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomic(path: PathBuf, text: String) -> Result<(), RepositoryError> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_schema::{ContentHash, ResourceDescriptor};

    fn rd(data: &[u8], name: &str, version: &str) -> ResourceDescriptor {
        let mut rd = ResourceDescriptor::new(
            ContentHash::of_bytes(data),
            name,
            version,
            format!("https://repo/{name}-{version}.jar"),
        );
        rd.repositories.insert("central".into());
        rd
    }

    #[tokio::test]
    async fn missing_file_is_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("index.json"));

        let mut guard = store.lock().await.unwrap();
        assert!(guard.index().descriptors.is_empty());
        assert!(!guard.save().await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn dirty_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");

        {
            let store = IndexStore::new(&path);
            let mut guard = store.lock().await.unwrap();
            guard.index_mut().descriptors.push(rd(b"b", "zeta", "1.0"));
            guard.index_mut().descriptors.push(rd(b"a", "alpha", "2.0"));
            guard.index_mut().descriptors.push(rd(b"c", "alpha", "1.10"));
            assert!(guard.save().await.unwrap());
            assert!(!guard.is_dirty());
            assert!(!guard.save().await.unwrap());
        }

        let reloaded = IndexStore::new(&path);
        let guard = reloaded.lock().await.unwrap();
        let listed: Vec<String> = guard
            .index()
            .descriptors
            .iter()
            .map(|rd| rd.to_string())
            .collect();
        assert_eq!(listed, ["alpha-1.10", "alpha-2.0", "zeta-1.0"]);
        assert_eq!(guard.index().increment, 1);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["index.json"]);
    }

    #[tokio::test]
    async fn corrupt_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = IndexStore::new(&path);
        assert!(matches!(
            store.lock().await,
            Err(RepositoryError::Index(_))
        ));
    }
}
