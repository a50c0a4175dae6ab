//! The repository index file.
//!
//! A small JSON document kept under source control. It is written by hand
//! rather than through the serializer's pretty printer so that every
//! descriptor lands on exactly one line, keeping diffs to one line per change.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::ResourceDescriptor;
use crate::hash::ContentHash;

/// Index schema version written by this release.
pub const INDEX_VERSION: u32 = 1;

/// Errors raised while reading or writing the index file.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a valid index document.
    #[error("Malformed index: {0}")]
    Json(#[from] serde_json::Error),

    /// The file was written by a newer schema.
    #[error("Index version mismatch: found v{found}, this build supports up to v{supported}")]
    UnsupportedVersion {
        /// Schema version found in the file.
        found: u32,
        /// Newest schema version this build reads.
        supported: u32,
    },

    /// A descriptor's name or version would place its artifact outside its
    /// cache directory.
    #[error("Descriptor {id} has an unsafe name or version: '{label}'")]
    UnsafeName {
        /// Content hash of the offending descriptor.
        id: ContentHash,
        /// Its `<name>-<version>` label.
        label: String,
    },

    /// The same content hash appears twice.
    #[error("Duplicate descriptor in index: {0}")]
    Duplicate(ContentHash),
}

/// In-memory form of the index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFile {
    /// Schema version.
    pub version: u32,

    /// Bumped on every write.
    #[serde(default)]
    pub increment: u64,

    /// Last write, epoch milliseconds.
    #[serde(default)]
    pub date: i64,

    /// All known descriptors.
    #[serde(default)]
    pub descriptors: Vec<ResourceDescriptor>,

    /// Top-level fields written by newer releases.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for IndexFile {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            increment: 0,
            date: 0,
            descriptors: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl IndexFile {
    /// Decode an index document.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Json`] for malformed input,
    /// [`IndexError::UnsupportedVersion`] for a newer schema,
    /// [`IndexError::Duplicate`] if a hash occurs twice and
    /// [`IndexError::UnsafeName`] for a name or version that is not a plain
    /// file name fragment.
    pub fn parse(text: &str) -> Result<Self, IndexError> {
        let index: Self = serde_json::from_str(text)?;
        if index.version > INDEX_VERSION {
            return Err(IndexError::UnsupportedVersion {
                found: index.version,
                supported: INDEX_VERSION,
            });
        }

        let mut seen = std::collections::HashSet::with_capacity(index.descriptors.len());
        for rd in &index.descriptors {
            if !seen.insert(rd.id) {
                return Err(IndexError::Duplicate(rd.id));
            }
            if !rd.has_safe_file_name() {
                return Err(IndexError::UnsafeName {
                    id: rd.id,
                    label: rd.to_string(),
                });
            }
        }

        Ok(index)
    }

    /// Render the document for writing.
    ///
    /// Sorts descriptors by name, then version, then id, bumps `increment`
    /// and stamps `date` with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Json`] if a descriptor cannot be serialized.
    pub fn render(&mut self) -> Result<String, IndexError> {
        self.descriptors.sort_by(ResourceDescriptor::index_order);
        self.increment += 1;
        self.date = chrono::Utc::now().timestamp_millis();
        self.version = self.version.max(INDEX_VERSION);

        let mut out = String::new();
        out.push_str("{\n");
        let _ = writeln!(out, "  \"version\": {},", self.version);
        let _ = writeln!(out, "  \"increment\": {},", self.increment);
        let _ = writeln!(out, "  \"date\": {},", self.date);
        for (key, value) in &self.extra {
            let _ = writeln!(
                out,
                "  {}: {},",
                serde_json::to_string(key)?,
                serde_json::to_string(value)?
            );
        }
        out.push_str("  \"descriptors\": [\n");

        let mut separator = "";
        for rd in &self.descriptors {
            out.push_str(separator);
            out.push_str(&serde_json::to_string(rd)?);
            separator = ",\n";
        }
        out.push_str("\n  ]\n}\n");
        Ok(out)
    }

    /// Position of the descriptor with the given hash.
    pub fn position(&self, id: &ContentHash) -> Option<usize> {
        self.descriptors.iter().position(|rd| rd.id == *id)
    }

    /// Descriptor with the given hash.
    pub fn get(&self, id: &ContentHash) -> Option<&ResourceDescriptor> {
        self.descriptors.iter().find(|rd| rd.id == *id)
    }
}
