//! Identity record for one cacheable artifact.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::types::Version;

/// Metadata for one artifact in the repository index.
///
/// Equality and ordering are defined solely over [`ResourceDescriptor::id`];
/// two descriptors with the same hash are the same artifact regardless of the
/// labels attached to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Content hash of the artifact bytes.
    pub id: ContentHash,

    /// Artifact identity (e.g. a bundle symbolic name).
    pub name: String,

    /// Artifact version.
    pub version: Version,

    /// Where the bytes can be fetched from.
    pub url: String,

    /// Logical repositories that currently vouch for this artifact.
    #[serde(default)]
    pub repositories: BTreeSet<String>,

    /// Optional human readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Fields written by newer releases, carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ResourceDescriptor {
    /// Create a descriptor that no repository claims yet.
    pub fn new(
        id: ContentHash,
        name: impl Into<String>,
        version: impl Into<Version>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            url: url.into(),
            repositories: BTreeSet::new(),
            description: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether `repo` is one of the owning repositories.
    pub fn is_owned_by(&self, repo: &str) -> bool {
        self.repositories.contains(repo)
    }

    /// Whether `name` and `version` can be embedded in [`Self::file_name`]
    /// without the result leaving the artifact directory.
    pub fn has_safe_file_name(&self) -> bool {
        is_file_name_part(&self.name) && is_file_name_part(&self.version)
    }

    /// File name used for the cached artifact: `<name>-<version>.<ext>`.
    ///
    /// The extension is taken from the last path segment of the source URL,
    /// falling back to `bin`.
    pub fn file_name(&self) -> String {
        format!("{}-{}.{}", self.name, self.version, self.extension())
    }

    fn extension(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let last = path.rsplit('/').next().unwrap_or_default();
        match last.rsplit_once('.') {
            Some((stem, ext))
                if !stem.is_empty()
                    && !ext.is_empty()
                    && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext
            }
            _ => "bin",
        }
    }

    /// Sort key used when persisting the index: name, then version, then id.
    pub fn index_order(a: &Self, b: &Self) -> Ordering {
        a.name
            .cmp(&b.name)
            .then_with(|| a.version.cmp(&b.version))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Whether `part` can be spliced into a file name: no separators, no parent
/// references, no drive prefix.
pub fn is_file_name_part(part: &str) -> bool {
    !part.contains("..") && !part.contains(['/', '\\', ':', '\0'])
}

impl PartialEq for ResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ResourceDescriptor {}

impl PartialOrd for ResourceDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for ResourceDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}
