use std::path::Path;

use anyhow::{Context, Result, bail};
use depot_core::ResourceRepository;
use depot_schema::{ContentHash, ResourceDescriptor};

use crate::ui;

/// Fields of the descriptor to index.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub name: String,
    pub version: String,
    pub url: String,
    pub hash: Option<ContentHash>,
    pub description: Option<String>,
}

/// Index a resource under `owner`.
///
/// Without an explicit hash the source must be a `file://` URL, which is
/// hashed in place.
pub async fn add(repo: &ResourceRepository, owner: &str, request: AddRequest) -> Result<()> {
    let id = match request.hash {
        Some(id) => id,
        None => hash_local(&request.url)?,
    };

    let mut rd = ResourceDescriptor::new(id, request.name, request.version, request.url);
    if let Some(description) = request.description {
        rd = rd.with_description(description);
    }

    repo.add(owner, rd.clone())
        .await
        .with_context(|| format!("Failed to add {rd}"))?;
    ui::success(&format!("Added {rd} to '{owner}' ({id})"));
    Ok(())
}

fn hash_local(url: &str) -> Result<ContentHash> {
    let Some(path) = url.strip_prefix("file://") else {
        bail!("--hash is required unless the URL is a file:// URL");
    };
    ContentHash::of_file(Path::new(path)).with_context(|| format!("Failed to hash {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jar");
        std::fs::write(&path, b"contents").unwrap();

        let id = hash_local(&format!("file://{}", path.display())).unwrap();
        assert_eq!(id, ContentHash::of_bytes(b"contents"));
    }

    #[test]
    fn test_hash_required_for_remote() {
        let err = hash_local("https://example.com/a.jar").unwrap_err();
        assert!(err.to_string().contains("--hash"));
    }
}
