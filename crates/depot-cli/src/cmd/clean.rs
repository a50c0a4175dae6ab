//! Clean command

use anyhow::Result;
use depot_core::ResourceRepository;
use depot_schema::ContentHash;

use crate::ui;

/// Delete the cached bytes for `hash`. The index entry is kept.
pub async fn clean(repo: &ResourceRepository, hash: &ContentHash) -> Result<()> {
    if repo.delete_cache(hash).await? {
        ui::success(&format!("Cleared cache for {hash}"));
    } else {
        ui::info(&format!("Nothing cached for {hash}"));
    }
    Ok(())
}
