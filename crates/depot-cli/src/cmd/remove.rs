use anyhow::Result;
use depot_core::ResourceRepository;
use depot_schema::ContentHash;

use crate::ui;

/// Remove `hash` from the index, or withdraw `owner`'s claim on it.
pub async fn remove(repo: &ResourceRepository, hash: &ContentHash, owner: Option<&str>) -> Result<()> {
    let Some(rd) = repo.get_descriptor(hash).await? else {
        ui::warning(&format!("{hash} is not indexed"));
        return Ok(());
    };

    if !repo.delete(owner, hash).await? {
        if let Some(owner) = owner {
            ui::warning(&format!("{rd} is not in repository '{owner}'"));
        }
        return Ok(());
    }

    match repo.get_descriptor(hash).await? {
        Some(left) => {
            let repos: Vec<&str> = left.repositories.iter().map(String::as_str).collect();
            ui::success(&format!("{rd} kept by {}", repos.join(", ")));
        }
        None => ui::success(&format!("Removed {rd}")),
    }
    Ok(())
}
