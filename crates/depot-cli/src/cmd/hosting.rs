use anyhow::Result;
use depot_core::ResourceRepository;

/// Print the scratch directory for `name`, creating it if needed.
pub async fn hosting(repo: &ResourceRepository, name: &str) -> Result<()> {
    let dir = repo.get_cache_dir(name).await?;
    println!("{}", dir.display());
    Ok(())
}
