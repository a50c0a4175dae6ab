use anyhow::Result;
use depot_core::ResourceRepository;
use depot_schema::VersionRange;

use crate::ui;
use crate::ui::list::{print_header, print_row};

/// Show every indexed version of `name`, oldest first.
pub async fn find(
    repo: &ResourceRepository,
    name: &str,
    range: Option<&VersionRange>,
    owner: Option<&str>,
) -> Result<()> {
    let found = repo.find(owner, name, range).await?;

    if found.is_empty() {
        match range {
            Some(range) => ui::warning(&format!("No versions of '{name}' match {range}")),
            None => ui::warning(&format!("'{name}' is not indexed")),
        }
        return Ok(());
    }

    print_header();
    for rd in &found {
        let size = std::fs::metadata(repo.cache_path(rd)).ok().map(|m| m.len());
        print_row(rd, size);
    }
    Ok(())
}
