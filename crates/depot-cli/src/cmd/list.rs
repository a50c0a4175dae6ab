use anyhow::Result;
use depot_core::ResourceRepository;

use crate::ui;
use crate::ui::list::{print_footer, print_header, print_row};

/// List indexed resources, optionally only those owned by `owner`.
pub async fn list(repo: &ResourceRepository, owner: Option<&str>) -> Result<()> {
    let descriptors = repo.filter(owner, None).await?;

    if descriptors.is_empty() {
        println!();
        ui::info("No resources indexed.");
        ui::info("Run 'depot add --repo <label> --name <name> --version <v> --url <url>' to index one.");
        return Ok(());
    }

    print_header();

    let mut cached = 0;
    let mut total_size = 0;
    for rd in &descriptors {
        let size = std::fs::metadata(repo.cache_path(rd)).ok().map(|m| m.len());
        if let Some(size) = size {
            cached += 1;
            total_size += size;
        }
        print_row(rd, size);
    }

    print_footer(descriptors.len(), cached, total_size);
    Ok(())
}
