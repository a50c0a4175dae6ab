use anyhow::Result;
use depot_core::ResourceRepository;

use crate::ui;

/// Clean up interrupted downloads and report (or prune) unindexed entries.
pub async fn reconcile(repo: &ResourceRepository, prune: bool) -> Result<()> {
    let report = repo.reconcile(prune).await?;

    for path in &report.temp_files_removed {
        ui::info(&format!("removed {}", path.display()));
    }
    for path in &report.orphaned {
        if report.pruned {
            ui::info(&format!("pruned {}", path.display()));
        } else {
            ui::warning(&format!("unindexed {}", path.display()));
        }
    }

    if !report.pruned && !report.orphaned.is_empty() {
        ui::info("Run 'depot reconcile --prune' to delete unindexed entries.");
    }
    ui::success(&format!(
        "{} interrupted downloads removed, {} unindexed entries{}",
        report.temp_files_removed.len(),
        report.orphaned.len(),
        if report.pruned { " pruned" } else { "" }
    ));
    Ok(())
}
