//! Fetch commands
//!
//! `get` downloads inline and prints the path; `fetch` queues background
//! downloads and waits for every listener to report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use depot_core::{DownloadListener, ResourceRepository, SharedListener};
use depot_schema::ContentHash;
use tokio::sync::mpsc;

use crate::ui;

/// Fetch `hash` on this task and print where it landed.
pub async fn get(repo: &ResourceRepository, hash: &ContentHash) -> Result<()> {
    match repo.get_resource(hash, Vec::new()).await? {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("{hash} is unavailable: not indexed, or its source failed recently"),
    }
}

type Outcome = (ContentHash, Result<PathBuf, String>);

/// Reports a download outcome back to the waiting command.
struct Reporter {
    id: ContentHash,
    tx: mpsc::UnboundedSender<Outcome>,
}

impl DownloadListener for Reporter {
    fn success(&self, file: &Path) -> anyhow::Result<()> {
        self.tx.send((self.id, Ok(file.to_path_buf())))?;
        Ok(())
    }

    fn failure(&self, _file: &Path, reason: &str) -> anyhow::Result<()> {
        self.tx.send((self.id, Err(reason.to_string())))?;
        Ok(())
    }
}

/// Fetch every hash in the background and wait for all outcomes.
pub async fn fetch(repo: &ResourceRepository, hashes: &[ContentHash]) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut failed = 0;

    for id in hashes {
        let listener: SharedListener = Arc::new(Reporter { id: *id, tx: tx.clone() });
        if repo.get_resource(id, vec![listener]).await?.is_none() {
            ui::failure(&format!("{id} is unavailable: not indexed, or its source failed recently"));
            failed += 1;
        }
    }
    // Listeners hold the remaining senders; the channel closes once all have reported
    drop(tx);

    while let Some((id, outcome)) = rx.recv().await {
        match outcome {
            Ok(path) => ui::success(&format!("{id} {}", path.display())),
            Err(reason) => {
                ui::failure(&format!("{id} {reason}"));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} resources could not be fetched", hashes.len());
    }
    Ok(())
}
