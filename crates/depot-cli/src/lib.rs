//! depot - content-addressed artifact cache
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Operator surface over a [`depot_core::ResourceRepository`].
//!
//! # Directory Layout
//!
//! ```text
//! ~/.depot/
//! ├── depot.toml      # Optional settings
//! ├── index.json      # Descriptor index, one entry per line
//! └── cache/
//!     ├── <sha256>/   # <name>-<version>.<ext>
//!     └── hosting/    # Named scratch directories
//! ```

pub mod cmd;
pub mod ui;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot_core::{RepositoryConfig, ResourceRepository};
use depot_schema::{ContentHash, VersionRange};

#[derive(Debug, Parser)]
#[command(name = "depot")]
#[command(author, version, about = "depot - content-addressed artifact cache")]
pub struct Cli {
    /// Depot home directory (index, cache, depot.toml)
    #[arg(long, global = true, env = "DEPOT_HOME")]
    pub home: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List indexed resources
    List {
        /// Only resources vouched for by this repository
        #[arg(long)]
        repo: Option<String>,
    },
    /// Index a resource under a repository
    Add {
        /// Owning repository label
        #[arg(long)]
        repo: String,
        /// Resource name
        #[arg(long)]
        name: String,
        /// Resource version
        #[arg(long)]
        version: String,
        /// Source URL
        #[arg(long)]
        url: String,
        /// SHA-256 of the content (computed for file:// URLs when omitted)
        #[arg(long)]
        hash: Option<ContentHash>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove a resource, or one repository's claim on it
    Remove {
        /// Content hash
        hash: ContentHash,
        /// Only withdraw this repository's claim
        #[arg(long)]
        repo: Option<String>,
    },
    /// Find resources by name
    Find {
        /// Resource name
        name: String,
        /// Version range: 1.2, ^1.2, [1.0,2.0)
        #[arg(long)]
        range: Option<VersionRange>,
        /// Only resources vouched for by this repository
        #[arg(long)]
        repo: Option<String>,
    },
    /// Fetch a resource and print its cached path
    Get {
        /// Content hash
        hash: ContentHash,
    },
    /// Fetch resources in the background and wait for all of them
    Fetch {
        /// Content hashes
        #[arg(required = true)]
        hashes: Vec<ContentHash>,
    },
    /// Delete cached bytes for a resource (the index entry stays)
    Clean {
        /// Content hash
        hash: ContentHash,
    },
    /// Remove interrupted downloads and report unindexed cache entries
    Reconcile {
        /// Also delete unindexed cache entries
        #[arg(long)]
        prune: bool,
    },
    /// Print (and create) a named scratch directory
    Hosting {
        /// Directory name
        name: String,
    },
}

/// Resolve the depot home: `--home`/`DEPOT_HOME`, else `~/.depot`.
pub fn resolve_home(home: Option<&Path>) -> Result<PathBuf> {
    match home {
        Some(home) => Ok(home.to_path_buf()),
        None => depot_core::try_depot_home()
            .context("Could not determine home directory. Set DEPOT_HOME."),
    }
}

/// Open the repository rooted at `home` on the current runtime.
pub fn open_repository(home: &Path) -> Result<ResourceRepository> {
    let config = RepositoryConfig::load(home)
        .with_context(|| format!("Failed to load configuration from {}", home.display()))?;
    ResourceRepository::new(config).context("Failed to open repository")
}
