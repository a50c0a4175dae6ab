//! depot - content-addressed artifact cache CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use depot_cli::cmd;
use depot_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let home = depot_cli::resolve_home(cli.home.as_deref())?;
    let repo = depot_cli::open_repository(&home)?;

    match cli.command {
        Commands::List { repo: filter } => cmd::list::list(&repo, filter.as_deref()).await,
        Commands::Add {
            repo: owner,
            name,
            version,
            url,
            hash,
            description,
        } => {
            let request = cmd::add::AddRequest {
                name,
                version,
                url,
                hash,
                description,
            };
            cmd::add::add(&repo, &owner, request).await
        }
        Commands::Remove { hash, repo: owner } => {
            cmd::remove::remove(&repo, &hash, owner.as_deref()).await
        }
        Commands::Find {
            name,
            range,
            repo: filter,
        } => cmd::find::find(&repo, &name, range.as_ref(), filter.as_deref()).await,
        Commands::Get { hash } => cmd::get::get(&repo, &hash).await,
        Commands::Fetch { hashes } => cmd::get::fetch(&repo, &hashes).await,
        Commands::Clean { hash } => cmd::clean::clean(&repo, &hash).await,
        Commands::Reconcile { prune } => cmd::reconcile::reconcile(&repo, prune).await,
        Commands::Hosting { name } => cmd::hosting::hosting(&repo, &name).await,
    }
}
