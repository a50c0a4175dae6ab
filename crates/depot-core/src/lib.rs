//! Content-addressed resource repository and download cache.
//!
//! [`ResourceRepository`] keeps an index of artifacts keyed by SHA-256 and
//! fetches them on demand into `<cache>/<hex>/<name>-<version>.<ext>`.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod executor;
pub mod io;
pub mod listener;
pub mod paths;
pub mod reconcile;
pub mod repository;
pub mod store;

pub use config::RepositoryConfig;
pub use error::{FetchError, RepositoryError};
pub use events::{EventBus, EventKind, RepositoryEvent, RepositoryListener};
pub use executor::Executor;
#[cfg(feature = "network")]
pub use io::transport::HttpTransport;
pub use io::transport::{ByteStream, LocalTransport, Transport};
pub use listener::{DownloadListener, NullListener, SharedListener};
pub use paths::try_depot_home;
pub use reconcile::ReconcileReport;
pub use repository::{RepositoryBuilder, ResourceRepository};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("depot/", env!("CARGO_PKG_VERSION"));
