//! Command implementations, one module per subcommand.

pub mod add;
pub mod clean;
pub mod find;
pub mod get;
pub mod hosting;
pub mod list;
pub mod reconcile;
pub mod remove;
