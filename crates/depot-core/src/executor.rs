//! Caller-supplied task executor for background downloads.

use futures::future::BoxFuture;

/// Something that can run a detached task.
///
/// The repository never spawns on its own; background fetches go through
/// whatever executor the embedding application hands in.
pub trait Executor: Send + Sync {
    fn execute(&self, task: BoxFuture<'static, ()>);
}

impl Executor for tokio::runtime::Handle {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.spawn(task);
    }
}
