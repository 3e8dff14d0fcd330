use std::time::Duration;

use registrar_core::Result;

/// A unit of deferred work. `UpdatePackage` re-enters `UpdateEngine`;
/// `DeletePaths` is the delayed garbage-collection step `ProviderEmitter`
/// schedules after superseding a provider-tree file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    UpdatePackage { name: String, force: bool },
    DeletePaths { paths: Vec<String> },
}

/// A queue for deferred work. Transport (in-process channel, durable
/// broker, ...) is an implementation detail; callers only enqueue.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_update(&self, name: &str, force: bool) -> Result<()>;

    /// Enqueues deletion of `paths`, to run no sooner than `delay` from now.
    async fn enqueue_delete_with_delay(&self, paths: Vec<String>, delay: Duration) -> Result<()>;
}
