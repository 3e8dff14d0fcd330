use std::time::Duration;

use registrar_core::Result;
use tokio::sync::mpsc;

use crate::traits::{Job, JobQueue};

/// An in-process `JobQueue` over a `tokio::sync::mpsc` channel. Delayed
/// jobs are held by a `tokio::time::sleep` future spawned per enqueue
/// rather than a shared timer wheel — adequate for a single-process
/// deployment; a durable broker is the external collaborator this trait
/// exists to make swappable.
#[derive(Debug, Clone)]
pub struct TokioJobQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl TokioJobQueue {
    /// Returns a queue plus the receiving half a worker loop drains.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl JobQueue for TokioJobQueue {
    async fn enqueue_update(&self, name: &str, force: bool) -> Result<()> {
        let job = Job::UpdatePackage {
            name: name.to_string(),
            force,
        };
        tracing::debug!(?job, "enqueueing update job");
        let _ = self.sender.send(job);
        Ok(())
    }

    async fn enqueue_delete_with_delay(&self, paths: Vec<String>, delay: Duration) -> Result<()> {
        let sender = self.sender.clone();
        tracing::debug!(?paths, ?delay, "scheduling delayed delete job");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(Job::DeletePaths { paths });
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn update_job_is_delivered_immediately() {
        let (queue, mut rx) = TokioJobQueue::new();
        queue.enqueue_update("acme/widgets", false).await.unwrap();
        let job = rx.recv().await.unwrap();
        assert_eq!(
            job,
            Job::UpdatePackage {
                name: "acme/widgets".to_string(),
                force: false
            }
        );
    }

    #[tokio::test]
    async fn delete_job_is_delivered_after_delay() {
        let (queue, mut rx) = TokioJobQueue::new();
        queue
            .enqueue_delete_with_delay(vec!["p/a/abc.json".to_string()], Duration::from_millis(10))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
        let job = rx.recv().await.unwrap();
        assert_eq!(
            job,
            Job::DeletePaths {
                paths: vec!["p/a/abc.json".to_string()]
            }
        );
    }
}
