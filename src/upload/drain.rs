use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::attachment::{PendingAttachment, ServerFile, UploadPayload};
use super::client::Uploader;

/// Worker count observed to saturate attachment uploads without
/// starving the rest of the save round-trip
pub const DEFAULT_UPLOAD_WORKERS: usize = 2;

/// A placeholder id paired with the payload that fills it
///
/// Created when the entry-save response lists attachments still needing
/// data; consumed by exactly one worker; lives only for the duration of
/// a single upload pass.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub entry_id: i64,
    pub file_id: i64,
    /// Client correlation key of the originating attachment
    pub key: Uuid,
    pub name: String,
    /// Failed attempts carried over from earlier passes
    pub attempts: u32,
    pub payload: UploadPayload,
}

/// Per-task outcomes of one upload pass, in completion order
#[derive(Debug, Default)]
pub struct UploadReport {
    pub succeeded: Vec<ServerFile>,
    pub failed: Vec<UploadTask>,
}

impl UploadReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Split into confirmed records and retryable attachments
    ///
    /// Failed tasks keep their payloads, so the next save attempt needs
    /// no re-selection or re-recording from the user.
    pub fn into_retries(self) -> (Vec<ServerFile>, Vec<PendingAttachment>) {
        let retries = self
            .failed
            .into_iter()
            .map(|task| PendingAttachment::Failed {
                key: task.key,
                name: task.name,
                payload: task.payload,
                attempts: task.attempts + 1,
            })
            .collect();
        (self.succeeded, retries)
    }
}

enum TaskOutcome {
    Succeeded(ServerFile),
    Failed(UploadTask),
}

/// Send every task exactly once through a fixed pool of workers
///
/// Workers repeatedly claim one not-yet-taken task from the shared pool
/// (claim-and-remove never spans an await) and process it sequentially;
/// a failed task is recorded with its payload retained and is never
/// retried within the pass. The call returns only after every worker has
/// exhausted the pool, so `succeeded` plus `failed` always accounts for
/// every task. Completion order across workers is unordered.
pub async fn drain(
    tasks: Vec<UploadTask>,
    worker_count: usize,
    uploader: Arc<dyn Uploader>,
) -> UploadReport {
    if tasks.is_empty() {
        return UploadReport::default();
    }

    let worker_count = worker_count.max(1).min(tasks.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    let mut workers = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let queue = Arc::clone(&queue);
        let uploader = Arc::clone(&uploader);
        let outcome_tx = outcome_tx.clone();

        workers.push(tokio::spawn(async move {
            loop {
                // Atomic pop: the guard drops before the upload await
                let task = { queue.lock().await.pop_front() };
                let Some(task) = task else { break };

                debug!(
                    "worker {} uploading '{}' (file {})",
                    worker_id, task.name, task.file_id
                );

                let outcome = match uploader.upload(&task).await {
                    Ok(file) => TaskOutcome::Succeeded(file),
                    Err(err) => {
                        warn!(
                            "worker {} failed to upload '{}' (file {}): {:#}",
                            worker_id, task.name, task.file_id, err
                        );
                        TaskOutcome::Failed(task)
                    }
                };

                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        }));
    }
    drop(outcome_tx);

    // Join semantics: the pass is complete only once every worker is done
    for worker in futures::future::join_all(workers).await {
        if let Err(err) = worker {
            error!("upload worker panicked: {}", err);
        }
    }

    let mut report = UploadReport::default();
    while let Ok(outcome) = outcome_rx.try_recv() {
        match outcome {
            TaskOutcome::Succeeded(file) => report.succeeded.push(file),
            TaskOutcome::Failed(task) => report.failed.push(task),
        }
    }

    debug!(
        "upload pass complete: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );

    report
}
