// Example: Drain pending attachments through the bounded worker pool
//
// This example demonstrates the upload flow without a server:
// 1. Build a handful of in-memory attachments (as if just recorded)
// 2. Simulate an entry-save response echoing one placeholder each
// 3. Plan the upload pass and drain it with 2 workers
// 4. Convert failures back into retryable pending attachments
//
// Usage: cargo run --example upload_drain

use anyhow::Result;
use async_trait::async_trait;
use journal_capture::{
    drain, plan_uploads, FilePlaceholder, MediaBlob, PendingAttachment, ServerFile, UploadTask,
    Uploader, DEFAULT_UPLOAD_WORKERS,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

/// Uploader that fails every third task to show failure handling
struct FlakyUploader {
    counter: AtomicUsize,
}

#[async_trait]
impl Uploader for FlakyUploader {
    async fn upload(&self, task: &UploadTask) -> Result<ServerFile> {
        tokio::time::sleep(Duration::from_millis(50)).await;

        let attempt = self.counter.fetch_add(1, Ordering::SeqCst);
        if attempt % 3 == 2 {
            anyhow::bail!("simulated network failure");
        }

        Ok(ServerFile {
            id: task.file_id,
            name: task.name.clone(),
            size: task.payload.bytes.len() as u64,
            content_type: task.payload.content_type.clone(),
            key: Some(task.key),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Journal Capture - Upload Drain Example");

    // Six generated attachments pending on the form
    let pending: Vec<PendingAttachment> = (0..6)
        .map(|i| {
            let blob = MediaBlob {
                content_type: "audio/webm".to_string(),
                data: vec![i as u8; 1024],
            };
            PendingAttachment::from_blob(blob, format!("clip-{}.webm", i))
        })
        .collect();

    // The entry-save response lists one placeholder per attachment,
    // echoing each client key
    let placeholders: Vec<FilePlaceholder> = pending
        .iter()
        .enumerate()
        .map(|(i, attachment)| FilePlaceholder {
            id: 100 + i as i64,
            key: Some(attachment.key()),
            received: false,
        })
        .collect();

    let (tasks, leftover) = plan_uploads(42, &placeholders, &pending).await?;
    info!(
        "{} tasks planned, {} attachments left pending",
        tasks.len(),
        leftover.len()
    );

    let uploader: Arc<dyn Uploader> = Arc::new(FlakyUploader {
        counter: AtomicUsize::new(0),
    });
    let report = drain(tasks, DEFAULT_UPLOAD_WORKERS, uploader).await;

    info!(
        "Upload pass complete: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    info!("Confirmed records:\n{}", serde_json::to_string_pretty(&report.succeeded)?);

    // Failures keep their payloads and go back on the pending list
    let (confirmed, retries) = report.into_retries();
    info!(
        "{} confirmed, {} queued for retry on next save",
        confirmed.len(),
        retries.len()
    );
    for attachment in &retries {
        info!(
            "  will retry '{}' (failed attempts: {})",
            attachment.name(),
            attachment.attempts()
        );
    }

    Ok(())
}
