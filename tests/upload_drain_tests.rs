// Integration tests for the bounded-concurrency upload drain
//
// These tests verify that every task is sent exactly once, failures
// never block the pool, and outcomes correlate back to their
// attachments by key regardless of completion order.

use anyhow::Result;
use async_trait::async_trait;
use journal_capture::{
    drain, merge_confirmed, plan_uploads, FilePlaceholder, MediaBlob, PendingAttachment,
    ServerFile, UploadPayload, UploadTask, Uploader,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scriptable uploader: per-id failures and delays, plus a processed log
#[derive(Default)]
struct MockUploader {
    fail_ids: HashSet<i64>,
    delays_ms: HashMap<i64, u64>,
    processed: Mutex<Vec<i64>>,
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, task: &UploadTask) -> Result<ServerFile> {
        if let Some(ms) = self.delays_ms.get(&task.file_id) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }

        self.processed.lock().unwrap().push(task.file_id);

        if self.fail_ids.contains(&task.file_id) {
            anyhow::bail!("simulated failure for file {}", task.file_id);
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

fn task(entry_id: i64, file_id: i64, name: &str, bytes: &[u8]) -> UploadTask {
    UploadTask {
        entry_id,
        file_id,
        key: Uuid::new_v4(),
        name: name.to_string(),
        attempts: 0,
        payload: UploadPayload {
            content_type: "application/octet-stream".to_string(),
            bytes: bytes.to_vec(),
        },
    }
}

#[tokio::test]
async fn test_drain_accounts_for_every_task() {
    let tasks: Vec<UploadTask> = (1..=5)
        .map(|i| task(7, i, &format!("file-{}", i), &[i as u8; 16]))
        .collect();

    let uploader = Arc::new(MockUploader {
        fail_ids: HashSet::from([2, 4]),
        ..Default::default()
    });

    let report = drain(tasks, 2, uploader.clone() as Arc<dyn Uploader>).await;

    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.total(), 5, "every task accounted for");
    assert!(!report.is_clean());

    // No task processed twice, none omitted
    let processed = uploader.processed.lock().unwrap().clone();
    let unique: HashSet<i64> = processed.iter().copied().collect();
    assert_eq!(processed.len(), 5);
    assert_eq!(unique, HashSet::from([1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_failed_tasks_keep_payload_for_retry() {
    let original = task(7, 2, "retained.webm", b"precious recording bytes");
    let key = original.key;

    let uploader = Arc::new(MockUploader {
        fail_ids: HashSet::from([2]),
        ..Default::default()
    });

    let report = drain(vec![original], 2, uploader as Arc<dyn Uploader>).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].payload.bytes, b"precious recording bytes");

    let (confirmed, retries) = report.into_retries();
    assert!(confirmed.is_empty());
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].key(), key, "correlation key survives the retry round-trip");
    assert_eq!(retries[0].name(), "retained.webm");
    assert_eq!(retries[0].attempts(), 1, "failed attempt counted");

    // The retained payload re-uploads unmodified
    let payload = retries[0].payload().await.unwrap();
    assert_eq!(payload.bytes, b"precious recording bytes");
}

#[tokio::test(start_paused = true)]
async fn test_correlation_by_key_survives_reversed_completion() {
    // One worker per task; delays reverse the completion order
    let tasks: Vec<UploadTask> = vec![
        task(7, 1, "first", b"aa"),
        task(7, 2, "second", b"bb"),
        task(7, 3, "third", b"cc"),
    ];
    let names_by_key: HashMap<Uuid, String> = tasks
        .iter()
        .map(|t| (t.key, t.name.clone()))
        .collect();

    let uploader = Arc::new(MockUploader {
        delays_ms: HashMap::from([(1, 300), (2, 200), (3, 100)]),
        ..Default::default()
    });

    let report = drain(tasks, 3, uploader as Arc<dyn Uploader>).await;

    assert_eq!(report.succeeded.len(), 3);

    // Outcomes arrive in completion order, reversed from submission
    let completion_ids: Vec<i64> = report.succeeded.iter().map(|f| f.id).collect();
    assert_eq!(completion_ids, vec![3, 2, 1]);

    // Each outcome still finds its originating attachment by key
    for file in &report.succeeded {
        let key = file.key.expect("mock echoes the client key");
        assert_eq!(names_by_key[&key], file.name);
    }
}

#[tokio::test]
async fn test_more_workers_than_tasks() {
    let tasks = vec![task(7, 1, "only", b"x")];

    let report = drain(tasks, 8, Arc::new(MockUploader::default()) as Arc<dyn Uploader>).await;

    assert_eq!(report.total(), 1);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_zero_worker_count_is_clamped() {
    let tasks: Vec<UploadTask> = (1..=3).map(|i| task(7, i, "f", &[0u8])).collect();

    let report = drain(tasks, 0, Arc::new(MockUploader::default()) as Arc<dyn Uploader>).await;

    assert_eq!(report.total(), 3);
}

#[tokio::test]
async fn test_empty_task_list_completes_immediately() {
    let report = drain(Vec::new(), 2, Arc::new(MockUploader::default()) as Arc<dyn Uploader>).await;

    assert_eq!(report.total(), 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_single_worker_processes_in_input_order() {
    let tasks: Vec<UploadTask> = (1..=4).map(|i| task(7, i, "f", &[0u8])).collect();

    let uploader = Arc::new(MockUploader::default());
    drain(tasks, 1, uploader.clone() as Arc<dyn Uploader>).await;

    let processed = uploader.processed.lock().unwrap().clone();
    assert_eq!(processed, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_plan_uploads_pairs_by_key_and_returns_leftovers() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let local_path = temp_dir.path().join("notes.txt");
    tokio::fs::write(&local_path, b"picked from disk").await?;

    let local = PendingAttachment::from_path(&local_path);
    let recorded = PendingAttachment::from_blob(
        MediaBlob {
            content_type: "audio/webm".to_string(),
            data: vec![9u8; 64],
        },
        "memo.webm",
    );
    let unmatched = PendingAttachment::from_blob(MediaBlob::empty("audio/webm"), "spare.webm");
    let already_received = PendingAttachment::from_blob(MediaBlob::empty("audio/webm"), "done.webm");

    let placeholders = vec![
        FilePlaceholder {
            id: 11,
            key: Some(local.key()),
            received: false,
        },
        FilePlaceholder {
            id: 12,
            key: Some(recorded.key()),
            received: false,
        },
        // Server already has this one; it must not upload again
        FilePlaceholder {
            id: 13,
            key: Some(already_received.key()),
            received: true,
        },
        // Pre-existing file with no client key
        FilePlaceholder {
            id: 14,
            key: None,
            received: true,
        },
    ];

    let pending = vec![local, recorded, unmatched, already_received];
    let (tasks, leftover) = plan_uploads(42, &placeholders, &pending).await?;

    assert_eq!(tasks.len(), 2);
    assert_eq!(leftover.len(), 2);

    let local_task = tasks.iter().find(|t| t.file_id == 11).unwrap();
    assert_eq!(local_task.entry_id, 42);
    assert_eq!(local_task.payload.bytes, b"picked from disk");
    assert_eq!(local_task.payload.content_type, "text/plain");

    let recorded_task = tasks.iter().find(|t| t.file_id == 12).unwrap();
    assert_eq!(recorded_task.payload.content_type, "audio/webm");
    assert_eq!(recorded_task.payload.bytes.len(), 64);

    let leftover_names: HashSet<&str> = leftover.iter().map(|a| a.name()).collect();
    assert_eq!(leftover_names, HashSet::from(["spare.webm", "done.webm"]));

    Ok(())
}

#[tokio::test]
async fn test_plan_uploads_propagates_read_failure() {
    let ghost = PendingAttachment::from_path("/definitely/not/here.bin");
    let placeholders = vec![FilePlaceholder {
        id: 1,
        key: Some(ghost.key()),
        received: false,
    }];

    let pending = vec![ghost];
    let result = plan_uploads(1, &placeholders, &pending).await;

    assert!(result.is_err(), "a staging failure aborts the whole pass");
    assert_eq!(pending.len(), 1, "the caller's pending list is untouched");
}

#[tokio::test]
async fn test_retry_attempts_accumulate_across_passes() {
    let failed_before = PendingAttachment::Failed {
        key: Uuid::new_v4(),
        name: "stubborn.webm".to_string(),
        payload: UploadPayload {
            content_type: "audio/webm".to_string(),
            bytes: vec![1, 2, 3],
        },
        attempts: 1,
    };
    let placeholders = vec![FilePlaceholder {
        id: 21,
        key: Some(failed_before.key()),
        received: false,
    }];

    let pending = vec![failed_before];
    let (tasks, _) = plan_uploads(7, &placeholders, &pending).await.unwrap();
    assert_eq!(tasks[0].attempts, 1);

    let uploader = Arc::new(MockUploader {
        fail_ids: HashSet::from([21]),
        ..Default::default()
    });
    let report = drain(tasks, 2, uploader as Arc<dyn Uploader>).await;

    let (_, retries) = report.into_retries();
    assert_eq!(retries[0].attempts(), 2);
}

#[test]
fn test_merge_confirmed_replaces_by_id() {
    let mut files = vec![
        ServerFile {
            id: 1,
            name: "a.webm".to_string(),
            size: 0,
            content_type: "audio/webm".to_string(),
            key: None,
        },
        ServerFile {
            id: 2,
            name: "b.webm".to_string(),
            size: 0,
            content_type: "audio/webm".to_string(),
            key: None,
        },
    ];

    // Confirmations arrive out of submission order
    let confirmed = vec![
        ServerFile {
            id: 2,
            name: "b.webm".to_string(),
            size: 2048,
            content_type: "audio/webm".to_string(),
            key: None,
        },
        ServerFile {
            id: 3,
            name: "new.webm".to_string(),
            size: 10,
            content_type: "audio/webm".to_string(),
            key: None,
        },
    ];

    merge_confirmed(&mut files, confirmed);

    assert_eq!(files.len(), 3);
    assert_eq!(files[1].size, 2048, "matched by id, not by position");
    assert_eq!(files[2].name, "new.webm");
}
