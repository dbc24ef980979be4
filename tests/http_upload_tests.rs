// Integration tests for the HTTP uploader against a mock entry-files
// endpoint
//
// A small axum server stands in for the journal backend: it accepts
// PUT /entries/:entry_id/files/:file_id, records what it received, and
// returns the confirmed file record (or a 500 for one designated id).

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::put,
    Json, Router,
};
use journal_capture::{drain, HttpUploader, ServerFile, UploadPayload, UploadTask, Uploader};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// File id the mock server always rejects
const POISONED_FILE_ID: i64 = 500;

#[derive(Clone, Default)]
struct ServerLog {
    received: Arc<Mutex<Vec<(i64, i64, String, usize)>>>,
}

async fn put_file(
    State(log): State<ServerLog>,
    Path((entry_id, file_id)): Path<(i64, i64)>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ServerFile>, StatusCode> {
    if file_id == POISONED_FILE_ID {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    log.received
        .lock()
        .unwrap()
        .push((entry_id, file_id, content_type.clone(), body.len()));

    Ok(Json(ServerFile {
        id: file_id,
        name: format!("file-{}", file_id),
        size: body.len() as u64,
        content_type,
        key: None,
    }))
}

async fn spawn_mock_server() -> Result<(String, ServerLog)> {
    let log = ServerLog::default();
    let app = Router::new()
        .route("/entries/:entry_id/files/:file_id", put(put_file))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{}", addr), log))
}

fn task(entry_id: i64, file_id: i64, name: &str, bytes: &[u8]) -> UploadTask {
    UploadTask {
        entry_id,
        file_id,
        key: Uuid::new_v4(),
        name: name.to_string(),
        attempts: 0,
        payload: UploadPayload {
            content_type: "audio/webm".to_string(),
            bytes: bytes.to_vec(),
        },
    }
}

#[tokio::test]
async fn test_http_uploader_sends_payload_and_parses_record() -> Result<()> {
    let (base_url, log) = spawn_mock_server().await?;
    let uploader = HttpUploader::new(&base_url);

    let task = task(42, 7, "memo.webm", b"recorded bytes");
    let file = uploader.upload(&task).await?;

    assert_eq!(file.id, 7);
    assert_eq!(file.size, 14);
    assert_eq!(file.content_type, "audio/webm");

    let received = log.received.lock().unwrap().clone();
    assert_eq!(received, vec![(42, 7, "audio/webm".to_string(), 14)]);

    Ok(())
}

#[tokio::test]
async fn test_http_uploader_treats_error_status_as_task_failure() -> Result<()> {
    let (base_url, _log) = spawn_mock_server().await?;
    let uploader = HttpUploader::new(&base_url);

    let task = task(42, POISONED_FILE_ID, "doomed.webm", b"bytes");
    let result = uploader.upload(&task).await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_drain_against_http_endpoint() -> Result<()> {
    let (base_url, log) = spawn_mock_server().await?;
    let uploader: Arc<dyn Uploader> = Arc::new(HttpUploader::new(&base_url));

    let tasks = vec![
        task(42, 1, "a.webm", &[1u8; 100]),
        task(42, 2, "b.webm", &[2u8; 200]),
        task(42, POISONED_FILE_ID, "c.webm", &[3u8; 50]),
        task(42, 4, "d.webm", &[4u8; 400]),
    ];

    let report = drain(tasks, 2, uploader).await;

    assert_eq!(report.succeeded.len(), 3);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.total(), 4);

    // The failure kept its payload and never blocked the other uploads
    assert_eq!(report.failed[0].file_id, POISONED_FILE_ID);
    assert_eq!(report.failed[0].payload.bytes, vec![3u8; 50]);

    let mut sizes: Vec<usize> = log
        .received
        .lock()
        .unwrap()
        .iter()
        .map(|(_, _, _, size)| *size)
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![100, 200, 400]);

    Ok(())
}
