use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::capture::MediaBlob;

use super::drain::UploadTask;

/// Payload bytes plus the content type to send them under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A client-held file awaiting upload
///
/// Every variant carries a client-generated key; the server echoes it on
/// the placeholder record created at entry save, which is how outcomes
/// find their way back to the right attachment regardless of completion
/// order.
#[derive(Debug, Clone)]
pub enum PendingAttachment {
    /// A file the user picked from disk
    Local {
        key: Uuid,
        name: String,
        path: PathBuf,
    },
    /// An assembled recording or generated blob
    InMemory {
        key: Uuid,
        name: String,
        blob: MediaBlob,
    },
    /// A previously attempted upload, payload retained for retry
    Failed {
        key: Uuid,
        name: String,
        payload: UploadPayload,
        attempts: u32,
    },
}

impl PendingAttachment {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        PendingAttachment::Local {
            key: Uuid::new_v4(),
            name,
            path,
        }
    }

    pub fn from_blob(blob: MediaBlob, name: impl Into<String>) -> Self {
        PendingAttachment::InMemory {
            key: Uuid::new_v4(),
            name: name.into(),
            blob,
        }
    }

    pub fn key(&self) -> Uuid {
        match self {
            PendingAttachment::Local { key, .. }
            | PendingAttachment::InMemory { key, .. }
            | PendingAttachment::Failed { key, .. } => *key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PendingAttachment::Local { name, .. }
            | PendingAttachment::InMemory { name, .. }
            | PendingAttachment::Failed { name, .. } => name,
        }
    }

    /// How many upload attempts this attachment has already failed
    pub fn attempts(&self) -> u32 {
        match self {
            PendingAttachment::Failed { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Materialize the payload to send
    ///
    /// `Local` reads the file from disk; the other variants already hold
    /// their bytes.
    pub async fn payload(&self) -> Result<UploadPayload> {
        match self {
            PendingAttachment::Local { path, .. } => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read attachment file: {:?}", path))?;
                Ok(UploadPayload {
                    content_type: content_type_for(path).to_string(),
                    bytes,
                })
            }
            PendingAttachment::InMemory { blob, .. } => Ok(UploadPayload {
                content_type: blob.content_type.clone(),
                bytes: blob.data.clone(),
            }),
            PendingAttachment::Failed { payload, .. } => Ok(payload.clone()),
        }
    }
}

/// One element of the entry-save response's file list
///
/// `key` echoes the client correlation key when the placeholder was
/// created for a pending attachment; `received` marks placeholders whose
/// data the server already holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePlaceholder {
    pub id: i64,
    #[serde(default)]
    pub key: Option<Uuid>,
    #[serde(default)]
    pub received: bool,
}

/// A confirmed file record returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFile {
    pub id: i64,
    pub name: String,
    pub size: u64,
    pub content_type: String,
    #[serde(default)]
    pub key: Option<Uuid>,
}

/// Pair placeholders still awaiting data with their pending attachments
///
/// Returns the tasks for one upload pass plus the attachments no
/// placeholder asked for (still pending). The input list is borrowed, so
/// an I/O failure while materializing a payload aborts the whole pass
/// and the caller's pending attachments are untouched for retry.
pub async fn plan_uploads(
    entry_id: i64,
    placeholders: &[FilePlaceholder],
    pending: &[PendingAttachment],
) -> Result<(Vec<UploadTask>, Vec<PendingAttachment>)> {
    let mut tasks = Vec::new();
    let mut leftover = Vec::new();

    for attachment in pending {
        let placeholder = placeholders
            .iter()
            .find(|p| !p.received && p.key == Some(attachment.key()));

        match placeholder {
            Some(placeholder) => {
                let payload = attachment
                    .payload()
                    .await
                    .with_context(|| format!("Failed to stage '{}'", attachment.name()))?;
                tasks.push(UploadTask {
                    entry_id,
                    file_id: placeholder.id,
                    key: attachment.key(),
                    name: attachment.name().to_string(),
                    attempts: attachment.attempts(),
                    payload,
                });
            }
            None => leftover.push(attachment.clone()),
        }
    }

    Ok((tasks, leftover))
}

/// Merge confirmed records into an entry's file list by id
///
/// Id-based matching tolerates outcomes arriving in any completion order.
pub fn merge_confirmed(files: &mut Vec<ServerFile>, confirmed: Vec<ServerFile>) {
    for file in confirmed {
        match files.iter_mut().find(|existing| existing.id == file.id) {
            Some(slot) => *slot = file,
            None => files.push(file),
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        _ => "application/octet-stream",
    }
}
