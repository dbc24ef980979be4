//! Attachment upload: placeholder correlation and the bounded drain
//!
//! The form owns a list of `PendingAttachment`s. When an entry save
//! returns placeholders still awaiting data, `plan_uploads` pairs them
//! by client key into `UploadTask`s, and `drain` sends each exactly once
//! through a small fixed pool of workers, collecting per-task outcomes
//! without letting one failure block the rest.

pub mod attachment;
pub mod client;
pub mod drain;

pub use attachment::{
    merge_confirmed, plan_uploads, FilePlaceholder, PendingAttachment, ServerFile, UploadPayload,
};
pub use client::{HttpUploader, Uploader};
pub use drain::{drain, UploadReport, UploadTask, DEFAULT_UPLOAD_WORKERS};
