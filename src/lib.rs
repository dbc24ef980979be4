pub mod capture;
pub mod config;
pub mod upload;

pub use capture::{
    assemble, save_pcm_wav, CaptureConfig, CaptureHandle, CaptureKind, CaptureState, DeviceError,
    Fragment, FragmentSource, LevelMeter, MediaBlob, MediaDevice, MediaSession, MediaStream,
    RecorderEvent, StreamConstraints, SyntheticDevice,
};
pub use config::Config;
pub use upload::{
    drain, merge_confirmed, plan_uploads, FilePlaceholder, HttpUploader, PendingAttachment,
    ServerFile, UploadPayload, UploadReport, UploadTask, Uploader, DEFAULT_UPLOAD_WORKERS,
};
