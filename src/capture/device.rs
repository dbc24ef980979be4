use async_trait::async_trait;
use thiserror::Error;

use super::recorder::FragmentSource;

/// What the session captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureKind {
    /// Microphone only
    Audio,
    /// Camera only
    Video,
    /// Camera plus microphone
    Both,
}

impl CaptureKind {
    /// Stream constraints to request from the device
    pub fn constraints(&self) -> StreamConstraints {
        match self {
            CaptureKind::Audio => StreamConstraints {
                audio: true,
                video: false,
            },
            CaptureKind::Video => StreamConstraints {
                audio: false,
                video: true,
            },
            CaptureKind::Both => StreamConstraints {
                audio: true,
                video: true,
            },
        }
    }

    /// MIME type of the assembled deliverable for this capture mode
    pub fn content_type(&self) -> &'static str {
        match self {
            CaptureKind::Audio => "audio/webm",
            CaptureKind::Video | CaptureKind::Both => "video/webm",
        }
    }
}

/// Track selection for a device stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub audio: bool,
    pub video: bool,
}

/// Device acquisition failures, classified for user display
///
/// Acquisition failure is fatal to the capture attempt but not to the
/// application; the user retries by opening a new session.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("recording permission was denied")]
    PermissionDenied,

    #[error("no capture device was found")]
    NotFound,

    #[error("device acquisition was aborted")]
    Aborted,

    #[error("could not open capture device: {0}")]
    Unknown(String),
}

impl DeviceError {
    /// Status message shown inline next to the recorder controls
    pub fn user_message(&self) -> String {
        match self {
            DeviceError::PermissionDenied => {
                "Recording permission was denied. Allow access to the device and try again."
                    .to_string()
            }
            DeviceError::NotFound => {
                "No microphone or camera was found on this device.".to_string()
            }
            DeviceError::Aborted => {
                "The device request was aborted before a stream was acquired.".to_string()
            }
            DeviceError::Unknown(detail) => {
                format!("The capture device could not be opened: {}", detail)
            }
        }
    }
}

/// Live handle to a device's audio/video tracks
///
/// Exclusively owned by one `MediaSession`; stopping the tracks is the
/// release primitive and must be safe to call more than once.
pub trait MediaStream: Send {
    /// Stop every live track, releasing the device. Idempotent.
    fn stop_all_tracks(&mut self);

    /// Whether any track is still live
    fn is_live(&self) -> bool;
}

/// A live stream paired with the recorder bound to it
///
/// A recorder is always constructed from a stream, never free-standing,
/// so acquisition hands both back together.
pub struct CaptureHandle {
    pub stream: Box<dyn MediaStream>,
    pub recorder: Box<dyn FragmentSource>,
}

/// Device capture backend
///
/// Implementations:
/// - Synthetic: deterministic in-process source (demos, tests, batch use)
/// - Platform backends plug in behind the same trait
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Request a live stream matching the constraints
    ///
    /// The only operation with an externally observable side effect
    /// (permission prompt, active-capture indicator).
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<CaptureHandle, DeviceError>;

    /// Get device name for logging
    fn name(&self) -> &str;
}
