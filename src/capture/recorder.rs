use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// One timed slice of recorded media
///
/// Fragments are appended in emission order; that order is the
/// concatenation order for final assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Emission index within the current recording segment (0-based)
    pub index: u64,
    /// Raw encoded bytes for this slice
    pub data: Vec<u8>,
}

impl Fragment {
    pub fn new(index: u64, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Event emitted by a recorder while active
#[derive(Debug, Clone)]
pub enum RecorderEvent {
    /// A timed slice of media data
    Data(Fragment),
    /// A mid-recording device error report
    ///
    /// Reported to the session but does not terminate the recording;
    /// the session keeps the message for display and carries on.
    Error(String),
}

/// Chunked recorder primitive
///
/// Bound to a live stream at construction; emits one fragment per slice
/// interval while active. `stop` flushes any buffered partial slice and
/// then the event channel closes; draining the receiver to `None` after
/// `stop` returns yields every emitted fragment.
#[async_trait]
pub trait FragmentSource: Send {
    /// Begin timed slicing, emitting a fragment at least once per interval
    ///
    /// Returns the channel on which `RecorderEvent`s arrive.
    async fn start(&mut self, slice: Duration) -> Result<mpsc::Receiver<RecorderEvent>>;

    /// Suspend fragment emission without losing buffered data
    async fn pause(&mut self) -> Result<()>;

    /// Resume fragment emission after a pause
    async fn resume(&mut self) -> Result<()>;

    /// Flush the buffered partial slice and end the recording
    async fn stop(&mut self) -> Result<()>;

    /// Check if the recorder is currently active (recording or paused)
    fn is_active(&self) -> bool;

    /// Get recorder name for logging
    fn name(&self) -> &str;
}
