use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::blob::{assemble, MediaBlob};
use super::device::{CaptureHandle, CaptureKind, DeviceError, MediaDevice, MediaStream};
use super::meter::LevelMeter;
use super::recorder::{Fragment, FragmentSource, RecorderEvent};

/// Lifecycle state of a media session
///
/// `Error` is reachable only from acquisition failure and is terminal for
/// the session; retry means opening a new session, not resuming this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Paused,
    Stopped,
    Error,
}

/// Tunables for a capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Timed slicing interval; the recorder emits a fragment at least
    /// once per interval while active
    pub slice_interval: Duration,

    /// Refresh period of the level-meter task
    pub meter_refresh: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            slice_interval: Duration::from_millis(1000),
            meter_refresh: Duration::from_millis(100),
        }
    }
}

/// One in-progress or completed recording
///
/// The session is an owned value: the stream handle, recorder, fragment
/// buffer, and assembled blob all live here, and the operations that
/// mutate them take `&mut self`. The device stream is exclusively owned
/// and is released on stop and on drop, whichever comes first.
pub struct MediaSession {
    id: Uuid,
    kind: CaptureKind,
    config: CaptureConfig,
    state: CaptureState,
    stream: Option<Box<dyn MediaStream>>,
    recorder: Option<Box<dyn FragmentSource>>,
    events: Option<tokio::sync::mpsc::Receiver<RecorderEvent>>,
    fragments: Vec<Fragment>,
    assembled: Option<MediaBlob>,
    meter: Option<LevelMeter>,
    last_error: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl MediaSession {
    pub fn new(kind: CaptureKind, config: CaptureConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            config,
            state: CaptureState::Idle,
            stream: None,
            recorder: None,
            events: None,
            fragments: Vec::new(),
            assembled: None,
            meter: None,
            last_error: None,
            started_at: None,
        }
    }

    pub fn with_defaults(kind: CaptureKind) -> Self {
        Self::new(kind, CaptureConfig::default())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Most recent device or recorder error message, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Fragments buffered but not yet assembled
    pub fn buffered_fragments(&self) -> usize {
        self.fragments.len()
    }

    /// The assembled deliverable, present once the session has stopped
    pub fn assembled(&self) -> Option<&MediaBlob> {
        self.assembled.as_ref()
    }

    /// Move the assembled blob out of the session
    pub fn take_assembled(&mut self) -> Option<MediaBlob> {
        self.assembled.take()
    }

    /// Level-meter subscription, available while capturing
    ///
    /// The channel closes when the meter task is cancelled on stop.
    pub fn levels(&self) -> Option<watch::Receiver<f32>> {
        self.meter.as_ref().map(LevelMeter::subscribe)
    }

    /// Acquire the device and begin timed slicing
    ///
    /// Honored in `Idle` (first segment) and `Stopped` (a follow-up
    /// segment whose fragments will be appended to the existing blob on
    /// the next stop). Acquisition failure classifies into the
    /// `DeviceError` taxonomy and leaves the session in `Error`.
    pub async fn start(&mut self, device: &dyn MediaDevice) -> Result<(), DeviceError> {
        match self.state {
            CaptureState::Idle | CaptureState::Stopped => {}
            other => {
                warn!("start ignored: session {} is {:?}", self.id, other);
                return Ok(());
            }
        }

        info!(
            "requesting {:?} stream from device '{}' for session {}",
            self.kind,
            device.name(),
            self.id
        );

        let handle = match device.request_stream(self.kind.constraints()).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!("device acquisition failed for session {}: {}", self.id, err);
                self.last_error = Some(err.user_message());
                self.state = CaptureState::Error;
                return Err(err);
            }
        };
        let CaptureHandle {
            mut stream,
            mut recorder,
        } = handle;

        let events = match recorder.start(self.config.slice_interval).await {
            Ok(events) => events,
            Err(err) => {
                // The tracks are already live; give them back before reporting
                stream.stop_all_tracks();
                let err = DeviceError::Unknown(format!("{err:#}"));
                self.last_error = Some(err.user_message());
                self.state = CaptureState::Error;
                return Err(err);
            }
        };

        self.stream = Some(stream);
        self.recorder = Some(recorder);
        self.events = Some(events);
        self.meter = Some(LevelMeter::start(self.config.meter_refresh));
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.state = CaptureState::Recording;

        info!("recording started: session {}", self.id);
        Ok(())
    }

    /// Suspend chunking; honored only while `Recording`
    pub async fn pause(&mut self) {
        if self.state != CaptureState::Recording {
            warn!("pause ignored: session {} is {:?}", self.id, self.state);
            return;
        }

        self.poll_events();

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.pause().await {
                warn!("recorder pause failed for session {}: {:#}", self.id, err);
                self.last_error = Some(format!("{err:#}"));
                return;
            }
        }

        self.state = CaptureState::Paused;
        info!("recording paused: session {}", self.id);
    }

    /// Resume chunking; honored only while `Paused`
    pub async fn resume(&mut self) {
        if self.state != CaptureState::Paused {
            warn!("resume ignored: session {} is {:?}", self.id, self.state);
            return;
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.resume().await {
                warn!("recorder resume failed for session {}: {:#}", self.id, err);
                self.last_error = Some(format!("{err:#}"));
                return;
            }
        }

        self.state = CaptureState::Recording;
        info!("recording resumed: session {}", self.id);
    }

    /// End the recording segment and assemble the deliverable
    ///
    /// Honored while `Recording` or `Paused`; a no-op in any other state,
    /// so duplicate stop requests are harmless. The device stream is
    /// released unconditionally, before the caller sees a result. A stop
    /// after a prior stop-and-restart appends the new fragments to the
    /// existing blob.
    pub async fn stop(&mut self) -> Option<&MediaBlob> {
        if !matches!(self.state, CaptureState::Recording | CaptureState::Paused) {
            debug!("stop ignored: session {} is {:?}", self.id, self.state);
            return self.assembled.as_ref();
        }

        // Flush first so the final partial slice reaches the channel
        let flush = match self.recorder.as_mut() {
            Some(recorder) => recorder.stop().await,
            None => Ok(()),
        };
        self.recorder = None;

        // Release the tracks before anything else is observable, and
        // cancel the meter task with them
        self.release_stream();
        self.meter = None;

        if let Err(err) = flush {
            warn!("recorder flush failed for session {}: {:#}", self.id, err);
            self.last_error = Some(format!("{err:#}"));
        }

        // Collect everything emitted before the channel closed
        if let Some(mut events) = self.events.take() {
            while let Some(event) = events.recv().await {
                self.apply_event(event);
            }
        }

        let blob = assemble(
            std::mem::take(&mut self.fragments),
            self.assembled.take(),
            self.kind.content_type(),
        );
        info!(
            "recording stopped: session {} ({} bytes assembled)",
            self.id,
            blob.len()
        );
        self.assembled = Some(blob);
        self.state = CaptureState::Stopped;

        self.assembled.as_ref()
    }

    /// Ingest any recorder events waiting on the channel
    ///
    /// Cheap and safe to call from UI ticks; `stop` performs a final
    /// blocking drain regardless.
    pub fn poll_events(&mut self) {
        let mut batch = Vec::new();
        if let Some(events) = self.events.as_mut() {
            while let Ok(event) = events.try_recv() {
                batch.push(event);
            }
        }
        for event in batch {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::Data(fragment) => {
                if let Some(meter) = &self.meter {
                    meter.record_fragment(&fragment);
                }
                self.fragments.push(fragment);
            }
            RecorderEvent::Error(message) => {
                // Mid-recording device errors do not transition the state
                // machine; the message is kept for display and recording
                // continues with whatever the recorder still emits.
                warn!("recorder error in session {}: {}", self.id, message);
                self.last_error = Some(message);
            }
        }
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            debug!("device stream released: session {}", self.id);
        }
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        // Teardown releases the device on every exit path
        if let Some(stream) = self.stream.as_mut() {
            stream.stop_all_tracks();
        }
    }
}
