use anyhow::{Context, Result};
use async_trait::async_trait;
use std::f32::consts::TAU;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::blob::MediaBlob;
use super::device::{CaptureHandle, DeviceError, MediaDevice, MediaStream, StreamConstraints};
use super::recorder::{Fragment, FragmentSource, RecorderEvent};

/// Bytes emitted per slice by the synthetic video generator
const PATTERN_BYTES_PER_SLICE: usize = 4096;

/// Test tone frequency in Hz
const TONE_FREQ: f32 = 440.0;

/// In-process capture device emitting deterministic media
///
/// Audio streams carry a phase-continuous sine tone as 16-bit mono PCM;
/// video streams carry a rolling byte pattern. Fragment content is a pure
/// function of how many slices have been consumed, so captures are
/// reproducible and pause/resume loses nothing.
pub struct SyntheticDevice {
    sample_rate: u32,
    fail_with: Option<DeviceError>,
    last_stream: Mutex<Option<StreamProbe>>,
}

impl SyntheticDevice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            fail_with: None,
            last_stream: Mutex::new(None),
        }
    }

    /// A device whose acquisition always fails with the given error
    pub fn failing(err: DeviceError) -> Self {
        Self {
            sample_rate: 16000,
            fail_with: Some(err),
            last_stream: Mutex::new(None),
        }
    }

    /// Probe for the most recently acquired stream's track state
    pub fn last_stream(&self) -> Option<StreamProbe> {
        self.last_stream
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl MediaDevice for SyntheticDevice {
    async fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<CaptureHandle, DeviceError> {
        if let Some(err) = &self.fail_with {
            warn!("synthetic device refusing stream: {}", err);
            return Err(err.clone());
        }

        let live = Arc::new(AtomicBool::new(true));
        let releases = Arc::new(AtomicUsize::new(0));

        let probe = StreamProbe {
            live: Arc::clone(&live),
            releases: Arc::clone(&releases),
        };
        if let Ok(mut guard) = self.last_stream.lock() {
            *guard = Some(probe);
        }

        info!(
            "synthetic stream acquired (audio={}, video={})",
            constraints.audio, constraints.video
        );

        Ok(CaptureHandle {
            stream: Box::new(SyntheticStream { live, releases }),
            recorder: Box::new(SyntheticRecorder::new(constraints, self.sample_rate)),
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Observer handle for a synthetic stream's tracks
#[derive(Clone)]
pub struct StreamProbe {
    live: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl StreamProbe {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// How many times the tracks transitioned from live to stopped
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

struct SyntheticStream {
    live: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl MediaStream for SyntheticStream {
    fn stop_all_tracks(&mut self) {
        // Only the live -> stopped edge counts as a release
        if self.live.swap(false, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Deterministic fragment generator driven by a tokio interval
pub struct SyntheticRecorder {
    constraints: StreamConstraints,
    sample_rate: u32,
    active: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyntheticRecorder {
    pub fn new(constraints: StreamConstraints, sample_rate: u32) -> Self {
        Self {
            constraints,
            sample_rate,
            active: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            task: None,
        }
    }
}

#[async_trait]
impl FragmentSource for SyntheticRecorder {
    async fn start(&mut self, slice: Duration) -> Result<mpsc::Receiver<RecorderEvent>> {
        if self.active.load(Ordering::SeqCst) {
            anyhow::bail!("recorder is already active");
        }

        let (tx, rx) = mpsc::channel(256);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        self.active.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);

        let active = Arc::clone(&self.active);
        let paused = Arc::clone(&self.paused);
        let mut clock = if self.constraints.video {
            SliceClock::pattern()
        } else {
            SliceClock::tone(self.sample_rate, slice)
        };

        let task = tokio::spawn(async move {
            // First fragment lands one full interval after start
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + slice, slice);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            let mut index = 0u64;
            let mut last_emit = tokio::time::Instant::now();

            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        // Flush the partial slice accumulated since the last emission
                        if !paused.load(Ordering::SeqCst) {
                            let elapsed = last_emit.elapsed().min(slice);
                            let data = clock.partial_slice(slice, elapsed);
                            if !data.is_empty() {
                                let _ = tx.send(RecorderEvent::Data(Fragment::new(index, data))).await;
                            }
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        last_emit = tokio::time::Instant::now();
                        if paused.load(Ordering::SeqCst) {
                            continue;
                        }
                        let fragment = Fragment::new(index, clock.full_slice());
                        index += 1;
                        if tx.send(RecorderEvent::Data(fragment)).await.is_err() {
                            // Session went away; nothing left to record for
                            break;
                        }
                    }
                }
            }

            active.store(false, Ordering::SeqCst);
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);

        Ok(rx)
    }

    async fn pause(&mut self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.context("recorder task panicked")?;
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "synthetic-recorder"
    }
}

/// Fragment payload generator; content depends only on consumed position
enum SliceClock {
    Tone(ToneClock),
    Pattern(PatternClock),
}

impl SliceClock {
    fn tone(sample_rate: u32, slice: Duration) -> Self {
        let samples_per_slice =
            (sample_rate as f64 * slice.as_secs_f64()).round() as usize;
        SliceClock::Tone(ToneClock {
            sample_rate,
            samples_per_slice,
            position: 0,
        })
    }

    fn pattern() -> Self {
        SliceClock::Pattern(PatternClock { position: 0 })
    }

    fn full_slice(&mut self) -> Vec<u8> {
        match self {
            SliceClock::Tone(clock) => {
                let samples = clock.samples_per_slice;
                clock.render(samples)
            }
            SliceClock::Pattern(clock) => clock.render(PATTERN_BYTES_PER_SLICE),
        }
    }

    fn partial_slice(&mut self, slice: Duration, elapsed: Duration) -> Vec<u8> {
        let fraction = if slice.is_zero() {
            0.0
        } else {
            elapsed.as_secs_f64() / slice.as_secs_f64()
        };
        match self {
            SliceClock::Tone(clock) => {
                let samples = (clock.samples_per_slice as f64 * fraction) as usize;
                clock.render(samples)
            }
            SliceClock::Pattern(clock) => {
                clock.render((PATTERN_BYTES_PER_SLICE as f64 * fraction) as usize)
            }
        }
    }
}

struct ToneClock {
    sample_rate: u32,
    samples_per_slice: usize,
    position: u64,
}

impl ToneClock {
    fn render(&mut self, samples: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(samples * 2);
        for i in 0..samples {
            let t = (self.position + i as u64) as f32 / self.sample_rate as f32;
            let sample = (f32::sin(TAU * TONE_FREQ * t) * 0.6 * i16::MAX as f32) as i16;
            data.extend_from_slice(&sample.to_le_bytes());
        }
        self.position += samples as u64;
        data
    }
}

struct PatternClock {
    position: u64,
}

impl PatternClock {
    fn render(&mut self, bytes: usize) -> Vec<u8> {
        let data = (0..bytes)
            .map(|i| ((self.position + i as u64) % 251) as u8)
            .collect();
        self.position += bytes as u64;
        data
    }
}

/// Write an assembled PCM capture to disk as a WAV file
///
/// Only meaningful for blobs produced by the synthetic audio source
/// (16-bit mono PCM payload).
pub fn save_pcm_wav(blob: &MediaBlob, sample_rate: u32, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    for pair in blob.data.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    info!(
        "Saved {} bytes of PCM to {} ({}Hz mono)",
        blob.len(),
        path.display(),
        sample_rate
    );

    Ok(())
}
