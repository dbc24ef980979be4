use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::recorder::Fragment;

/// Periodic level publisher for the recording UI
///
/// Started when a session begins capturing and cancelled on stop,
/// teardown, or drop; the task never outlives its session. Subscribers
/// observe the channel closing as the cancellation signal.
pub struct LevelMeter {
    latest: Arc<AtomicU32>,
    levels: watch::Receiver<f32>,
    task: JoinHandle<()>,
}

impl LevelMeter {
    /// Spawn the periodic publisher task
    pub fn start(refresh: Duration) -> Self {
        let latest = Arc::new(AtomicU32::new(0f32.to_bits()));
        let (tx, rx) = watch::channel(0.0f32);

        let probe = Arc::clone(&latest);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh);
            loop {
                ticker.tick().await;
                let level = f32::from_bits(probe.load(Ordering::Relaxed));
                if tx.send(level).is_err() {
                    break;
                }
            }
        });

        Self {
            latest,
            levels: rx,
            task,
        }
    }

    /// Record the peak level of a freshly drained fragment
    pub fn record_fragment(&self, fragment: &Fragment) {
        self.latest
            .store(peak_level(&fragment.data).to_bits(), Ordering::Relaxed);
    }

    /// Get a receiver of published levels (0.0 to 1.0)
    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.levels.clone()
    }
}

impl Drop for LevelMeter {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Peak amplitude of a fragment, normalized to 0.0..=1.0
///
/// Fragment bytes are read as interleaved little-endian 16-bit samples;
/// a trailing odd byte is ignored.
fn peak_level(data: &[u8]) -> f32 {
    data.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]).unsigned_abs())
        .max()
        .map(|peak| peak as f32 / i16::MAX as f32)
        .unwrap_or(0.0)
}
