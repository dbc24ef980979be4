// Example: Record a clip from the synthetic capture device
//
// This example demonstrates the capture pipeline:
// 1. Acquire a stream from the synthetic device
// 2. Record timed fragments, watching the level meter
// 3. Pause and resume mid-recording (no data loss)
// 4. Stop, assemble the blob, and save it as a WAV file
//
// Usage: cargo run --example record_clip -- --duration 6

use anyhow::Result;
use clap::Parser;
use journal_capture::{save_pcm_wav, CaptureConfig, CaptureKind, MediaSession, SyntheticDevice};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "record_clip")]
#[command(about = "Record an audio clip with a pause in the middle")]
struct Args {
    /// Total active recording time in seconds
    #[arg(short, long, default_value = "6")]
    duration: u64,

    /// Seconds to stay paused mid-recording
    #[arg(short, long, default_value = "2")]
    pause: u64,

    /// Output directory
    #[arg(short, long, default_value = "~/.journal/clips")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    info!("Journal Capture - Recording Example");
    info!("Recording for {} seconds with a {} second pause", args.duration, args.pause);

    // Expand home directory
    let output_dir = shellexpand::tilde(&args.output_dir);
    let output_dir = PathBuf::from(output_dir.as_ref());
    std::fs::create_dir_all(&output_dir)?;

    let sample_rate = 16000;
    let device = SyntheticDevice::new(sample_rate);
    let mut session = MediaSession::new(CaptureKind::Audio, CaptureConfig::default());

    // Acquire the device and start slicing
    session.start(&device).await?;

    // Watch the level meter while the first half records
    let levels = session.levels();
    let first_half = args.duration / 2;
    for _ in 0..first_half {
        sleep(Duration::from_secs(1)).await;
        session.poll_events();
        if let Some(levels) = &levels {
            info!("level: {:.2}", *levels.borrow());
        }
    }

    // Pause; the tone's phase position is frozen, nothing is lost
    session.pause().await;
    info!("Paused...");
    sleep(Duration::from_secs(args.pause)).await;
    session.resume().await;
    info!("Resumed");

    sleep(Duration::from_secs(args.duration - first_half)).await;

    // Stop releases the device and assembles the fragments
    let assembled_len = session.stop().await.map(|blob| blob.len()).unwrap_or(0);
    info!("Assembled {} bytes", assembled_len);

    let clip_path = output_dir.join("clip.wav");
    if let Some(blob) = session.take_assembled() {
        save_pcm_wav(&blob, sample_rate, &clip_path)?;
    }

    info!("Clip saved to {}", clip_path.display());

    Ok(())
}
