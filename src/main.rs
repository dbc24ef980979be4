use anyhow::Result;
use clap::Parser;
use journal_capture::{save_pcm_wav, CaptureKind, Config, MediaSession, SyntheticDevice};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

#[derive(Parser)]
#[command(name = "journal-capture")]
#[command(about = "Record a journal attachment clip from the synthetic capture device")]
struct Args {
    /// Config file path (without extension)
    #[arg(short, long, default_value = "config/journal-capture")]
    config: String,

    /// Duration to record in seconds
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Capture mode: audio, video, or both
    #[arg(short, long, default_value = "audio")]
    kind: String,

    /// Output file for the assembled clip
    #[arg(short, long, default_value = "clip.wav")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "Upload endpoint: {} ({} workers)",
        cfg.upload.base_url, cfg.upload.workers
    );

    let kind = parse_kind(&args.kind)?;
    let sample_rate = 16000;

    let device = SyntheticDevice::new(sample_rate);
    let mut session = MediaSession::new(kind, cfg.capture_config());

    session.start(&device).await?;
    info!("Recording {:?} for {} seconds...", kind, args.duration);

    sleep(Duration::from_secs(args.duration)).await;

    let assembled_len = session.stop().await.map(|blob| blob.len()).unwrap_or(0);
    info!(
        "Assembled {} bytes ({})",
        assembled_len,
        kind.content_type()
    );

    if let Some(blob) = session.take_assembled() {
        match kind {
            CaptureKind::Audio => save_pcm_wav(&blob, sample_rate, &args.output)?,
            CaptureKind::Video | CaptureKind::Both => {
                std::fs::write(&args.output, &blob.data)?;
                info!("Saved {} bytes to {}", blob.len(), args.output.display());
            }
        }
    }

    Ok(())
}

fn parse_kind(kind: &str) -> Result<CaptureKind> {
    match kind {
        "audio" => Ok(CaptureKind::Audio),
        "video" => Ok(CaptureKind::Video),
        "both" => Ok(CaptureKind::Both),
        other => anyhow::bail!(
            "unknown capture kind: {} (expected audio, video, or both)",
            other
        ),
    }
}
