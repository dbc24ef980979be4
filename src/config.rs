use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::capture::CaptureConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    pub slice_interval_ms: u64,
    pub meter_refresh_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct UploadSettings {
    pub base_url: String,
    pub workers: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session tunables derived from the capture section
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            slice_interval: Duration::from_millis(self.capture.slice_interval_ms),
            meter_refresh: Duration::from_millis(self.capture.meter_refresh_ms),
        }
    }
}
