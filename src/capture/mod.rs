//! Media capture: device acquisition, chunked recording, blob assembly
//!
//! One `MediaSession` owns one device stream and drives the recorder
//! lifecycle: `Idle -> Recording <-> Paused -> Stopped`, with `Error`
//! terminal on acquisition failure. Fragments accumulate at the slice
//! interval and are concatenated, in emission order, into a `MediaBlob`
//! when the session stops.

pub mod blob;
pub mod device;
pub mod meter;
pub mod recorder;
pub mod session;
pub mod synthetic;

pub use blob::{assemble, MediaBlob};
pub use device::{CaptureHandle, CaptureKind, DeviceError, MediaDevice, MediaStream, StreamConstraints};
pub use meter::LevelMeter;
pub use recorder::{Fragment, FragmentSource, RecorderEvent};
pub use session::{CaptureConfig, CaptureState, MediaSession};
pub use synthetic::{save_pcm_wav, StreamProbe, SyntheticDevice, SyntheticRecorder};
