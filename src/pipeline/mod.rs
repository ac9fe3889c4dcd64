//! The native session pipeline: a test-tone source feeding a level-metering sink.
//!
//! Two implementations share the [`SinkPipeline`] seam: the built-in one
//! (tone generator, lock-free buffer pool, RMS sink) and, with the
//! `gstreamer` feature, an `audiotestsrc ! appsink` GStreamer pipeline.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::ToneConfig;
use crate::error::SinkError;

pub mod buffer_pool;
pub mod builtin;
#[cfg(feature = "gstreamer")]
pub mod gstreamer;
pub mod level;
pub mod tone;

pub use builtin::BuiltinPipeline;
pub use level::{rms_s16, samples_from_bytes, LevelReport};
pub use tone::ToneSource;

/// Test tone waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Silence,
    WhiteNoise,
}

impl std::str::FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "saw" => Ok(Waveform::Saw),
            "silence" => Ok(Waveform::Silence),
            "white-noise" => Ok(Waveform::WhiteNoise),
            other => Err(format!("unknown waveform '{}'", other)),
        }
    }
}

/// A runnable source-to-sink pipeline.
///
/// `run` blocks until end of stream, an error, or `stop` becoming true.
/// Each buffer that reaches the sink produces one [`LevelReport`].
pub trait SinkPipeline: Send {
    fn run(
        &self,
        reports: broadcast::Sender<LevelReport>,
        stop: Arc<AtomicBool>,
    ) -> Result<(), SinkError>;
}

/// Build the pipeline for the enabled framework.
pub fn create_pipeline(tone: &ToneConfig) -> Result<Box<dyn SinkPipeline>, SinkError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "gstreamer")] {
            Ok(Box::new(gstreamer::GstPipeline::new(tone)?))
        } else {
            Ok(Box::new(BuiltinPipeline::new(tone.clone())?))
        }
    }
}
