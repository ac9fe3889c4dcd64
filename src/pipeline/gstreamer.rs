//! `audiotestsrc ! appsink` on GStreamer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use gst::prelude::*;
use tokio::sync::broadcast;
use tracing::info;

use super::{rms_s16, samples_from_bytes, LevelReport, SinkPipeline, Waveform};
use crate::config::ToneConfig;
use crate::error::SinkError;
use crate::framework::{self, gstreamer::CAT};

const BUS_POLL: gst::ClockTime = gst::ClockTime::from_mseconds(100);

pub struct GstPipeline {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
}

fn wave_nick(wave: Waveform) -> &'static str {
    match wave {
        Waveform::Sine => "sine",
        Waveform::Square => "square",
        Waveform::Saw => "saw",
        Waveform::Silence => "silence",
        Waveform::WhiteNoise => "white-noise",
    }
}

/// `num-buffers` value for audiotestsrc; -1 runs until stopped.
fn num_buffers_property(num_buffers: Option<u64>) -> i32 {
    num_buffers.map_or(-1, |n| i32::try_from(n).unwrap_or(i32::MAX))
}

fn samples_per_buffer_property(samples: usize) -> i32 {
    i32::try_from(samples).unwrap_or(i32::MAX)
}

fn pipeline_error(src: &str, error: impl ToString) -> SinkError {
    SinkError::Pipeline {
        src: src.to_string(),
        error: error.to_string(),
        debug: None,
    }
}

impl GstPipeline {
    pub fn new(tone: &ToneConfig) -> Result<Self, SinkError> {
        if !framework::is_initialized() {
            return Err(SinkError::NotInitialized);
        }

        gst::trace!(CAT, "creating pipeline");
        let pipeline = gst::Pipeline::new();

        gst::trace!(CAT, "creating audiotestsrc");
        let src = gst::ElementFactory::make("audiotestsrc")
            .property_from_str("wave", wave_nick(tone.wave))
            .property("freq", tone.freq)
            .property("volume", tone.volume)
            .property(
                "samplesperbuffer",
                samples_per_buffer_property(tone.samples_per_buffer),
            )
            .property("num-buffers", num_buffers_property(tone.num_buffers))
            .build()
            .map_err(|_| SinkError::MissingElement {
                name: "audiotestsrc".to_string(),
            })?;

        gst::trace!(CAT, "creating appsink");
        let sink = gst::ElementFactory::make("appsink")
            .build()
            .map_err(|_| SinkError::MissingElement {
                name: "appsink".to_string(),
            })?;

        pipeline
            .add_many([&src, &sink])
            .map_err(|err| pipeline_error("pipeline", err))?;
        src.link(&sink)
            .map_err(|err| pipeline_error("pipeline", err))?;

        let appsink = sink
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| SinkError::MissingElement {
                name: "appsink".to_string(),
            })?;

        // Negotiated while prerolling, so this can follow linking
        appsink.set_caps(Some(
            &gst::Caps::builder("audio/x-raw")
                .field("format", gst_audio::AUDIO_FORMAT_S16.to_str())
                .field("layout", "interleaved")
                .field("channels", 1i32)
                .field("rate", tone.sample_rate as i32)
                .build(),
        ));
        appsink.set_property("sync", tone.sync);

        gst::trace!(CAT, "pipeline created");
        Ok(Self { pipeline, appsink })
    }

    fn install_callbacks(&self, reports: broadcast::Sender<LevelReport>) {
        let index = Arc::new(AtomicU64::new(0));
        self.appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or_else(|| {
                        gst::element_error!(
                            appsink,
                            gst::ResourceError::Failed,
                            ("Failed to get buffer from appsink")
                        );
                        gst::FlowError::Error
                    })?;

                    let map = buffer.map_readable().map_err(|_| {
                        gst::element_error!(
                            appsink,
                            gst::ResourceError::Failed,
                            ("Failed to map buffer readable")
                        );
                        gst::FlowError::Error
                    })?;

                    let samples = samples_from_bytes(map.as_slice()).map_err(|err| {
                        gst::element_error!(
                            appsink,
                            gst::ResourceError::Failed,
                            ("Failed to interprete buffer as S16 PCM"),
                            ["{}", err]
                        );
                        gst::FlowError::Error
                    })?;

                    if let Some(rms) = rms_s16(&samples) {
                        info!("rms: {}", rms);
                        let _ = reports.send(LevelReport {
                            buffer_index: index.fetch_add(1, Ordering::SeqCst),
                            samples: samples.len(),
                            rms,
                        });
                    }

                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
    }

    fn bus_loop(&self, stop: &AtomicBool) -> Result<(), SinkError> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| pipeline_error("pipeline", "Pipeline without bus"))?;

        gst::trace!(CAT, "entering main loop");
        while !stop.load(Ordering::SeqCst) {
            let Some(msg) = bus.timed_pop(BUS_POLL) else {
                continue;
            };

            use gst::MessageView;
            match msg.view() {
                MessageView::Eos(..) => break,
                MessageView::Error(err) => {
                    return Err(SinkError::Pipeline {
                        src: msg
                            .src()
                            .map(|s| s.path_string().to_string())
                            .unwrap_or_else(|| String::from("None")),
                        error: err.error().to_string(),
                        debug: err.debug().map(|d| d.to_string()),
                    });
                }
                _ => (),
            }
        }
        gst::trace!(CAT, "leaving main loop");
        Ok(())
    }
}

impl SinkPipeline for GstPipeline {
    fn run(
        &self,
        reports: broadcast::Sender<LevelReport>,
        stop: Arc<AtomicBool>,
    ) -> Result<(), SinkError> {
        self.install_callbacks(reports);

        gst::trace!(CAT, "set pipeline state to playing");
        self.pipeline
            .set_state(gst::State::Playing)
            .map_err(|err| pipeline_error("pipeline", err))?;

        let result = self.bus_loop(&stop);

        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|err| pipeline_error("pipeline", err))?;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_buffers_property() {
        assert_eq!(num_buffers_property(None), -1);
        assert_eq!(num_buffers_property(Some(100)), 100);
        assert_eq!(num_buffers_property(Some(u64::MAX)), i32::MAX);
        assert_eq!(num_buffers_property(Some(1 << 31)), i32::MAX);
    }

    #[test]
    fn test_samples_per_buffer_property_saturates() {
        assert_eq!(samples_per_buffer_property(1024), 1024);
        assert_eq!(samples_per_buffer_property(usize::MAX), i32::MAX);
    }
}
