//! Built-in pipeline: tone source thread -> buffer pool -> level-metering sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use super::buffer_pool::{BufferPool, SinkChannels, SourceChannels, DEFAULT_BUFFER_COUNT};
use super::{rms_s16, LevelReport, SinkPipeline, ToneSource};
use crate::config::ToneConfig;
use crate::error::SinkError;
use crate::framework;

const IDLE_WAIT: Duration = Duration::from_millis(1);

pub struct BuiltinPipeline {
    tone: ToneConfig,
}

impl BuiltinPipeline {
    /// Fails with `NotInitialized` before framework init, mirroring element
    /// factories that are empty until then.
    pub fn new(tone: ToneConfig) -> Result<Self, SinkError> {
        if !framework::is_initialized() {
            return Err(SinkError::NotInitialized);
        }
        // Validate properties up front so errors surface at build time
        ToneSource::new(tone.clone())?;
        trace!("pipeline created");
        Ok(Self { tone })
    }
}

impl SinkPipeline for BuiltinPipeline {
    fn run(
        &self,
        reports: broadcast::Sender<LevelReport>,
        stop: Arc<AtomicBool>,
    ) -> Result<(), SinkError> {
        let source = ToneSource::new(self.tone.clone())?;
        let (source_channels, sink_channels) =
            BufferPool::new(DEFAULT_BUFFER_COUNT, self.tone.samples_per_buffer);

        let source_stop = Arc::clone(&stop);
        let source_thread = thread::Builder::new()
            .name("androidsink-src".to_string())
            .spawn(move || source_loop(source, source_channels, source_stop))
            .map_err(|err| SinkError::Pipeline {
                src: "tonesrc".to_string(),
                error: "Could not start streaming thread".to_string(),
                debug: Some(err.to_string()),
            })?;

        trace!("entering main loop");
        let produced = sink_loop(&self.tone, sink_channels, &reports, &stop);
        trace!("leaving main loop");

        // Unblocks the source if the sink stopped first
        stop.store(true, Ordering::SeqCst);
        let _ = source_thread.join();

        info!("end of stream after {} buffers", produced);
        Ok(())
    }
}

fn source_loop(mut source: ToneSource, mut channels: SourceChannels, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        match channels.pool_consumer.pop() {
            Ok(mut buffer) => {
                if !source.fill(&mut buffer) {
                    break;
                }
                if channels.data_producer.push(buffer).is_err() {
                    break;
                }
            }
            Err(_) => thread::sleep(IDLE_WAIT),
        }
    }
    debug!("source finished after {} buffers", source.produced());
    // Dropping the producer marks end of stream for the sink
}

fn sink_loop(
    tone: &ToneConfig,
    mut channels: SinkChannels,
    reports: &broadcast::Sender<LevelReport>,
    stop: &AtomicBool,
) -> u64 {
    let started = Instant::now();
    let mut index: u64 = 0;

    while !stop.load(Ordering::SeqCst) {
        let buffer = match channels.data_consumer.pop() {
            Ok(buffer) => buffer,
            Err(_) => {
                if channels.data_consumer.is_abandoned() && channels.data_consumer.is_empty() {
                    break;
                }
                thread::sleep(IDLE_WAIT);
                continue;
            }
        };

        if tone.sync {
            let due = started + running_time(index, tone);
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }

        if let Some(rms) = rms_s16(&buffer) {
            info!("rms: {}", rms);
            // No subscribers is fine
            let _ = reports.send(LevelReport {
                buffer_index: index,
                samples: buffer.len(),
                rms,
            });
        }

        let _ = channels.pool_producer.push(buffer);
        index += 1;
    }

    index
}

/// Stream time at which buffer `index` starts.
fn running_time(index: u64, tone: &ToneConfig) -> Duration {
    let samples = index * tone.samples_per_buffer as u64;
    Duration::from_secs_f64(samples as f64 / f64::from(tone.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{BuiltinFramework, MediaFramework};
    use crate::pipeline::Waveform;

    fn tone(num_buffers: Option<u64>) -> ToneConfig {
        ToneConfig {
            wave: Waveform::Sine,
            freq: 1000.0,
            volume: 0.5,
            sample_rate: 8000,
            samples_per_buffer: 80,
            num_buffers,
            sync: false,
        }
    }

    fn init_framework() {
        BuiltinFramework::default().init(&()).unwrap();
    }

    #[test]
    fn test_running_time() {
        let config = tone(None);
        assert_eq!(running_time(0, &config), Duration::ZERO);
        assert_eq!(running_time(100, &config), Duration::from_secs(1));
    }

    #[test]
    fn test_reports_one_level_per_buffer_then_eos() {
        init_framework();
        let pipeline = BuiltinPipeline::new(tone(Some(5))).unwrap();
        let (tx, mut rx) = broadcast::channel(64);

        pipeline.run(tx, Arc::new(AtomicBool::new(false))).unwrap();

        let mut reports = Vec::new();
        while let Ok(report) = rx.try_recv() {
            reports.push(report);
        }
        assert_eq!(reports.len(), 5);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.buffer_index, i as u64);
            assert_eq!(report.samples, 80);
            assert!((report.rms - 0.5 / 2f64.sqrt()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_stop_flag_ends_unbounded_stream() {
        init_framework();
        let pipeline = BuiltinPipeline::new(tone(None)).unwrap();
        let (tx, _rx) = broadcast::channel(4);
        let stop = Arc::new(AtomicBool::new(false));

        let stopper = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stopper.store(true, Ordering::SeqCst);
        });

        pipeline.run(tx, stop).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_invalid_tone_rejected_at_build() {
        init_framework();
        let mut config = tone(Some(1));
        config.samples_per_buffer = 0;
        assert!(BuiltinPipeline::new(config).is_err());
    }
}
