//! Session: the native `run` entry point.
//!
//! Starting a session builds the pipeline and runs it on a worker thread.
//! While one is active further starts are ignored; the running flag clears
//! when the pipeline reaches end of stream, fails, or is stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;
use tracing::{info, trace};

use crate::config::{SinkConfig, ToneConfig};
use crate::error::{log_sink_error, SinkError};
use crate::framework::NativeEntry;
use crate::pipeline::{create_pipeline, LevelReport};

const REPORT_CHANNEL_CAPACITY: usize = 256;

static SESSION: Lazy<Arc<Session>> = Lazy::new(|| Arc::new(Session::new(SinkConfig::load().tone)));

/// Process-wide session used by the JNI surface.
pub fn global() -> Arc<Session> {
    Arc::clone(&SESSION)
}

pub struct Session {
    tone: ToneConfig,
    running: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    reports: broadcast::Sender<LevelReport>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(tone: ToneConfig) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            tone,
            running: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            reports,
            worker: Mutex::new(None),
        }
    }

    /// Level reports of every run started after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<LevelReport> {
        self.reports.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn a run unless one is active. Returns whether a run was spawned.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            trace!("already running");
            return false;
        }
        self.stop.store(false, Ordering::SeqCst);
        trace!("running");

        let tone = self.tone.clone();
        let running = Arc::clone(&self.running);
        let stop = Arc::clone(&self.stop);
        let reports = self.reports.clone();

        let spawned = thread::Builder::new()
            .name("androidsink-session".to_string())
            .spawn(move || {
                let result = create_pipeline(&tone).and_then(|pipeline| pipeline.run(reports, stop));
                if let Err(err) = result {
                    log_sink_error(&err, "native_run");
                }
                trace!("stopped running");
                running.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut worker) = self.worker.lock() {
                    *worker = Some(handle);
                }
                true
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                log_sink_error(
                    &SinkError::Pipeline {
                        src: "session".to_string(),
                        error: "Could not spawn session thread".to_string(),
                        debug: Some(err.to_string()),
                    },
                    "native_run",
                );
                false
            }
        }
    }

    /// Ask the active run to finish.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Block until the most recent run has finished.
    pub fn wait(&self) {
        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                info!("session thread panicked");
            }
        }
    }
}

impl NativeEntry for Session {
    fn run(&self) {
        self.start();
    }
}
