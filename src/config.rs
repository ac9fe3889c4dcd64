//! Configuration for the sink bootstrap and the native session
//!
//! Configuration is loaded from a JSON file at runtime so diagnostic
//! verbosity, plugin sets and the test tone can be changed without
//! recompiling the library.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pipeline::Waveform;

/// Complete library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
    #[serde(default)]
    pub tone: ToneConfig,
}

/// Framework diagnostic settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Value written to `GST_DEBUG` before framework init, if any
    pub gst_debug: Option<String>,
    /// Default threshold for framework debug categories (0 = none .. 9 = memdump)
    pub default_threshold: u8,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            gst_debug: None,
            // Warning; raise for more framework output
            default_threshold: 2,
        }
    }
}

/// Statically linked plugins registered after framework init on Android
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub names: Vec<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            names: crate::plugins::DEFAULT_PLUGINS
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Test tone produced by the session source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub wave: Waveform,
    /// Frequency in Hz
    pub freq: f64,
    /// Amplitude in 0.0..=1.0
    pub volume: f64,
    pub sample_rate: u32,
    pub samples_per_buffer: usize,
    /// Number of buffers before end of stream; `None` runs until stopped
    pub num_buffers: Option<u64>,
    /// Pace the sink against the wall clock instead of running flat out
    pub sync: bool,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            wave: Waveform::Sine,
            freq: 440.0,
            volume: 0.8,
            sample_rate: 44_100,
            samples_per_buffer: 1024,
            num_buffers: None,
            sync: true,
        }
    }
}

impl SinkConfig {
    /// Load configuration from JSON file
    ///
    /// Falls back to defaults (with a warning) if the file is missing or
    /// the JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Configuration used inside the APK
    ///
    /// Assets are not reachable without an AssetManager, so Android runs
    /// on defaults.
    #[cfg(target_os = "android")]
    pub fn load() -> Self {
        log::info!("[Config] Using default configuration");
        Self::default()
    }

    /// Load configuration for non-Android platforms
    #[cfg(not(target_os = "android"))]
    pub fn load() -> Self {
        Self::load_from_file("assets/sink_config.json")
    }

    /// Diagnostic environment derived from the debug section
    pub fn debug_env(&self) -> crate::env::DebugEnv {
        crate::env::DebugEnv {
            gst_debug: self.debug.gst_debug.clone(),
        }
    }
}
