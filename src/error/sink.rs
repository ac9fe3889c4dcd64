// Sink error types and constants

use crate::error::ErrorCode;
use std::fmt;
use tracing::error;

/// Sink error code constants shared with the Java side
///
/// Error code range: 3001-3008
pub struct SinkErrorCodes {}

impl SinkErrorCodes {
    /// Framework initialization entry point reported a failure
    pub const FRAMEWORK_INIT: i32 = 3001;

    /// Pipeline requested before the framework was initialized
    pub const NOT_INITIALIZED: i32 = 3002;

    /// Diagnostic environment variable could not be written
    pub const ENV_VAR: i32 = 3003;

    /// Pipeline element could not be created
    pub const MISSING_ELEMENT: i32 = 3004;

    /// Pipeline reported an error while running
    pub const PIPELINE: i32 = 3005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 3006;

    /// JNI call failed
    pub const JNI: i32 = 3007;

    /// Plugin library could not be loaded or registered
    pub const PLUGIN: i32 = 3008;
}

/// Log a sink error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_sink_error(err: &SinkError, context: &str) {
    error!(
        "Sink error in {}: code={}, component=AndroidSink, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Sink-related errors
///
/// These errors cover framework bootstrap, diagnostic environment setup,
/// pipeline construction and the JNI surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// Framework initialization failed; `reason` is shown to the user verbatim
    FrameworkInit { reason: String },

    /// Framework was not initialized before the pipeline was built
    NotInitialized,

    /// Environment variable could not be written
    EnvVar { key: String, reason: String },

    /// Pipeline element is not available
    MissingElement { name: String },

    /// Pipeline posted an error message
    Pipeline {
        src: String,
        error: String,
        debug: Option<String>,
    },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// JNI call failed
    Jni { reason: String },

    /// Plugin library failed to open or register
    Plugin { name: String, reason: String },
}

impl ErrorCode for SinkError {
    fn code(&self) -> i32 {
        match self {
            SinkError::FrameworkInit { .. } => SinkErrorCodes::FRAMEWORK_INIT,
            SinkError::NotInitialized => SinkErrorCodes::NOT_INITIALIZED,
            SinkError::EnvVar { .. } => SinkErrorCodes::ENV_VAR,
            SinkError::MissingElement { .. } => SinkErrorCodes::MISSING_ELEMENT,
            SinkError::Pipeline { .. } => SinkErrorCodes::PIPELINE,
            SinkError::LockPoisoned { .. } => SinkErrorCodes::LOCK_POISONED,
            SinkError::Jni { .. } => SinkErrorCodes::JNI,
            SinkError::Plugin { .. } => SinkErrorCodes::PLUGIN,
        }
    }

    fn message(&self) -> String {
        match self {
            SinkError::FrameworkInit { reason } => reason.clone(),
            SinkError::NotInitialized => {
                "Framework not initialized. Obtain a sink instance first.".to_string()
            }
            SinkError::EnvVar { key, reason } => {
                format!("Could not set {}: {}", key, reason)
            }
            SinkError::MissingElement { name } => format!("Missing element {}", name),
            SinkError::Pipeline { src, error, debug } => {
                format!(
                    "Received error from {}: {} (debug: {:?})",
                    src, error, debug
                )
            }
            SinkError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            SinkError::Jni { reason } => format!("JNI call failed: {}", reason),
            SinkError::Plugin { name, reason } => {
                format!("Plugin {} unavailable: {}", name, reason)
            }
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SinkError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SinkError {}

#[cfg(target_os = "android")]
impl From<jni::errors::Error> for SinkError {
    fn from(err: jni::errors::Error) -> Self {
        SinkError::Jni {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_codes() {
        assert_eq!(
            SinkError::FrameworkInit {
                reason: "x".to_string()
            }
            .code(),
            SinkErrorCodes::FRAMEWORK_INIT
        );
        assert_eq!(
            SinkError::NotInitialized.code(),
            SinkErrorCodes::NOT_INITIALIZED
        );
        assert_eq!(
            SinkError::MissingElement {
                name: "audiotestsrc".to_string()
            }
            .code(),
            3004
        );
        assert_eq!(
            SinkError::Plugin {
                name: "app".to_string(),
                reason: "gone".to_string()
            }
            .code(),
            SinkErrorCodes::PLUGIN
        );
    }

    #[test]
    fn test_framework_init_message_is_verbatim() {
        let err = SinkError::FrameworkInit {
            reason: "GStreamer initialization failed".to_string(),
        };
        assert_eq!(err.message(), "GStreamer initialization failed");
    }

    #[test]
    fn test_pipeline_message_includes_source_and_debug() {
        let err = SinkError::Pipeline {
            src: "/GstPipeline:pipeline0/GstAudioTestSrc:src".to_string(),
            error: "Internal data stream error.".to_string(),
            debug: Some("not-negotiated".to_string()),
        };
        let message = err.message();
        assert!(message.contains("GstAudioTestSrc:src"));
        assert!(message.contains("not-negotiated"));
    }

    #[test]
    fn test_display_carries_code() {
        let err = SinkError::LockPoisoned {
            component: "holder".to_string(),
        };
        let shown = err.to_string();
        assert!(shown.contains("code 3006"));
        assert!(shown.contains("holder"));
    }
}
