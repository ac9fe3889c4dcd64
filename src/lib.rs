// Android Sink - native side of the androidsink example application
// Framework bootstrap, singleton sink holder and the level-metering session

// Module declarations
pub mod config;
pub mod env;
pub mod error;
pub mod framework;
pub mod holder;
pub mod pipeline;
pub mod plugins;
pub mod session;

#[cfg(target_os = "android")]
pub mod android;

// Re-exports for convenience
pub use holder::{AndroidSink, SinkHolder};

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Initialize logging once per process
///
/// Android logs to logcat under the `AndroidSink` tag; other platforms log
/// to stderr filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    LOGGING.call_once(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "android")] {
                use tracing_subscriber::prelude::*;

                if let Ok(layer) = tracing_android::layer("AndroidSink") {
                    let _ = tracing_subscriber::registry()
                        .with(tracing_subscriber::filter::LevelFilter::DEBUG)
                        .with(layer)
                        .try_init();
                }

                std::panic::set_hook(Box::new(|info| {
                    let location = info
                        .location()
                        .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::error!("PANIC at {}: {}", location, info);
                }));
            } else {
                let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
                let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
