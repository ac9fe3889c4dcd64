//! Seams to the collaborators the sink bootstrap only invokes.
//!
//! The multimedia framework, the user-facing notification surface and the
//! native entry point are all external to the holder. Each is a trait so the
//! holder can be driven by the real platform on Android and by test doubles
//! everywhere else.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SinkError;

#[cfg(feature = "gstreamer")]
pub mod gstreamer;

static FRAMEWORK_READY: AtomicBool = AtomicBool::new(false);

/// True once any framework implementation finished `init` successfully.
pub fn is_initialized() -> bool {
    FRAMEWORK_READY.load(Ordering::SeqCst)
}

pub(crate) fn mark_initialized() {
    FRAMEWORK_READY.store(true, Ordering::SeqCst);
}

/// Framework initialization entry point taking an application context.
pub trait MediaFramework<C>: Send + Sync {
    /// Errors carry a human-readable message suitable for the user.
    fn init(&self, ctx: &C) -> Result<(), SinkError>;
}

/// Transient user-facing notification surface.
pub trait Notifier<C>: Send + Sync {
    fn notify(&self, ctx: &C, message: &str);
}

/// Opaque native entry point invoked by `start`.
pub trait NativeEntry: Send + Sync {
    fn run(&self);
}

impl<C, T: MediaFramework<C> + ?Sized> MediaFramework<C> for Arc<T> {
    fn init(&self, ctx: &C) -> Result<(), SinkError> {
        (**self).init(ctx)
    }
}

impl<C, T: Notifier<C> + ?Sized> Notifier<C> for Arc<T> {
    fn notify(&self, ctx: &C, message: &str) {
        (**self).notify(ctx, message)
    }
}

/// Framework backing the built-in pipeline.
///
/// Nothing external needs to come up, so init only records readiness and
/// the requested debug threshold.
#[derive(Debug, Clone, Default)]
pub struct BuiltinFramework {
    pub default_threshold: u8,
}

impl<C> MediaFramework<C> for BuiltinFramework {
    fn init(&self, _ctx: &C) -> Result<(), SinkError> {
        mark_initialized();
        info!(
            "built-in framework ready (debug threshold {})",
            self.default_threshold
        );
        Ok(())
    }
}

/// Notification surface for hosts without a UI: a warn-level log record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl<C> Notifier<C> for LogNotifier {
    fn notify(&self, _ctx: &C, message: &str) {
        warn!("{}", message);
    }
}

/// Framework implementation selected by the enabled features.
pub fn default_framework<C: 'static>(default_threshold: u8) -> Box<dyn MediaFramework<C>> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "gstreamer")] {
            Box::new(gstreamer::GstFramework { default_threshold })
        } else {
            Box::new(BuiltinFramework { default_threshold })
        }
    }
}
