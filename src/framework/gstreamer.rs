//! GStreamer as the media framework.

use once_cell::sync::Lazy;
use tracing::info;

use super::{mark_initialized, MediaFramework};
use crate::error::SinkError;

pub static CAT: Lazy<gst::DebugCategory> = Lazy::new(|| {
    gst::DebugCategory::new(
        "androidsink",
        gst::DebugColorFlags::empty(),
        Some("AndroidSink"),
    )
});

/// Map a numeric threshold (as used in `GST_DEBUG`) to a debug level.
pub fn debug_level(threshold: u8) -> gst::DebugLevel {
    match threshold {
        0 => gst::DebugLevel::None,
        1 => gst::DebugLevel::Error,
        2 => gst::DebugLevel::Warning,
        3 => gst::DebugLevel::Fixme,
        4 => gst::DebugLevel::Info,
        5 => gst::DebugLevel::Debug,
        6 => gst::DebugLevel::Log,
        7 => gst::DebugLevel::Trace,
        _ => gst::DebugLevel::Memdump,
    }
}

#[derive(Debug, Clone, Default)]
pub struct GstFramework {
    pub default_threshold: u8,
}

impl<C> MediaFramework<C> for GstFramework {
    fn init(&self, _ctx: &C) -> Result<(), SinkError> {
        gst::log::set_active(true);
        gst::log::set_default_threshold(debug_level(self.default_threshold));

        gst::init().map_err(|err| SinkError::FrameworkInit {
            reason: err.to_string(),
        })?;

        gst::trace!(CAT, "gst init");
        mark_initialized();
        info!("GStreamer {} initialized", gst::version_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_level_mapping() {
        assert_eq!(debug_level(0), gst::DebugLevel::None);
        assert_eq!(debug_level(2), gst::DebugLevel::Warning);
        assert_eq!(debug_level(9), gst::DebugLevel::Memdump);
        assert_eq!(debug_level(200), gst::DebugLevel::Memdump);
    }
}
