//! Route GLib and GStreamer output into the tracing/logcat pipeline.

use std::sync::Once;

use once_cell::sync::OnceCell;
use tracing::{debug, error, info, trace, warn};

static INSTALL: Once = Once::new();
static START_TIME: OnceCell<gst::ClockTime> = OnceCell::new();

pub(super) fn install() {
    INSTALL.call_once(|| {
        glib::set_print_handler(|msg| info!(tag = "GLib+stdout", "{}", msg));
        glib::set_printerr_handler(|msg| error!(tag = "GLib+stderr", "{}", msg));
        glib::log_set_default_handler(|domain, level, msg| {
            let tag = format!("GLib+{}", domain.unwrap_or(""));
            match level {
                glib::LogLevel::Error | glib::LogLevel::Critical => error!(tag = %tag, "{}", msg),
                glib::LogLevel::Warning => warn!(tag = %tag, "{}", msg),
                glib::LogLevel::Message | glib::LogLevel::Info => info!(tag = %tag, "{}", msg),
                glib::LogLevel::Debug => debug!(tag = %tag, "{}", msg),
            }
        });

        let _ = START_TIME.set(gst::util_get_timestamp());
        gst::log::remove_default_log_function();
        gst::log::add_log_function(debug_logcat);
    });
}

fn debug_logcat(
    category: gst::DebugCategory,
    level: gst::DebugLevel,
    file: &glib::GStr,
    function: &glib::GStr,
    line: u32,
    object: Option<&gst::log::LoggedObject>,
    message: &gst::DebugMessage,
) {
    if level > category.threshold() {
        return;
    }

    let start = START_TIME.get().copied().unwrap_or(gst::ClockTime::ZERO);
    let elapsed = gst::util_get_timestamp().saturating_sub(start);
    let tag = format!("GStreamer+{}", category.name());
    let label = object.map(|o| o.to_string()).unwrap_or_default();
    let text = message.get().map(|m| m.to_string()).unwrap_or_default();
    let entry = format!(
        "{} {:?} {}:{}:{}:{} {}",
        elapsed,
        std::thread::current().id(),
        file,
        line,
        function,
        label,
        text
    );

    match level {
        gst::DebugLevel::Error => error!(tag = %tag, "{}", entry),
        gst::DebugLevel::Warning => warn!(tag = %tag, "{}", entry),
        gst::DebugLevel::Info => info!(tag = %tag, "{}", entry),
        gst::DebugLevel::Debug => debug!(tag = %tag, "{}", entry),
        _ => trace!(tag = %tag, "{}", entry),
    }
}
