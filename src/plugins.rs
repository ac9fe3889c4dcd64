//! Static plugin registration.
//!
//! On Android the framework's plugins ship as separate shared objects that
//! are not scanned from a plugin path. Each one is opened explicitly and its
//! `gst_plugin_<name>_register` function called once the framework is up.
//! Libraries stay loaded for the lifetime of the process.

use std::sync::Mutex;

use dlopen::symbor::{Library, Symbol};
use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::error::{log_sink_error, SinkError};

/// Core elements plus the Android codec plugin.
pub const DEFAULT_PLUGINS: &[&str] = &[
    "coreelements",
    "coretracers",
    "adder",
    "app",
    "audioconvert",
    "audiomixer",
    "audiorate",
    "audioresample",
    "audiotestsrc",
    "compositor",
    "gio",
    "overlaycomposition",
    "pango",
    "rawparse",
    "typefindfunctions",
    "videoconvert",
    "videorate",
    "videoscale",
    "videotestsrc",
    "volume",
    "autodetect",
    "videofilter",
    "androidmedia",
];

pub fn library_name(plugin: &str) -> String {
    format!("libgst{}.so", plugin)
}

pub fn register_symbol(plugin: &str) -> String {
    format!("gst_plugin_{}_register", plugin)
}

static REGISTRY: Lazy<PluginRegistry> = Lazy::new(PluginRegistry::default);

pub fn global() -> &'static PluginRegistry {
    &REGISTRY
}

#[derive(Default)]
pub struct PluginRegistry {
    loaded: Mutex<Vec<(String, Library)>>,
}

impl PluginRegistry {
    /// Register every plugin in `names`; failures are logged and skipped.
    ///
    /// Returns how many plugins were registered.
    pub fn register_all<S: AsRef<str>>(&self, names: &[S]) -> usize {
        trace!("load plugins");
        names
            .iter()
            .filter(|name| match self.register(name.as_ref()) {
                Ok(()) => true,
                Err(err) => {
                    log_sink_error(&err, "register_plugin");
                    false
                }
            })
            .count()
    }

    pub fn register(&self, plugin: &str) -> Result<(), SinkError> {
        if self.is_loaded(plugin) {
            return Ok(());
        }

        let so_name = library_name(plugin);
        trace!("loading {}", so_name);
        let plugin_error = |reason: String| SinkError::Plugin {
            name: plugin.to_string(),
            reason,
        };

        let library = Library::open(&so_name).map_err(|e| plugin_error(e.to_string()))?;

        {
            let symbol = register_symbol(plugin);
            trace!("registering {}", so_name);
            // SAFETY: the register symbol takes no arguments and returns
            // nothing; it is only called after framework init
            let register: Symbol<unsafe extern "C" fn()> =
                unsafe { library.symbol(&symbol) }
                    .map_err(|e| plugin_error(e.to_string()))?;
            unsafe { register() };
        }

        debug!("registered plugin {}", plugin);
        self.loaded
            .lock()
            .map_err(|_| SinkError::LockPoisoned {
                component: "plugin_registry".to_string(),
            })?
            .push((plugin.to_string(), library));
        Ok(())
    }

    pub fn is_loaded(&self, plugin: &str) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.iter().any(|(name, _)| name == plugin))
            .unwrap_or(false)
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded
            .lock()
            .map(|loaded| loaded.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }
}
