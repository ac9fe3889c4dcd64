//! Process environment consumed by the multimedia framework.

use std::path::Path;

use tracing::{debug, info};

use crate::error::SinkError;

/// Framework debug output selector.
pub const GST_DEBUG: &str = "GST_DEBUG";

/// Diagnostic variables written before framework init.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugEnv {
    pub gst_debug: Option<String>,
}

impl DebugEnv {
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        self.gst_debug
            .iter()
            .map(|value| (GST_DEBUG, value.clone()))
            .collect()
    }
}

/// Write the configured diagnostic variables.
///
/// Stops at the first variable that cannot be written.
pub fn apply_debug_env(env: &DebugEnv) -> Result<(), SinkError> {
    for (key, value) in env.vars() {
        set_var_checked(key, &value)?;
        info!("{}={}", key, value);
    }
    Ok(())
}

/// `std::env::set_var` panics on malformed input; reject it up front instead.
pub fn set_var_checked(key: &str, value: &str) -> Result<(), SinkError> {
    let reason = if key.is_empty() {
        Some("empty key")
    } else if key.contains('=') {
        Some("key contains '='")
    } else if key.contains('\0') {
        Some("key contains NUL")
    } else if value.contains('\0') {
        Some("value contains NUL")
    } else {
        None
    };

    if let Some(reason) = reason {
        return Err(SinkError::EnvVar {
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }

    std::env::set_var(key, value);
    Ok(())
}

/// Variables pointing the framework at the application's private directories.
pub fn app_dirs_env(cache_dir: &Path, files_dir: &Path) -> Vec<(&'static str, String)> {
    let cache = cache_dir.display().to_string();
    let files = files_dir.display().to_string();
    let registry = files_dir.join("registry.bin").display().to_string();

    vec![
        ("TMP", cache.clone()),
        ("TEMP", cache.clone()),
        ("TMPDIR", cache.clone()),
        ("XDG_RUNTIME_DIR", cache.clone()),
        ("XDG_CACHE_HOME", cache),
        ("HOME", files.clone()),
        ("XDG_DATA_DIRS", files.clone()),
        ("XDG_CONFIG_DIRS", files.clone()),
        ("XDG_CONFIG_HOME", files.clone()),
        ("XDG_DATA_HOME", files),
        ("GST_REGISTRY", registry),
    ]
}

/// Export [`app_dirs_env`]; every variable is attempted.
pub fn apply_app_dirs_env(cache_dir: &Path, files_dir: &Path) -> Result<(), SinkError> {
    let mut first_err = None;
    for (key, value) in app_dirs_env(cache_dir, files_dir) {
        match set_var_checked(key, &value) {
            Ok(()) => debug!("{}={}", key, value),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Serializes tests that write `GST_DEBUG`.
#[cfg(test)]
pub(crate) static TEST_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_debug_env_writes_nothing() {
        assert!(DebugEnv::default().vars().is_empty());
        assert!(apply_debug_env(&DebugEnv::default()).is_ok());
    }

    #[test]
    fn test_debug_env_sets_gst_debug() {
        let _env = TEST_ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let env = DebugEnv {
            gst_debug: Some("*:2".to_string()),
        };
        apply_debug_env(&env).unwrap();
        assert_eq!(std::env::var(GST_DEBUG).unwrap(), "*:2");
    }

    #[test]
    fn test_rejects_malformed_vars() {
        assert!(matches!(
            set_var_checked("", "x"),
            Err(SinkError::EnvVar { .. })
        ));
        assert!(matches!(
            set_var_checked("A=B", "x"),
            Err(SinkError::EnvVar { .. })
        ));
        assert!(matches!(
            set_var_checked("ANDROIDSINK_TEST_NUL", "a\0b"),
            Err(SinkError::EnvVar { .. })
        ));
    }

    #[test]
    fn test_app_dirs_env_layout() {
        let cache = PathBuf::from("/data/user/0/tw.mapacode.androidsink/cache");
        let files = PathBuf::from("/data/user/0/tw.mapacode.androidsink/files");
        let vars = app_dirs_env(&cache, &files);

        let lookup = |key: &str| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(lookup("TMPDIR"), cache.display().to_string());
        assert_eq!(lookup("HOME"), files.display().to_string());
        assert!(lookup("GST_REGISTRY").ends_with("files/registry.bin"));
        assert_eq!(vars.len(), 11);
    }
}
