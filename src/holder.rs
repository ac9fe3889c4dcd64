//! Singleton sink holder
//!
//! Gates one-time initialization of the media framework and hands out the
//! process-wide [`AndroidSink`]. The first successful `get_instance` creates
//! the sink; later calls return it and ignore their arguments. A failed
//! initialization notifies the user and leaves the holder empty so the next
//! call tries again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tracing::info;

use crate::config::SinkConfig;
use crate::env::{apply_debug_env, DebugEnv};
use crate::error::{log_sink_error, ErrorCode};
use crate::framework::{MediaFramework, NativeEntry, Notifier};
use crate::session;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        /// Application context handed to framework init and notifications.
        pub type HostContext = crate::android::AndroidContext;
    } else {
        /// Application context handed to framework init and notifications.
        pub type HostContext = ();
    }
}

/// The process-wide sink. Only reachable through a successful
/// [`SinkHolder::get_instance`].
pub struct AndroidSink {
    entry: Arc<dyn NativeEntry>,
}

impl AndroidSink {
    /// Invoke the native entry point.
    pub fn start(&self) {
        self.entry.run();
    }
}

pub struct SinkHolder<C> {
    framework: Box<dyn MediaFramework<C>>,
    notifier: Box<dyn Notifier<C>>,
    entry: Arc<dyn NativeEntry>,
    debug_env: DebugEnv,
    instance: Mutex<Option<Arc<AndroidSink>>>,
}

impl<C> SinkHolder<C> {
    pub fn new(
        framework: Box<dyn MediaFramework<C>>,
        notifier: Box<dyn Notifier<C>>,
        entry: Arc<dyn NativeEntry>,
    ) -> Self {
        Self {
            framework,
            notifier,
            entry,
            debug_env: DebugEnv::default(),
            instance: Mutex::new(None),
        }
    }

    /// Diagnostic variables written before the first framework init.
    pub fn with_debug_env(mut self, debug_env: DebugEnv) -> Self {
        self.debug_env = debug_env;
        self
    }

    /// Return the sink, initializing the framework on first use.
    ///
    /// `sample_rate` and `buf_size` are accepted for the Java signature and
    /// have no effect.
    pub fn get_instance(
        &self,
        ctx: &C,
        _sample_rate: i32,
        _buf_size: i32,
    ) -> Option<Arc<AndroidSink>> {
        let mut guard = self.lock_instance();

        if let Some(sink) = guard.as_ref() {
            return Some(Arc::clone(sink));
        }

        if let Err(err) = apply_debug_env(&self.debug_env) {
            info!("{}", err.message());
        }

        if let Err(err) = self.framework.init(ctx) {
            log_sink_error(&err, "get_instance");
            self.notifier.notify(ctx, &err.message());
            return None;
        }

        let sink = Arc::new(AndroidSink {
            entry: Arc::clone(&self.entry),
        });
        *guard = Some(Arc::clone(&sink));
        Some(sink)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock_instance().is_some()
    }

    /// The slot is only written after a successful init, so a panic in
    /// `init` cannot leave it half-set and the poison flag is ignored.
    fn lock_instance(&self) -> MutexGuard<'_, Option<Arc<AndroidSink>>> {
        self.instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

static HOLDER: Lazy<SinkHolder<HostContext>> = Lazy::new(|| {
    let config = SinkConfig::load();
    SinkHolder::new(
        host_framework(&config),
        host_notifier(),
        session::global(),
    )
    .with_debug_env(config.debug_env())
});

/// Holder backing the JNI surface.
pub fn global() -> &'static SinkHolder<HostContext> {
    &HOLDER
}

#[cfg(target_os = "android")]
fn host_framework(config: &SinkConfig) -> Box<dyn MediaFramework<HostContext>> {
    Box::new(crate::android::AndroidFramework::new(config.clone()))
}

#[cfg(not(target_os = "android"))]
fn host_framework(config: &SinkConfig) -> Box<dyn MediaFramework<HostContext>> {
    crate::framework::default_framework(config.debug.default_threshold)
}

#[cfg(target_os = "android")]
fn host_notifier() -> Box<dyn Notifier<HostContext>> {
    Box::new(crate::android::ToastNotifier)
}

#[cfg(not(target_os = "android"))]
fn host_notifier() -> Box<dyn Notifier<HostContext>> {
    Box::new(crate::framework::LogNotifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::GST_DEBUG;
    use crate::error::SinkError;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the first `failures` inits with a fixed message.
    #[derive(Default)]
    struct FlakyFramework {
        failures: usize,
        calls: AtomicUsize,
    }

    impl MediaFramework<&'static str> for FlakyFramework {
        fn init(&self, _ctx: &&'static str) -> Result<(), SinkError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(SinkError::FrameworkInit {
                    reason: "libgstreamer_android.so not found".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        shown: Mutex<Vec<(String, String)>>,
    }

    impl Notifier<&'static str> for RecordingNotifier {
        fn notify(&self, ctx: &&'static str, message: &str) {
            self.shown
                .lock()
                .unwrap()
                .push((ctx.to_string(), message.to_string()));
        }
    }

    #[derive(Default)]
    struct CountingEntry {
        runs: AtomicUsize,
    }

    impl NativeEntry for CountingEntry {
        fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        framework: Arc<FlakyFramework>,
        notifier: Arc<RecordingNotifier>,
        entry: Arc<CountingEntry>,
        holder: SinkHolder<&'static str>,
    }

    fn fixture(failures: usize) -> Fixture {
        let framework = Arc::new(FlakyFramework {
            failures,
            ..Default::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let entry = Arc::new(CountingEntry::default());
        let holder = SinkHolder::new(
            Box::new(Arc::clone(&framework)),
            Box::new(Arc::clone(&notifier)),
            entry.clone(),
        );
        Fixture {
            framework,
            notifier,
            entry,
            holder,
        }
    }

    #[test]
    fn test_second_call_returns_same_instance() {
        let f = fixture(0);
        let first = f.holder.get_instance(&"activity", 0, 0).unwrap();
        let second = f.holder.get_instance(&"other", 48_000, 256).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.framework.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_init_notifies_and_allows_retry() {
        let f = fixture(1);

        assert!(f.holder.get_instance(&"activity", 0, 0).is_none());
        assert!(!f.holder.is_initialized());
        {
            let shown = f.notifier.shown.lock().unwrap();
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].0, "activity");
            assert_eq!(shown[0].1, "libgstreamer_android.so not found");
        }

        let sink = f.holder.get_instance(&"activity", 0, 0).unwrap();
        assert!(f.holder.is_initialized());
        assert_eq!(f.framework.calls.load(Ordering::SeqCst), 2);
        assert_eq!(f.notifier.shown.lock().unwrap().len(), 1);

        sink.start();
        assert_eq!(f.entry.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_rate_and_buffer_size_have_no_effect() {
        let a = fixture(0);
        let b = fixture(0);
        let from_a = a.holder.get_instance(&"activity", 0, 0);
        let from_b = b.holder.get_instance(&"activity", 44_100, 4096);
        assert_eq!(from_a.is_some(), from_b.is_some());
        assert_eq!(
            a.framework.calls.load(Ordering::SeqCst),
            b.framework.calls.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn test_start_invokes_entry_once_per_call() {
        let f = fixture(0);
        let sink = f.holder.get_instance(&"activity", 0, 0).unwrap();
        assert_eq!(f.entry.runs.load(Ordering::SeqCst), 0);
        sink.start();
        assert_eq!(f.entry.runs.load(Ordering::SeqCst), 1);
        sink.start();
        assert_eq!(f.entry.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bad_debug_env_is_not_fatal() {
        let f = fixture(0);
        let holder = f.holder.with_debug_env(DebugEnv {
            gst_debug: Some("bad\0value".to_string()),
        });
        assert!(holder.get_instance(&"activity", 0, 0).is_some());
        assert!(f.notifier.shown.lock().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_first_calls_create_one_instance() {
        let f = fixture(0);
        let holder = Arc::new(f.holder);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let holder = Arc::clone(&holder);
                std::thread::spawn(move || holder.get_instance(&"activity", 0, 0).unwrap())
            })
            .collect();
        let sinks: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(sinks.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(f.framework.calls.load(Ordering::SeqCst), 1);
    }

    /// Panics on the first init, succeeds afterwards.
    #[derive(Default)]
    struct PanicOnceFramework {
        calls: AtomicUsize,
    }

    impl MediaFramework<&'static str> for PanicOnceFramework {
        fn init(&self, _ctx: &&'static str) -> Result<(), SinkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("framework aborted during init");
            }
            Ok(())
        }
    }

    #[test]
    fn test_panicking_init_does_not_poison_holder() {
        let framework = Arc::new(PanicOnceFramework::default());
        let holder: SinkHolder<&'static str> = SinkHolder::new(
            Box::new(Arc::clone(&framework)),
            Box::new(RecordingNotifier::default()),
            Arc::new(CountingEntry::default()),
        );

        let first = panic::catch_unwind(AssertUnwindSafe(|| {
            holder.get_instance(&"activity", 0, 0)
        }));
        assert!(first.is_err());
        assert!(!holder.is_initialized());

        assert!(holder.get_instance(&"activity", 0, 0).is_some());
        assert!(holder.is_initialized());
        assert_eq!(framework.calls.load(Ordering::SeqCst), 2);
    }

    /// Records the `GST_DEBUG` value visible when init runs.
    #[derive(Default)]
    struct EnvObservingFramework {
        seen: Mutex<Option<String>>,
    }

    impl MediaFramework<&'static str> for EnvObservingFramework {
        fn init(&self, _ctx: &&'static str) -> Result<(), SinkError> {
            *self.seen.lock().unwrap() = std::env::var(GST_DEBUG).ok();
            Ok(())
        }
    }

    #[test]
    fn test_debug_env_is_written_before_init() {
        let _env = crate::env::TEST_ENV_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let framework = Arc::new(EnvObservingFramework::default());
        let holder = SinkHolder::new(
            Box::new(Arc::clone(&framework)),
            Box::new(RecordingNotifier::default()),
            Arc::new(CountingEntry::default()),
        )
        .with_debug_env(DebugEnv {
            gst_debug: Some("androidsink_holder:6".to_string()),
        });

        assert!(holder.get_instance(&"activity", 0, 0).is_some());
        assert_eq!(
            framework.seen.lock().unwrap().as_deref(),
            Some("androidsink_holder:6")
        );
    }
}
