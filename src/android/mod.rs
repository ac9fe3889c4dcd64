//! Android bootstrap: application context, framework init and Toast notifications.
//!
//! The JNI exports live in [`exports`]; this module holds the state they
//! share (Java VM, application context, class loader) and the platform
//! implementations of the holder seams.

use std::path::PathBuf;
use std::sync::{Mutex, Once};

use jni::objects::{GlobalRef, JObject, JString, JValue};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::OnceCell;
use tracing::{info, trace, warn};

use crate::config::SinkConfig;
use crate::env::apply_app_dirs_env;
use crate::error::{log_sink_error, ErrorCode, SinkError};
use crate::framework::{self, MediaFramework, Notifier};

pub mod exports;
#[cfg(feature = "gstreamer")]
mod logcat;

/// `android.widget.Toast.LENGTH_LONG`
const TOAST_LENGTH_LONG: i32 = 1;

static JAVA_VM: OnceCell<JavaVM> = OnceCell::new();
static APP_CONTEXT: Mutex<Option<GlobalRef>> = Mutex::new(None);
static CLASS_LOADER: Mutex<Option<GlobalRef>> = Mutex::new(None);
static NDK_CONTEXT: Once = Once::new();

pub(crate) fn java_vm() -> Result<&'static JavaVM, SinkError> {
    JAVA_VM.get().ok_or_else(|| SinkError::Jni {
        reason: "JavaVM not stored; JNI_OnLoad has not run".to_string(),
    })
}

pub(crate) fn set_java_vm(vm: JavaVM) {
    if JAVA_VM.set(vm).is_err() {
        trace!("JavaVM already stored");
    }
}

pub(crate) fn application_context() -> Option<GlobalRef> {
    APP_CONTEXT.lock().ok().and_then(|guard| guard.clone())
}

pub(crate) fn application_class_loader() -> Option<GlobalRef> {
    CLASS_LOADER.lock().ok().and_then(|guard| guard.clone())
}

/// Application context passed from Java.
#[derive(Clone)]
pub struct AndroidContext {
    context: GlobalRef,
}

impl AndroidContext {
    pub fn new(env: &mut JNIEnv, context: &JObject) -> Result<Self, SinkError> {
        Ok(Self {
            context: env.new_global_ref(context)?,
        })
    }

    pub fn as_obj(&self) -> &JObject<'static> {
        self.context.as_obj()
    }
}

/// Fail with the pending Java exception, after printing and clearing it.
fn check_exception(env: &mut JNIEnv, what: &str) -> Result<(), SinkError> {
    if env.exception_check()? {
        env.exception_describe()?;
        env.exception_clear()?;
        return Err(SinkError::Jni {
            reason: format!("exception while {}", what),
        });
    }
    Ok(())
}

fn absolute_dir(env: &mut JNIEnv, context: &JObject, getter: &str) -> Result<PathBuf, SinkError> {
    let dir = env.call_method(context, getter, "()Ljava/io/File;", &[])?.l()?;
    check_exception(env, getter)?;
    let path = env
        .call_method(&dir, "getAbsolutePath", "()Ljava/lang/String;", &[])?
        .l()?;
    let path: String = env.get_string(&JString::from(path))?.into();
    Ok(PathBuf::from(path))
}

/// Store the context and its class loader, export the directory variables
/// and hook framework logging into logcat.
fn bootstrap(env: &mut JNIEnv, context: &JObject) -> Result<(), SinkError> {
    trace!("GStreamer.init()");

    let loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?
        .l()?;
    check_exception(env, "reading class loader")?;

    let context_ref = env.new_global_ref(context)?;
    let loader_ref = env.new_global_ref(&loader)?;
    let vm = java_vm()?;

    NDK_CONTEXT.call_once(|| {
        // SAFETY: both pointers are backed by references kept for the
        // lifetime of the process
        unsafe {
            ndk_context::initialize_android_context(
                vm.get_java_vm_pointer().cast(),
                context_ref.as_obj().as_raw().cast(),
            );
        }
    });

    if let Ok(mut guard) = APP_CONTEXT.lock() {
        *guard = Some(context_ref);
    }
    if let Ok(mut guard) = CLASS_LOADER.lock() {
        *guard = Some(loader_ref);
    }

    let cache_dir = absolute_dir(env, context, "getCacheDir")?;
    let files_dir = absolute_dir(env, context, "getFilesDir")?;
    if let Err(err) = apply_app_dirs_env(&cache_dir, &files_dir) {
        log_sink_error(&err, "bootstrap");
    }

    #[cfg(feature = "gstreamer")]
    {
        trace!("set glib handlers");
        logcat::install();
    }

    Ok(())
}

/// Full Android framework init: bootstrap, framework, plugins.
pub struct AndroidFramework {
    config: SinkConfig,
    inner: Box<dyn MediaFramework<AndroidContext>>,
}

impl AndroidFramework {
    pub fn new(config: SinkConfig) -> Self {
        let inner = framework::default_framework(config.debug.default_threshold);
        Self { config, inner }
    }
}

impl MediaFramework<AndroidContext> for AndroidFramework {
    fn init(&self, ctx: &AndroidContext) -> Result<(), SinkError> {
        let vm = java_vm()?;
        let mut env = vm.attach_current_thread()?;
        bootstrap(&mut env, ctx.as_obj())?;

        self.inner.init(ctx)?;

        if cfg!(feature = "gstreamer") {
            let registered = crate::plugins::global().register_all(&self.config.plugins.names);
            info!(
                "registered {}/{} plugins",
                registered,
                self.config.plugins.names.len()
            );
        }
        Ok(())
    }
}

/// Shows notifications as a long `Toast`.
pub struct ToastNotifier;

impl ToastNotifier {
    fn show(ctx: &AndroidContext, message: &str) -> Result<(), SinkError> {
        let vm = java_vm()?;
        let mut env = vm.attach_current_thread()?;
        let text = env.new_string(message)?;
        let toast = env
            .call_static_method(
                "android/widget/Toast",
                "makeText",
                "(Landroid/content/Context;Ljava/lang/CharSequence;I)Landroid/widget/Toast;",
                &[
                    JValue::Object(ctx.as_obj()),
                    JValue::Object(&text),
                    JValue::Int(TOAST_LENGTH_LONG),
                ],
            )?
            .l()?;
        env.call_method(&toast, "show", "()V", &[])?;
        check_exception(&mut env, "showing toast")
    }
}

impl Notifier<AndroidContext> for ToastNotifier {
    fn notify(&self, ctx: &AndroidContext, message: &str) {
        if let Err(err) = Self::show(ctx, message) {
            warn!("could not show toast '{}': {}", message, err.message());
        }
    }
}
