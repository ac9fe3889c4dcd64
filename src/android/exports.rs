//! JNI and C symbols exported from `libandroidsink.so`.

#![allow(non_snake_case)]

use std::ffi::c_void;

use jni::objects::{JClass, JObject};
use jni::sys::{jboolean, jint, jobject, JNI_FALSE, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use tracing::{error, info, trace};

use super::{
    application_class_loader, application_context, java_vm, set_java_vm, AndroidContext,
    AndroidFramework,
};
use crate::config::SinkConfig;
use crate::error::{log_sink_error, ErrorCode};
use crate::framework::MediaFramework;
use crate::{holder, init_logging, session};

/// Called by the runtime when `System.loadLibrary("androidsink")` runs.
#[no_mangle]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    init_logging();

    trace!("get JNIEnv");
    let mut env = match vm.get_env() {
        Ok(env) => env,
        Err(e) => {
            error!("Could not retrieve JNIEnv, error: {}", e);
            return 0;
        }
    };

    trace!("get JNI version");
    let version: jint = match env.get_version() {
        Ok(v) => v.into(),
        Err(e) => {
            error!("Could not retrieve JNI version, error: {}", e);
            return 0;
        }
    };
    trace!("JNI Version: {:#x?}", version);

    if cfg!(feature = "gstreamer") {
        trace!("find class GStreamer");
        if let Err(e) = env.find_class("org/freedesktop/gstreamer/GStreamer") {
            error!(
                "Could not retrieve class org.freedesktop.gstreamer.GStreamer, error: {}",
                e
            );
            return 0;
        }
    }

    trace!("save java vm");
    set_java_vm(vm);
    info!("androidsink loaded");

    version
}

/// `org.freedesktop.gstreamer.GStreamer.nativeInit(Context)`
///
/// Throws `java.lang.Exception` carrying the failure message.
#[no_mangle]
pub extern "system" fn Java_org_freedesktop_gstreamer_GStreamer_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
) {
    let result = AndroidContext::new(&mut env, &context)
        .and_then(|ctx| AndroidFramework::new(SinkConfig::load()).init(&ctx));

    if let Err(err) = result {
        log_sink_error(&err, "nativeInit");
        if let Err(e) = env.throw_new("java/lang/Exception", err.message()) {
            error!("Could not throw init failure: {}", e);
        }
    }
}

/// `tw.mapacode.androidsink.AndroidSink.nativeRun()`
#[no_mangle]
pub extern "system" fn Java_tw_mapacode_androidsink_AndroidSink_nativeRun(
    _env: JNIEnv,
    _class: JClass,
) {
    session::global().start();
}

/// `tw.mapacode.androidsink.AndroidSink.nativeGetInstance(Context, int, int)`
///
/// Returns whether the process-wide sink exists after the call.
#[no_mangle]
pub extern "system" fn Java_tw_mapacode_androidsink_AndroidSink_nativeGetInstance(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
    sample_rate: jint,
    buf_size: jint,
) -> jboolean {
    let ctx = match AndroidContext::new(&mut env, &context) {
        Ok(ctx) => ctx,
        Err(err) => {
            log_sink_error(&err, "nativeGetInstance");
            return JNI_FALSE;
        }
    };

    match holder::global().get_instance(&ctx, sample_rate, buf_size) {
        Some(_) => JNI_TRUE,
        None => JNI_FALSE,
    }
}

/// `tw.mapacode.androidsink.AndroidSink.nativeStart()`
///
/// Starts through the holder, so nothing happens without a prior
/// successful `nativeGetInstance`.
#[no_mangle]
pub extern "system" fn Java_tw_mapacode_androidsink_AndroidSink_nativeStart(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
) {
    let started = AndroidContext::new(&mut env, &context).map(|ctx| {
        if holder::global().is_initialized() {
            if let Some(sink) = holder::global().get_instance(&ctx, 0, 0) {
                sink.start();
                return true;
            }
        }
        false
    });

    match started {
        Ok(true) => trace!("sink started"),
        Ok(false) => trace!("no sink instance; start ignored"),
        Err(err) => log_sink_error(&err, "nativeStart"),
    }
}

#[no_mangle]
pub extern "C" fn gst_android_get_java_vm() -> *mut jni::sys::JavaVM {
    match java_vm() {
        Ok(vm) => vm.get_java_vm_pointer(),
        Err(_) => {
            trace!("Could not get jvm");
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn gst_android_get_application_context() -> jobject {
    // The static keeps the global reference alive after the clone drops
    application_context()
        .map(|c| c.as_obj().as_raw())
        .unwrap_or(std::ptr::null_mut())
}

#[no_mangle]
pub extern "C" fn gst_android_get_application_class_loader() -> jobject {
    application_class_loader()
        .map(|o| o.as_obj().as_raw())
        .unwrap_or(std::ptr::null_mut())
}
