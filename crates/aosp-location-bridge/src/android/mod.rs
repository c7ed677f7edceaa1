// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Architecture notes
//
// Synchronous reads (battery capacity, last known location, SDK level) are
// plain JNI calls.
//
// Live location updates and cell-info snapshots arrive through Java callback
// objects. Those cannot be created from Rust, so the host application ships
// two thin shim classes in `fr.ninico.aosp_location`:
//
// ```kotlin
// class NativeLocationListener(private val handle: Long) : LocationListener {
//     override fun onLocationChanged(l: Location) =
//         nativeOnLocationChanged(handle, l.latitude, l.longitude, l.time)
//     private external fun nativeOnLocationChanged(h: Long, lat: Double, lon: Double, t: Long)
// }
//
// class NativeCellInfoCallback(private val handle: Long) : TelephonyManager.CellInfoCallback() {
//     override fun onCellInfo(infos: MutableList<CellInfo>) = nativeOnCellInfo(handle, infos)
//     override fun onError(code: Int, detail: Throwable?) = nativeOnError(handle, code, detail?.message)
//     private external fun nativeOnCellInfo(h: Long, infos: List<CellInfo>)
//     private external fun nativeOnError(h: Long, code: Int, detail: String?)
// }
// ```
//
// Each shim carries a handle into a process-wide registry; the `extern
// "system"` exports at the bottom of this file look the handle up and invoke
// the Rust listener or callback.
//
// The plugin host is not a NativeActivity, so no NDK glue hands us a VM or a
// context. `JNI_OnLoad` captures the VM when `System.loadLibrary` runs, and
// the host registers its application context once, before the first channel
// call, through a third shim:
//
// ```kotlin
// object NativeBridge {
//     init { System.loadLibrary("aosp_location") }
//     external fun nativeInit(context: Context)
// }
// ```
//
// `nativeInit` also publishes the pair through `ndk_context` for other
// NDK-aware crates in the process. Hosts that already run the NDK glue must
// not call it. Until it has run every bridge call fails with a `Bridge`
// error.
//
// Trait methods run on tokio workers that stay attached to the VM, so each
// one executes inside its own JNI local frame and frees its local refs on
// return.

#![cfg(target_os = "android")]
#![allow(non_snake_case)]

use std::collections::HashMap;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once, OnceLock};

use chrono::{DateTime, Utc};
use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{jdouble, jint, jlong, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use tracing::{debug, info, warn};

use aosp_location_core::error::{LocationError, Result};
use aosp_location_core::types::{CellIdentityRecord, LocationFix};

use crate::traits::*;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Host shim implementing `android.location.LocationListener`.
const LOCATION_LISTENER_SHIM: &str = "fr.ninico.aosp_location.NativeLocationListener";

/// Host shim extending `TelephonyManager.CellInfoCallback`.
const CELL_INFO_CALLBACK_SHIM: &str = "fr.ninico.aosp_location.NativeCellInfoCallback";

/// `BatteryManager.BATTERY_PROPERTY_CAPACITY`.
const BATTERY_PROPERTY_CAPACITY: jint = 4;

/// `Context.LOCATION_SERVICE`, `Context.TELEPHONY_SERVICE`, `Context.BATTERY_SERVICE`.
const LOCATION_SERVICE: &str = "location";
const TELEPHONY_SERVICE: &str = "phone";
const BATTERY_SERVICE: &str = "batterymanager";

/// Local refs a single bridge call may hold at once.
const LOCAL_FRAME_CAPACITY: i32 = 16;

// ---------------------------------------------------------------------------
// Callback registries
// ---------------------------------------------------------------------------

struct LiveListener {
    listener: LocationListener,
    /// Global ref to the shim so `removeUpdates` can name it later.
    shim: GlobalRef,
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

fn live_listeners() -> &'static Mutex<HashMap<u64, LiveListener>> {
    static LISTENERS: OnceLock<Mutex<HashMap<u64, LiveListener>>> = OnceLock::new();
    LISTENERS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn pending_cell_callbacks() -> &'static Mutex<HashMap<u64, CellInfoCallback>> {
    static CALLBACKS: OnceLock<Mutex<HashMap<u64, CellInfoCallback>>> = OnceLock::new();
    CALLBACKS.get_or_init(|| Mutex::new(HashMap::new()))
}

fn poisoned() -> LocationError {
    LocationError::Bridge("callback registry lock poisoned".into())
}

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

static JAVA_VM: OnceLock<JavaVM> = OnceLock::new();
static APP_CONTEXT: OnceLock<GlobalRef> = OnceLock::new();

/// The process `JavaVM`, captured by `JNI_OnLoad` or `nativeInit`.
fn java_vm() -> Result<&'static JavaVM> {
    JAVA_VM.get().ok_or_else(|| {
        LocationError::Bridge("JavaVM unavailable: library not loaded by the host".into())
    })
}

/// The application `Context` registered by `nativeInit`.
fn app_context() -> Result<&'static JObject<'static>> {
    APP_CONTEXT.get().map(GlobalRef::as_obj).ok_or_else(|| {
        LocationError::Bridge("Android context not registered: call NativeBridge.nativeInit".into())
    })
}

/// Run `f` with a [`JNIEnv`] for the current thread inside a fresh local
/// frame. Threads stay attached, so nothing else would free the local refs.
fn with_jni<T>(f: impl FnOnce(&mut JNIEnv) -> Result<T>) -> Result<T> {
    let mut env = java_vm()?
        .attach_current_thread_permanently()
        .map_err(|e| LocationError::Bridge(format!("failed to attach JNI thread: {e}")))?;
    env.with_local_frame(LOCAL_FRAME_CAPACITY, |env| {
        Ok::<_, jni::errors::Error>(f(env))
    })
    .map_err(|e| LocationError::Bridge(format!("failed to push JNI local frame: {e}")))?
}

/// Keep the VM and a global ref to `context`, then publish both through
/// `ndk_context`. Later calls are no-ops.
fn register_context(env: &mut JNIEnv, context: &JObject) -> Result<()> {
    static PUBLISHED: Once = Once::new();

    if APP_CONTEXT.get().is_some() {
        debug!("Android: context already registered");
        return Ok(());
    }
    if context.is_null() {
        return Err(LocationError::Bridge("nativeInit called with a null context".into()));
    }

    if JAVA_VM.get().is_none() {
        let vm = env
            .get_java_vm()
            .map_err(|e| LocationError::Bridge(format!("failed to obtain JavaVM: {e}")))?;
        let _ = JAVA_VM.set(vm);
    }
    let vm = java_vm()?;

    let global = env
        .new_global_ref(context)
        .map_err(|e| jni_err(env, "new_global_ref(context)", e))?;
    let context = APP_CONTEXT.get_or_init(|| global);

    PUBLISHED.call_once(|| {
        // SAFETY: both pointers outlive the process: the VM is the runtime's
        // own and the context is pinned by the global ref held in APP_CONTEXT.
        unsafe {
            ndk_context::initialize_android_context(
                vm.get_java_vm_pointer().cast(),
                context.as_obj().as_raw().cast(),
            );
        }
    });

    info!("Android: application context registered");
    Ok(())
}

/// Map a JNI failure into `LocationError::Bridge`, clearing any pending Java
/// exception and keeping its message.
fn jni_err(env: &mut JNIEnv, context: &str, e: jni::errors::Error) -> LocationError {
    if matches!(e, jni::errors::Error::JavaException) {
        if let Ok(throwable) = env.exception_occurred() {
            let _ = env.exception_clear();
            if !throwable.is_null() {
                if let Some(message) = throwable_message(env, &throwable) {
                    return LocationError::Bridge(format!("{context}: {message}"));
                }
            }
        }
        let _ = env.exception_clear();
    }
    LocationError::Bridge(format!("{context}: {e}"))
}

fn throwable_message(env: &mut JNIEnv, throwable: &JObject) -> Option<String> {
    let message = env
        .call_method(throwable, "getMessage", "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .ok()?;
    let _ = env.exception_clear();
    read_string(env, message)
}

fn read_string(env: &mut JNIEnv, obj: JObject) -> Option<String> {
    if obj.is_null() {
        return None;
    }
    let jstr = JString::from(obj);
    env.get_string(&jstr).ok().map(Into::into)
}

fn system_service<'local>(
    env: &mut JNIEnv<'local>,
    context: &JObject,
    name: &str,
) -> Result<JObject<'local>> {
    let j_name = env
        .new_string(name)
        .map_err(|e| jni_err(env, "new_string(service)", e))?;
    let service = env
        .call_method(
            context,
            "getSystemService",
            "(Ljava/lang/String;)Ljava/lang/Object;",
            &[JValue::Object(&j_name)],
        )
        .and_then(|v| v.l())
        .map_err(|e| jni_err(env, "getSystemService", e))?;
    if service.is_null() {
        return Err(LocationError::Bridge(format!(
            "system service `{name}` unavailable"
        )));
    }
    Ok(service)
}

/// Load a host application class. `FindClass` on a native thread only sees
/// the system class loader, so go through the context's loader instead.
fn load_app_class<'local>(
    env: &mut JNIEnv<'local>,
    context: &JObject,
    name: &str,
) -> Result<JClass<'local>> {
    let loader = env
        .call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
        .and_then(|v| v.l())
        .map_err(|e| jni_err(env, "getClassLoader", e))?;
    let j_name = env
        .new_string(name)
        .map_err(|e| jni_err(env, "new_string(class)", e))?;
    let class = env
        .call_method(
            &loader,
            "loadClass",
            "(Ljava/lang/String;)Ljava/lang/Class;",
            &[JValue::Object(&j_name)],
        )
        .and_then(|v| v.l())
        .map_err(|e| jni_err(env, name, e))?;
    Ok(JClass::from(class))
}

fn fix_from_millis(latitude: f64, longitude: f64, time_ms: i64) -> LocationFix {
    let time = DateTime::<Utc>::from_timestamp_millis(time_ms).unwrap_or(DateTime::<Utc>::MIN_UTC);
    LocationFix::new(latitude, longitude, time)
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the location bridge.
///
/// The struct is zero-sized; live registrations are tracked in the
/// process-wide registries because the JNI exports have no `self`.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge.
    ///
    /// Does not touch JNI. The first JNI call happens lazily when a trait
    /// method is invoked.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }
}

// ---------------------------------------------------------------------------
// LocationServices — android.location.LocationManager
// ---------------------------------------------------------------------------

impl LocationServices for AndroidBridge {
    fn last_known_location(&self, provider: &str) -> Result<Option<LocationFix>> {
        with_jni(|env| {
            let context = app_context()?;
            let manager = system_service(env, context, LOCATION_SERVICE)?;

            let j_provider = env
                .new_string(provider)
                .map_err(|e| jni_err(env, "new_string(provider)", e))?;
            let location = env
                .call_method(
                    &manager,
                    "getLastKnownLocation",
                    "(Ljava/lang/String;)Landroid/location/Location;",
                    &[JValue::Object(&j_provider)],
                )
                .and_then(|v| v.l())
                .map_err(|e| jni_err(env, "getLastKnownLocation", e))?;

            if location.is_null() {
                debug!(provider, "Android: no last known location");
                return Ok(None);
            }

            let latitude = env
                .call_method(&location, "getLatitude", "()D", &[])
                .and_then(|v| v.d())
                .map_err(|e| jni_err(env, "getLatitude", e))?;
            let longitude = env
                .call_method(&location, "getLongitude", "()D", &[])
                .and_then(|v| v.d())
                .map_err(|e| jni_err(env, "getLongitude", e))?;
            let time_ms = env
                .call_method(&location, "getTime", "()J", &[])
                .and_then(|v| v.j())
                .map_err(|e| jni_err(env, "getTime", e))?;

            Ok(Some(fix_from_millis(latitude, longitude, time_ms)))
        })
    }

    fn request_location_updates(
        &self,
        request: &UpdateRequest,
        listener: LocationListener,
    ) -> Result<ListenerId> {
        with_jni(|env| {
            let context = app_context()?;
            let manager = system_service(env, context, LOCATION_SERVICE)?;

            let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            let shim_class = load_app_class(env, context, LOCATION_LISTENER_SHIM)?;
            let shim = env
                .new_object(&shim_class, "(J)V", &[JValue::Long(handle as jlong)])
                .map_err(|e| jni_err(env, "new NativeLocationListener", e))?;
            let shim = env
                .new_global_ref(&shim)
                .map_err(|e| jni_err(env, "new_global_ref(listener)", e))?;

            // Register before the OS can call back.
            live_listeners().lock().map_err(|_| poisoned())?.insert(
                handle,
                LiveListener {
                    listener,
                    shim: shim.clone(),
                },
            );

            let registered = register_updates(env, &manager, request, &shim);
            if let Err(e) = registered {
                if let Ok(mut listeners) = live_listeners().lock() {
                    listeners.remove(&handle);
                }
                return Err(e);
            }

            info!(
                handle,
                provider = %request.provider,
                interval_ms = request.min_interval.as_millis() as u64,
                "Android: location updates requested"
            );
            Ok(ListenerId(handle))
        })
    }

    fn remove_updates(&self, id: ListenerId) -> Result<()> {
        let Some(live) = live_listeners().lock().map_err(|_| poisoned())?.remove(&id.0) else {
            return Ok(());
        };

        with_jni(|env| {
            let context = app_context()?;
            let manager = system_service(env, context, LOCATION_SERVICE)?;
            env.call_method(
                &manager,
                "removeUpdates",
                "(Landroid/location/LocationListener;)V",
                &[JValue::Object(live.shim.as_obj())],
            )
            .map_err(|e| jni_err(env, "removeUpdates", e))?;

            debug!(handle = id.0, "Android: location updates removed");
            Ok(())
        })
    }
}

fn register_updates(
    env: &mut JNIEnv,
    manager: &JObject,
    request: &UpdateRequest,
    shim: &GlobalRef,
) -> Result<()> {
    let looper = env
        .call_static_method("android/os/Looper", "getMainLooper", "()Landroid/os/Looper;", &[])
        .and_then(|v| v.l())
        .map_err(|e| jni_err(env, "Looper.getMainLooper", e))?;
    let j_provider = env
        .new_string(&request.provider)
        .map_err(|e| jni_err(env, "new_string(provider)", e))?;
    env.call_method(
        manager,
        "requestLocationUpdates",
        "(Ljava/lang/String;JFLandroid/location/LocationListener;Landroid/os/Looper;)V",
        &[
            JValue::Object(&j_provider),
            JValue::Long(request.min_interval.as_millis() as jlong),
            JValue::Float(request.min_distance_m),
            JValue::Object(shim.as_obj()),
            JValue::Object(&looper),
        ],
    )
    .map_err(|e| jni_err(env, "requestLocationUpdates", e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Telephony — android.telephony.TelephonyManager
// ---------------------------------------------------------------------------

impl Telephony for AndroidBridge {
    fn sdk_level(&self) -> Result<u32> {
        let level = with_jni(|env| {
            env.get_static_field("android/os/Build$VERSION", "SDK_INT", "I")
                .and_then(|v| v.i())
                .map_err(|e| jni_err(env, "Build.VERSION.SDK_INT", e))
        })?;
        u32::try_from(level)
            .map_err(|_| LocationError::Bridge(format!("negative SDK level {level}")))
    }

    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()> {
        with_jni(|env| {
            let context = app_context()?;
            let telephony = system_service(env, context, TELEPHONY_SERVICE)?;

            let executor = env
                .call_method(
                    context,
                    "getMainExecutor",
                    "()Ljava/util/concurrent/Executor;",
                    &[],
                )
                .and_then(|v| v.l())
                .map_err(|e| jni_err(env, "getMainExecutor", e))?;

            let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            let shim_class = load_app_class(env, context, CELL_INFO_CALLBACK_SHIM)?;
            let shim = env
                .new_object(&shim_class, "(J)V", &[JValue::Long(handle as jlong)])
                .map_err(|e| jni_err(env, "new NativeCellInfoCallback", e))?;

            pending_cell_callbacks()
                .lock()
                .map_err(|_| poisoned())?
                .insert(handle, callback);

            let requested = env
                .call_method(
                    &telephony,
                    "requestCellInfoUpdate",
                    "(Ljava/util/concurrent/Executor;Landroid/telephony/TelephonyManager$CellInfoCallback;)V",
                    &[JValue::Object(&executor), JValue::Object(&shim)],
                )
                .map_err(|e| jni_err(env, "requestCellInfoUpdate", e));

            if let Err(e) = requested {
                if let Ok(mut pending) = pending_cell_callbacks().lock() {
                    pending.remove(&handle);
                }
                return Err(e);
            }

            debug!(handle, "Android: cell info update requested");
            Ok(())
        })
    }
}

/// Read the serving cell, element 0 of a `java.util.List<CellInfo>`.
/// Neighbouring cells are never touched.
fn read_serving_cell(env: &mut JNIEnv, list: &JObject) -> Result<Vec<CellIdentityRecord>> {
    if list.is_null() {
        return Ok(Vec::new());
    }
    let size = env
        .call_method(list, "size", "()I", &[])
        .and_then(|v| v.i())
        .map_err(|e| jni_err(env, "List.size", e))?;

    serving_cell(size, |index| {
        let info = env
            .call_method(list, "get", "(I)Ljava/lang/Object;", &[JValue::Int(index)])
            .and_then(|v| v.l())
            .map_err(|e| jni_err(env, "List.get", e))?;
        let identity = env
            .call_method(&info, "getCellIdentity", "()Landroid/telephony/CellIdentity;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_err(env, "CellInfo.getCellIdentity", e))?;
        read_cell_identity(env, &identity)
    })
}

/// At most one record: the one at index 0, read only if the list has any.
fn serving_cell(
    size: i32,
    read_at: impl FnOnce(i32) -> Result<CellIdentityRecord>,
) -> Result<Vec<CellIdentityRecord>> {
    if size <= 0 {
        return Ok(Vec::new());
    }
    Ok(vec![read_at(0)?])
}

fn is_instance(env: &mut JNIEnv, obj: &JObject, class: &str) -> bool {
    match env.is_instance_of(obj, class) {
        Ok(is) => is,
        Err(_) => {
            // Class missing on this OS version (e.g. CellIdentityNr before API 29).
            let _ = env.exception_clear();
            false
        }
    }
}

fn int_getter(env: &mut JNIEnv, obj: &JObject, method: &str) -> Result<i32> {
    env.call_method(obj, method, "()I", &[])
        .and_then(|v| v.i())
        .map_err(|e| jni_err(env, method, e))
}

fn long_getter(env: &mut JNIEnv, obj: &JObject, method: &str) -> Result<i64> {
    env.call_method(obj, method, "()J", &[])
        .and_then(|v| v.j())
        .map_err(|e| jni_err(env, method, e))
}

fn string_getter(env: &mut JNIEnv, obj: &JObject, method: &str) -> Result<Option<String>> {
    let value = env
        .call_method(obj, method, "()Ljava/lang/String;", &[])
        .and_then(|v| v.l())
        .map_err(|e| jni_err(env, method, e))?;
    Ok(read_string(env, value))
}

fn read_cell_identity(env: &mut JNIEnv, identity: &JObject) -> Result<CellIdentityRecord> {
    if identity.is_null() {
        return Ok(CellIdentityRecord::Unknown);
    }

    if is_instance(env, identity, "android/telephony/CellIdentityCdma") {
        return Ok(CellIdentityRecord::Cdma {
            latitude: int_getter(env, identity, "getLatitude")?,
            longitude: int_getter(env, identity, "getLongitude")?,
        });
    }
    if is_instance(env, identity, "android/telephony/CellIdentityGsm") {
        return Ok(CellIdentityRecord::Gsm {
            mcc: string_getter(env, identity, "getMccString")?,
            mnc: string_getter(env, identity, "getMncString")?,
            cid: int_getter(env, identity, "getCid")?,
            lac: int_getter(env, identity, "getLac")?,
        });
    }
    if is_instance(env, identity, "android/telephony/CellIdentityLte") {
        return Ok(CellIdentityRecord::Lte {
            mcc: string_getter(env, identity, "getMccString")?,
            mnc: string_getter(env, identity, "getMncString")?,
            ci: int_getter(env, identity, "getCi")?,
            tac: int_getter(env, identity, "getTac")?,
        });
    }
    if is_instance(env, identity, "android/telephony/CellIdentityNr") {
        return Ok(CellIdentityRecord::Nr {
            mcc: string_getter(env, identity, "getMccString")?,
            mnc: string_getter(env, identity, "getMncString")?,
            nci: long_getter(env, identity, "getNci")?,
            tac: int_getter(env, identity, "getTac")?,
        });
    }
    if is_instance(env, identity, "android/telephony/CellIdentityTdscdma") {
        return Ok(CellIdentityRecord::Tdscdma {
            mcc: string_getter(env, identity, "getMccString")?,
            mnc: string_getter(env, identity, "getMncString")?,
            cid: int_getter(env, identity, "getCid")?,
            lac: int_getter(env, identity, "getLac")?,
        });
    }
    if is_instance(env, identity, "android/telephony/CellIdentityWcdma") {
        return Ok(CellIdentityRecord::Wcdma {
            mcc: string_getter(env, identity, "getMccString")?,
            mnc: string_getter(env, identity, "getMncString")?,
            cid: int_getter(env, identity, "getCid")?,
            lac: int_getter(env, identity, "getLac")?,
        });
    }
    Ok(CellIdentityRecord::Unknown)
}

// ---------------------------------------------------------------------------
// BatteryStatus — android.os.BatteryManager
// ---------------------------------------------------------------------------

impl BatteryStatus for AndroidBridge {
    fn battery_level(&self) -> Result<u8> {
        let capacity = with_jni(|env| {
            let context = app_context()?;
            let manager = system_service(env, context, BATTERY_SERVICE)?;
            env.call_method(
                &manager,
                "getIntProperty",
                "(I)I",
                &[JValue::Int(BATTERY_PROPERTY_CAPACITY)],
            )
            .and_then(|v| v.i())
            .map_err(|e| jni_err(env, "getIntProperty(CAPACITY)", e))
        })?;
        // The OS answers Integer.MIN_VALUE when the property is unsupported.
        u8::try_from(capacity)
            .ok()
            .filter(|level| *level <= 100)
            .ok_or_else(|| LocationError::Bridge(format!("battery capacity unavailable ({capacity})")))
    }
}

// ---------------------------------------------------------------------------
// JNI exports called by the runtime and the host shims
// ---------------------------------------------------------------------------

/// A panic must not unwind into the JVM.
fn guarded(export: &str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(export, "Android: panic in JNI callback contained");
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    // SAFETY: the runtime passes its own JavaVM, valid for the process lifetime.
    match unsafe { JavaVM::from_raw(vm) } {
        Ok(vm) => {
            let _ = JAVA_VM.set(vm);
        }
        Err(e) => warn!(error = %e, "Android: JNI_OnLoad without a JavaVM"),
    }
    JNI_VERSION_1_6
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_fr_ninico_aosp_1location_NativeBridge_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    context: JObject,
) {
    guarded("nativeInit", || {
        if let Err(e) = register_context(&mut env, &context) {
            warn!(error = %e, "Android: context registration failed");
        }
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_fr_ninico_aosp_1location_NativeLocationListener_nativeOnLocationChanged(
    _env: JNIEnv,
    _this: JObject,
    handle: jlong,
    latitude: jdouble,
    longitude: jdouble,
    time_ms: jlong,
) {
    guarded("nativeOnLocationChanged", || {
        let listener = live_listeners().lock().ok().and_then(|listeners| {
            listeners
                .get(&(handle as u64))
                .map(|live| Arc::clone(&live.listener))
        });

        match listener {
            Some(listener) => listener(fix_from_millis(latitude, longitude, time_ms)),
            None => debug!(handle, "Android: update for removed listener dropped"),
        }
    });
}

fn take_cell_callback(handle: jlong) -> Option<CellInfoCallback> {
    let callback = pending_cell_callbacks()
        .lock()
        .ok()
        .and_then(|mut pending| pending.remove(&(handle as u64)));
    if callback.is_none() {
        warn!(handle, "Android: cell info for unknown request dropped");
    }
    callback
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_fr_ninico_aosp_1location_NativeCellInfoCallback_nativeOnCellInfo(
    mut env: JNIEnv,
    _this: JObject,
    handle: jlong,
    cell_infos: JObject,
) {
    guarded("nativeOnCellInfo", || {
        let Some(callback) = take_cell_callback(handle) else {
            return;
        };
        let event = match read_serving_cell(&mut env, &cell_infos) {
            Ok(cells) => CellInfoEvent::CellInfo(cells),
            Err(e) => CellInfoEvent::Error {
                code: -1,
                detail: Some(e.to_string()),
            },
        };
        callback(event);
    });
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_fr_ninico_aosp_1location_NativeCellInfoCallback_nativeOnError(
    mut env: JNIEnv,
    _this: JObject,
    handle: jlong,
    code: jint,
    detail: JString,
) {
    guarded("nativeOnError", || {
        let Some(callback) = take_cell_callback(handle) else {
            return;
        };
        let detail = read_string(&mut env, JObject::from(detail));
        callback(CellInfoEvent::Error { code, detail });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn calls_before_registration_fail_without_panicking() {
        let bridge = AndroidBridge::new();

        assert!(matches!(java_vm(), Err(LocationError::Bridge(_))));
        assert!(matches!(app_context(), Err(LocationError::Bridge(_))));
        assert!(matches!(
            bridge.last_known_location("gps"),
            Err(LocationError::Bridge(_))
        ));
        assert!(matches!(bridge.battery_level(), Err(LocationError::Bridge(_))));
        assert!(matches!(bridge.sdk_level(), Err(LocationError::Bridge(_))));
    }

    #[test]
    fn only_the_serving_cell_is_read() {
        let reads = Cell::new(0);
        let cells = serving_cell(3, |index| {
            reads.set(reads.get() + 1);
            assert_eq!(index, 0);
            Ok(CellIdentityRecord::Unknown)
        })
        .unwrap();

        assert_eq!(cells, vec![CellIdentityRecord::Unknown]);
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn empty_list_reads_nothing() {
        let cells = serving_cell(0, |_| panic!("no cell to read")).unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn serving_cell_failure_is_reported() {
        let err = serving_cell(2, |_| Err(LocationError::Bridge("getCid".into()))).unwrap_err();
        assert!(err.to_string().contains("getCid"));
    }

    #[test]
    fn panicking_callback_is_contained() {
        guarded("test", || panic!("listener bug"));
    }
}
