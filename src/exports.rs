//! JNI entry points for the Java side of the bridge.
//!
//! The Java classes declare `private static native` methods taking the
//! handle as a `long`, so no entry point needs to call back into Java to
//! find it. Symbol names follow the standard JNI mangling of package
//! `com.github.novelrt.fumocement`.
//!
//! Errors cannot cross `extern "system"` as `Result`, so entry points that
//! can fail raise a `java.lang.RuntimeException` and return a zero value.

use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

use jni_sys::{jboolean, jbyteArray, jclass, jint, jlong, jobject, JNIEnv, JavaVM};
use tracing::debug;

use crate::bytes::{bytes_to_java, StringDeletion};
use crate::cache::CachedClass;
use crate::callback::CallbackContext;
use crate::config;
use crate::error::Error;
use crate::ffi::JniEnv;
use crate::pointer::{
    native_address_width, CellKind, Char, Float32, Float64, Indirect, Int16, Int32, Int64, Int8,
    Pointer, UInt16, UInt32, UInt64, UInt8, UIntPtr,
};

/// Mangled JNI symbol for `method` of `class` (relative to the package).
macro_rules! java_name {
    ($class:literal, $method:literal) => {
        concat!("Java_com_github_novelrt_fumocement_", $class, "_", $method)
    };
}

/// Export allocate/destroy/get/set for one cell kind.
macro_rules! export_cell {
    (
        $module:ident: $class:literal => $kind:ty,
        alloc = $alloc:literal,
        get = $get:literal,
        set = $set:literal $(,)?
    ) => {
        pub mod $module {
            use super::*;

            #[export_name = java_name!($class, $alloc)]
            pub unsafe extern "system" fn allocate(_env: *mut JNIEnv, _class: jclass) -> jlong {
                Pointer::<$kind>::allocate().into_raw()
            }

            #[export_name = java_name!($class, "destroyPointer")]
            pub unsafe extern "system" fn destroy(_env: *mut JNIEnv, _class: jclass, handle: jlong) {
                Pointer::<$kind>::from_raw(handle).destroy()
            }

            #[export_name = java_name!($class, $get)]
            pub unsafe extern "system" fn get(
                _env: *mut JNIEnv,
                _class: jclass,
                handle: jlong,
            ) -> <$kind as CellKind>::Host {
                Pointer::<$kind>::from_raw(handle).get()
            }

            #[export_name = java_name!($class, $set)]
            pub unsafe extern "system" fn set(
                _env: *mut JNIEnv,
                _class: jclass,
                handle: jlong,
                value: <$kind as CellKind>::Host,
            ) {
                Pointer::<$kind>::from_raw(handle).set(value)
            }
        }
    };
}

export_cell!(int8_pointer: "builtin_Int8Pointer" => Int8,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(int16_pointer: "builtin_Int16Pointer" => Int16,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(int32_pointer: "builtin_Int32Pointer" => Int32,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(int64_pointer: "builtin_Int64Pointer" => Int64,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(uint8_pointer: "builtin_UInt8Pointer" => UInt8,
    alloc = "allocatePointer", get = "getUnsignedValue", set = "setUnsignedValue");
export_cell!(uint16_pointer: "builtin_UInt16Pointer" => UInt16,
    alloc = "allocatePointer", get = "getUnsignedValue", set = "setUnsignedValue");
export_cell!(uint32_pointer: "builtin_UInt32Pointer" => UInt32,
    alloc = "allocatePointer", get = "getUnsignedValue", set = "setUnsignedValue");
export_cell!(uint64_pointer: "builtin_UInt64Pointer" => UInt64,
    alloc = "allocatePointer", get = "getUnsignedValue", set = "setUnsignedValue");
export_cell!(float_pointer: "builtin_FloatPointer" => Float32,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(double_pointer: "builtin_DoublePointer" => Float64,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(uintptr_pointer: "builtin_UIntPtrPointer" => UIntPtr,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(char_pointer: "builtin_CharPointer" => Char,
    alloc = "allocatePointer", get = "getValue", set = "setValue");
export_cell!(indirected_pointer: "IndirectedPointer" => Indirect,
    alloc = "createPointer", get = "getNativeUnderlyingHandle", set = "setNativeUnderlyingHandle");

/// `CharPointer.readAsNullTerminatedString(long, boolean)`.
#[export_name = java_name!("builtin_CharPointer", "readAsNullTerminatedString")]
pub unsafe extern "system" fn read_as_null_terminated_string(
    env: *mut JNIEnv,
    _class: jclass,
    handle: jlong,
    delete_string: jboolean,
) -> jbyteArray {
    let env = JniEnv::from_raw(env);
    let string = Pointer::<Char>::from_raw(handle).as_ptr();
    match bytes_to_java(env, string, StringDeletion::from(delete_string)) {
        Ok(array) => array,
        Err(err) => {
            throw_runtime_exception(env, &err);
            ptr::null_mut()
        }
    }
}

/// `FunctionPointer.createPointerContext(Object)`.
#[export_name = java_name!("FunctionPointer", "createPointerContext")]
pub unsafe extern "system" fn create_pointer_context(
    env: *mut JNIEnv,
    _class: jclass,
    object: jobject,
) -> jlong {
    let env = JniEnv::from_raw(env);
    match CallbackContext::new(env, object, config::current()) {
        Ok(context) => context.into_handle(),
        Err(err) => {
            throw_runtime_exception(env, &err);
            0
        }
    }
}

/// `FunctionPointer.destroyPointerContext(long)`.
#[export_name = java_name!("FunctionPointer", "destroyPointerContext")]
pub unsafe extern "system" fn destroy_pointer_context(env: *mut JNIEnv, _class: jclass, handle: jlong) {
    CallbackContext::from_handle_owned(handle).release(JniEnv::from_raw(env));
}

/// `Pointers.getNativeLongSize()`.
#[export_name = java_name!("Pointers", "getNativeLongSize")]
pub extern "system" fn pointers_native_long_size(_env: *mut JNIEnv, _class: jclass) -> jint {
    native_address_width()
}

/// `PointerOperations.getNativeLongSize()`.
#[export_name = java_name!("PointerOperations", "getNativeLongSize")]
pub extern "system" fn pointer_operations_native_long_size(_env: *mut JNIEnv, _class: jclass) -> jint {
    native_address_width()
}

/// Called by the JVM when the library is loaded. Reads the configuration
/// so later calls see a settled value.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn JNI_OnLoad(_vm: *mut JavaVM, _reserved: *mut c_void) -> jint {
    let config = config::current();
    debug!(?config, "library loaded");
    config.jni_version
}

static RUNTIME_EXCEPTION: CachedClass = CachedClass::new("java/lang/RuntimeException");

/// Raise `err` in Java as a `java.lang.RuntimeException`.
///
/// Does nothing if an exception is already pending, so the first cause
/// (for example a `NoClassDefFoundError` from a failed lookup) wins.
///
/// # Safety
///
/// `env` must belong to the calling thread.
pub unsafe fn throw_runtime_exception(env: JniEnv, err: &Error) {
    if env.exception_check() {
        return;
    }

    let class = match RUNTIME_EXCEPTION.get(&env) {
        Ok(class) => class,
        Err(_) => return,
    };

    let message = CString::new(err.to_string().replace('\0', " ")).unwrap_or_default();
    env.throw_new(class.as_raw(), &message);
}
