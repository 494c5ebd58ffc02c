//! Thin wrappers over the JNI function tables.
//!
//! `JniEnv` and `JavaVm` are copyable views of the `JNIEnv*` and `JavaVM*`
//! pointers the JVM hands to native code. They perform no reference
//! management of their own; every method maps onto exactly one JNI call.

use std::ffi::CStr;
use std::os::raw::c_void;
use std::ptr;

pub use jni_sys::{
    jboolean, jbyte, jbyteArray, jchar, jclass, jdouble, jfieldID, jfloat, jint, jlong,
    jmethodID, jobject, jshort, jsize, JNIEnv, JavaVM, JavaVMAttachArgs, JNI_ABORT,
    JNI_EDETACHED, JNI_FALSE, JNI_OK, JNI_TRUE, JNI_VERSION_1_2, JNI_VERSION_1_6,
};

use super::error::{check_status, JniStatus};
use crate::error::{Error, Result};

/// Call a function from a JNI function table.
///
/// Every slot of a table handed out by a JVM is populated, so a missing slot
/// is a broken runtime rather than a recoverable condition.
macro_rules! jni_call {
    ($table:expr, $name:ident $(, $arg:expr)* $(,)?) => {{
        let table = $table;
        let f = (**table)
            .$name
            .expect(concat!("JNI function table has no ", stringify!($name)));
        f(table $(, $arg)*)
    }};
}

/// A `JNIEnv*` valid on the current thread.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JniEnv {
    raw: *mut JNIEnv,
}

impl JniEnv {
    /// Wrap a raw environment pointer.
    ///
    /// # Safety
    ///
    /// `raw` must be a non-null `JNIEnv*` obtained from the JVM for the
    /// calling thread, and the wrapper must not be used from another thread.
    #[inline]
    pub unsafe fn from_raw(raw: *mut JNIEnv) -> Self {
        debug_assert!(!raw.is_null());
        Self { raw }
    }

    /// The raw `JNIEnv*`.
    #[inline]
    pub fn as_raw(self) -> *mut JNIEnv {
        self.raw
    }

    /// Whether a Java exception is pending on this thread.
    pub fn exception_check(self) -> bool {
        unsafe { jni_call!(self.raw, ExceptionCheck) != JNI_FALSE }
    }

    /// `FindClass`. Returns a local reference, or null with an exception
    /// pending.
    pub unsafe fn find_class(self, name: &CStr) -> jclass {
        jni_call!(self.raw, FindClass, name.as_ptr())
    }

    pub unsafe fn new_global_ref(self, obj: jobject) -> jobject {
        jni_call!(self.raw, NewGlobalRef, obj)
    }

    pub unsafe fn delete_global_ref(self, obj: jobject) {
        jni_call!(self.raw, DeleteGlobalRef, obj)
    }

    pub unsafe fn delete_local_ref(self, obj: jobject) {
        jni_call!(self.raw, DeleteLocalRef, obj)
    }

    pub unsafe fn get_field_id(self, class: jclass, name: &CStr, sig: &CStr) -> jfieldID {
        jni_call!(self.raw, GetFieldID, class, name.as_ptr(), sig.as_ptr())
    }

    pub unsafe fn get_static_field_id(self, class: jclass, name: &CStr, sig: &CStr) -> jfieldID {
        jni_call!(self.raw, GetStaticFieldID, class, name.as_ptr(), sig.as_ptr())
    }

    pub unsafe fn get_method_id(self, class: jclass, name: &CStr, sig: &CStr) -> jmethodID {
        jni_call!(self.raw, GetMethodID, class, name.as_ptr(), sig.as_ptr())
    }

    pub unsafe fn get_static_method_id(self, class: jclass, name: &CStr, sig: &CStr) -> jmethodID {
        jni_call!(self.raw, GetStaticMethodID, class, name.as_ptr(), sig.as_ptr())
    }

    /// The JavaVM this environment belongs to.
    pub fn java_vm(self) -> Result<JavaVm> {
        let mut vm: *mut JavaVM = ptr::null_mut();
        let code = unsafe { jni_call!(self.raw, GetJavaVM, &mut vm) };
        check_status(code, Error::JavaVmUnavailable)?;
        if vm.is_null() {
            return Err(Error::JavaVmUnavailable(JniStatus::Unknown));
        }
        Ok(JavaVm { raw: vm })
    }

    pub unsafe fn array_length(self, array: jbyteArray) -> jsize {
        jni_call!(self.raw, GetArrayLength, array)
    }

    /// `GetByteArrayElements`. Must be paired with
    /// [`release_byte_array_elements`](Self::release_byte_array_elements).
    pub unsafe fn byte_array_elements(self, array: jbyteArray) -> *mut jbyte {
        jni_call!(self.raw, GetByteArrayElements, array, ptr::null_mut())
    }

    pub unsafe fn release_byte_array_elements(self, array: jbyteArray, elems: *mut jbyte, mode: jint) {
        jni_call!(self.raw, ReleaseByteArrayElements, array, elems, mode)
    }

    pub unsafe fn new_byte_array(self, len: jsize) -> jbyteArray {
        jni_call!(self.raw, NewByteArray, len)
    }

    pub unsafe fn set_byte_array_region(self, array: jbyteArray, start: jsize, buf: &[jbyte]) {
        jni_call!(
            self.raw,
            SetByteArrayRegion,
            array,
            start,
            buf.len() as jsize,
            buf.as_ptr()
        )
    }

    /// `ThrowNew`: raise a new exception of `class` with `message`.
    pub unsafe fn throw_new(self, class: jclass, message: &CStr) -> jint {
        jni_call!(self.raw, ThrowNew, class, message.as_ptr())
    }
}

/// A `JavaVM*`. Valid for the life of the process and usable from any
/// thread.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JavaVm {
    raw: *mut JavaVM,
}

// The invocation interface is explicitly thread-safe.
unsafe impl Send for JavaVm {}
unsafe impl Sync for JavaVm {}

impl JavaVm {
    /// Wrap a raw VM pointer.
    ///
    /// # Safety
    ///
    /// `raw` must be a non-null `JavaVM*` that outlives every use of the
    /// wrapper.
    #[inline]
    pub unsafe fn from_raw(raw: *mut JavaVM) -> Self {
        debug_assert!(!raw.is_null());
        Self { raw }
    }

    #[inline]
    pub fn as_raw(self) -> *mut JavaVM {
        self.raw
    }

    /// `GetEnv` for the calling thread.
    pub fn get_env(self, version: jint) -> std::result::Result<JniEnv, JniStatus> {
        let mut env: *mut c_void = ptr::null_mut();
        let code = unsafe { jni_call!(self.raw, GetEnv, &mut env, version) };
        match JniStatus::from_code(code) {
            JniStatus::Ok if !env.is_null() => Ok(JniEnv { raw: env.cast() }),
            JniStatus::Ok => Err(JniStatus::Unknown),
            status => Err(status),
        }
    }

    /// `AttachCurrentThreadAsDaemon`. A daemon thread does not keep the JVM
    /// alive at shutdown.
    pub fn attach_current_thread_as_daemon(
        self,
        args: Option<&mut JavaVMAttachArgs>,
    ) -> std::result::Result<JniEnv, JniStatus> {
        let mut env: *mut c_void = ptr::null_mut();
        let args = args.map_or(ptr::null_mut(), |a| a as *mut JavaVMAttachArgs as *mut c_void);
        let code = unsafe { jni_call!(self.raw, AttachCurrentThreadAsDaemon, &mut env, args) };
        match JniStatus::from_code(code) {
            JniStatus::Ok if !env.is_null() => Ok(JniEnv { raw: env.cast() }),
            JniStatus::Ok => Err(JniStatus::Unknown),
            status => Err(status),
        }
    }

    /// `DetachCurrentThread`.
    pub fn detach_current_thread(self) -> JniStatus {
        JniStatus::from_code(unsafe { jni_call!(self.raw, DetachCurrentThread) })
    }
}
