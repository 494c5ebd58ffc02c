//! Byte strings crossing the boundary.
//!
//! Java passes strings to native code as `byte[]` holding already-encoded
//! text, and receives them back the same way. The two directions follow
//! different rules:
//!
//! * `byte[]` to native keeps every byte, embedded zeros included.
//! * a native `char*` to `byte[]` stops at the first zero byte, whatever
//!   the size of the allocation behind it.

use std::alloc::{handle_alloc_error, Layout};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use jni_sys::{jboolean, jbyte, jbyteArray, jsize, JNI_ABORT, JNI_FALSE};

use crate::error::{Error, Result};
use crate::ffi::JniEnv;

/// What to do with a native string once it has been copied into Java.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringDeletion {
    /// Free the native buffer. The caller gives up ownership.
    Delete,
    /// Leave the native buffer alone.
    #[default]
    Keep,
}

impl StringDeletion {
    pub fn is_deleting(self) -> bool {
        self == StringDeletion::Delete
    }
}

impl From<bool> for StringDeletion {
    fn from(delete: bool) -> Self {
        if delete {
            StringDeletion::Delete
        } else {
            StringDeletion::Keep
        }
    }
}

impl From<jboolean> for StringDeletion {
    fn from(delete: jboolean) -> Self {
        StringDeletion::from(delete != JNI_FALSE)
    }
}

/// An owned copy of bytes received from Java, kept NUL-terminated so it can
/// be handed to C as a `const char*`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NativeBytes {
    // Always ends with one extra zero byte.
    buf: Vec<u8>,
}

impl NativeBytes {
    /// Copy `bytes`, embedded zeros included.
    pub fn new(bytes: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.extend_from_slice(bytes);
        buf.push(0);
        Self { buf }
    }

    /// The copied bytes, without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buf.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pointer to the NUL-terminated buffer. A C reader stops at the first
    /// embedded zero, if any.
    pub fn as_ptr(&self) -> *const c_char {
        self.buf.as_ptr().cast()
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.pop();
        self.buf
    }
}

impl std::fmt::Debug for NativeBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeBytes")
            .field(&String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// Pass an optional string to C: null when absent.
pub fn pass_as_c(bytes: Option<&NativeBytes>) -> *const c_char {
    bytes.map_or(ptr::null(), NativeBytes::as_ptr)
}

/// Copy the NUL-terminated string at `ptr`, then free it if `deletion` says
/// so. Returns `None` for a null pointer.
///
/// # Safety
///
/// `ptr` must be null or point to a readable NUL-terminated buffer. With
/// [`StringDeletion::Delete`] the buffer must come from the C allocator and
/// must not be used again by the caller.
pub unsafe fn scan_c_string(ptr: *const c_char, deletion: StringDeletion) -> Option<Vec<u8>> {
    if ptr.is_null() {
        return None;
    }

    let bytes = CStr::from_ptr(ptr).to_bytes().to_vec();

    if deletion.is_deleting() {
        free_c_string(ptr as *mut c_char);
    }

    Some(bytes)
}

/// Allocate a C buffer holding `bytes` followed by a zero byte.
///
/// The buffer comes from the C allocator, so it can be handed over with
/// [`StringDeletion::Delete`] or released with [`free_c_string`]. Running out
/// of memory aborts the process.
pub fn alloc_c_string(bytes: &[u8]) -> *mut c_char {
    let size = bytes.len() + 1;
    unsafe {
        let buf = libc::malloc(size) as *mut u8;
        if buf.is_null() {
            // Layout::array only fails above isize::MAX, which malloc would
            // not have been asked for.
            let layout = Layout::array::<u8>(size).unwrap_or(Layout::new::<u8>());
            handle_alloc_error(layout);
        }
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
        *buf.add(bytes.len()) = 0;
        buf.cast()
    }
}

/// Release a buffer from the C allocator.
///
/// # Safety
///
/// `ptr` must be null or come from `malloc` (for instance through
/// [`alloc_c_string`]) and must not have been freed already.
pub unsafe fn free_c_string(ptr: *mut c_char) {
    libc::free(ptr.cast());
}

/// Copy a Java `byte[]` into native memory.
///
/// A null array yields `None`. The array elements are released back to the
/// JVM before returning.
///
/// # Safety
///
/// `array` must be null or a valid `byte[]` reference for `env`.
pub unsafe fn bytes_from_java(env: JniEnv, array: jbyteArray) -> Result<Option<NativeBytes>> {
    if array.is_null() {
        return Ok(None);
    }

    let len = env.array_length(array);
    let elements = env.byte_array_elements(array);
    if elements.is_null() {
        return Err(Error::JavaException("GetByteArrayElements"));
    }

    let copied = {
        let slice = std::slice::from_raw_parts(elements as *const u8, len.max(0) as usize);
        NativeBytes::new(slice)
    };

    // Nothing was written, so nothing needs copying back.
    env.release_byte_array_elements(array, elements, JNI_ABORT);

    Ok(Some(copied))
}

/// Copy the NUL-terminated string at `ptr` into a new Java `byte[]`.
///
/// A null pointer yields a null array. With [`StringDeletion::Delete`] the
/// native buffer is freed as part of the call.
///
/// # Safety
///
/// Same contract as [`scan_c_string`]; `env` must belong to the calling
/// thread.
pub unsafe fn bytes_to_java(
    env: JniEnv,
    ptr: *const c_char,
    deletion: StringDeletion,
) -> Result<jbyteArray> {
    let bytes = match scan_c_string(ptr, deletion) {
        Some(bytes) => bytes,
        None => return Ok(ptr::null_mut()),
    };

    let len = jsize::try_from(bytes.len()).map_err(|_| {
        Error::InvalidArgument(format!("string of {} bytes exceeds a Java array", bytes.len()))
    })?;

    let array = env.new_byte_array(len);
    if array.is_null() {
        return Err(Error::JavaException("NewByteArray"));
    }

    let signed: &[jbyte] = std::slice::from_raw_parts(bytes.as_ptr().cast(), bytes.len());
    env.set_byte_array_region(array, 0, signed);

    Ok(array)
}
