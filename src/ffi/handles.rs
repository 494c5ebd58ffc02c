//! Handle types for resolved JNI identifiers, and the encoding of native
//! addresses as Java `long`s.
//!
//! Each identifier handle is a newtype wrapper around the address-sized
//! integer value of the JNI pointer, which keeps it `Send + Sync` so it can
//! live in process-wide caches.

use jni_sys::{jclass, jfieldID, jlong, jmethodID};

/// Macro to define a handle type.
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident => $raw:ty) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            _h: usize,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self { _h: 0 }
            }

            /// Check if this handle is valid (non-null).
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self._h != 0
            }

            /// Wrap a raw JNI value.
            #[inline]
            pub fn from_raw(raw: $raw) -> Self {
                Self { _h: raw as usize }
            }

            /// The raw JNI value.
            #[inline]
            pub fn as_raw(&self) -> $raw {
                self._h as $raw
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

define_handle!(
    /// A class pinned by a JNI global reference.
    ClassHandle => jclass
);
define_handle!(
    /// A resolved `jfieldID`, instance or static.
    FieldHandle => jfieldID
);
define_handle!(
    /// A resolved `jmethodID`, instance or static.
    MethodHandle => jmethodID
);

/// Encode a native address as a Java `long`.
#[inline]
pub fn to_java_pointer<T>(pointer: *const T) -> jlong {
    pointer as usize as jlong
}

/// Decode a Java `long` back into a native address.
///
/// On 32-bit targets the upper half of the `long` is discarded.
#[inline]
pub fn to_native_pointer<T>(handle: jlong) -> *mut T {
    handle as usize as *mut T
}
