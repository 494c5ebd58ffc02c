//! Conversions between native primitives and their JNI wire types.
//!
//! Same-width signed and floating types pass through unchanged. Unsigned
//! native types travel in the JNI cell of equal width with the bit pattern
//! preserved, so `255u8` arrives in Java as the `byte` `-1`. Java callers
//! restore the unsigned reading with `Byte.toUnsignedInt` and friends.

use std::os::raw::c_char;

use jni_sys::{jboolean, jbyte, jchar, jdouble, jfloat, jint, jlong, jshort, JNI_FALSE, JNI_TRUE};

/// A native primitive with a fixed JNI representation.
pub trait NativePrimitive: Copy {
    /// The JNI type carrying this primitive across the boundary.
    type Host: Copy;

    /// Convert to the JNI representation.
    fn to_host(self) -> Self::Host;

    /// Convert from the JNI representation.
    fn from_host(host: Self::Host) -> Self;
}

macro_rules! bit_cast_primitive {
    ($($native:ty => $host:ty),* $(,)?) => {
        $(
            impl NativePrimitive for $native {
                type Host = $host;

                #[inline]
                fn to_host(self) -> $host {
                    self as $host
                }

                #[inline]
                fn from_host(host: $host) -> Self {
                    host as $native
                }
            }
        )*
    };
}

// `as` between integers of equal width reinterprets the bits.
bit_cast_primitive! {
    i8 => jbyte,
    i16 => jshort,
    i32 => jint,
    i64 => jlong,
    u8 => jbyte,
    u16 => jchar,
    u32 => jint,
    u64 => jlong,
    f32 => jfloat,
    f64 => jdouble,
}

impl NativePrimitive for bool {
    type Host = jboolean;

    #[inline]
    fn to_host(self) -> jboolean {
        if self {
            JNI_TRUE
        } else {
            JNI_FALSE
        }
    }

    #[inline]
    fn from_host(host: jboolean) -> Self {
        host != JNI_FALSE
    }
}

/// `usize` travels as a `long`. On 32-bit targets the upper half is dropped
/// on the way in.
impl NativePrimitive for usize {
    type Host = jlong;

    #[inline]
    fn to_host(self) -> jlong {
        self as u64 as jlong
    }

    #[inline]
    fn from_host(host: jlong) -> Self {
        host as usize
    }
}

/// Convert a native primitive to its JNI representation.
#[inline]
pub fn to_java_primitive<N: NativePrimitive>(native: N) -> N::Host {
    native.to_host()
}

/// Convert a JNI value to the native primitive.
#[inline]
pub fn to_native_primitive<N: NativePrimitive>(host: N::Host) -> N {
    N::from_host(host)
}

/// Carry a C `char` as a Java `byte`.
#[inline]
pub fn char_to_java(native: c_char) -> jbyte {
    native as jbyte
}

/// Read a Java `byte` as a C `char`.
#[inline]
pub fn char_from_java_byte(host: jbyte) -> c_char {
    host as c_char
}

/// Narrow a Java `char` to a C `char`, keeping the low 8 bits.
#[inline]
pub fn char_from_java(host: jchar) -> c_char {
    host as u8 as c_char
}
