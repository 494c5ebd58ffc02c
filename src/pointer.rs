//! Native primitive cells addressed by opaque Java `long` handles.
//!
//! Java code holds native memory as a plain `long`. A [`Pointer<K>`] is that
//! `long` with the kind of cell it addresses attached at the type level. It
//! is a capability token, not a smart pointer: it has no `Drop`, and every
//! cell obtained from [`Pointer::allocate`] must be handed back to
//! [`Pointer::destroy`] exactly once.
//!
//! All kinds share one implementation, parameterized by [`CellKind`].
//!
//! # Example
//!
//! ```
//! use jni_bridge::pointer::{Int32, Pointer, UInt8};
//!
//! let cell = Pointer::<Int32>::allocate();
//! unsafe {
//!     cell.set(-7);
//!     assert_eq!(cell.get(), -7);
//!     cell.destroy();
//! }
//!
//! let byte = Pointer::<UInt8>::allocate();
//! unsafe {
//!     byte.set(255u8 as i8);
//!     assert_eq!(byte.get(), -1);
//!     assert_eq!(byte.get() as u8, 255);
//!     byte.destroy();
//! }
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem::{size_of, MaybeUninit};
use std::os::raw::{c_char, c_void};

use jni_sys::{jbyte, jint, jlong};
use once_cell::sync::Lazy;

use crate::bytes::{scan_c_string, StringDeletion};
use crate::convert::{char_from_java_byte, char_to_java, NativePrimitive};
use crate::ffi::{to_java_pointer, to_native_pointer};

/// Static description of a cell kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    pub name: &'static str,
    /// Size of one cell in bytes.
    pub size: usize,
    pub signed: bool,
    pub float: bool,
}

/// A kind of native cell and the conversion of its contents to and from
/// the JNI type Java reads and writes.
pub trait CellKind: 'static {
    /// The type stored in native memory.
    type Native: Copy;
    /// The JNI type exchanged with Java.
    type Host: Copy;

    const DESCRIPTOR: KindDescriptor;

    fn to_host(native: Self::Native) -> Self::Host;

    fn to_native(host: Self::Host) -> Self::Native;
}

macro_rules! primitive_kind {
    ($($(#[$meta:meta])* $kind:ident($native:ty) { signed: $signed:expr, float: $float:expr })*) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $kind {}

            impl CellKind for $kind {
                type Native = $native;
                type Host = <$native as NativePrimitive>::Host;

                const DESCRIPTOR: KindDescriptor = KindDescriptor {
                    name: stringify!($kind),
                    size: size_of::<$native>(),
                    signed: $signed,
                    float: $float,
                };

                #[inline]
                fn to_host(native: $native) -> Self::Host {
                    native.to_host()
                }

                #[inline]
                fn to_native(host: Self::Host) -> $native {
                    <$native as NativePrimitive>::from_host(host)
                }
            }
        )*
    };
}

primitive_kind! {
    /// `int8_t`, read and written as `byte`.
    Int8(i8) { signed: true, float: false }
    /// `int16_t`, read and written as `short`.
    Int16(i16) { signed: true, float: false }
    /// `int32_t`, read and written as `int`.
    Int32(i32) { signed: true, float: false }
    /// `int64_t`, read and written as `long`.
    Int64(i64) { signed: true, float: false }
    /// `uint8_t`, carried bit-for-bit in a `byte`.
    UInt8(u8) { signed: false, float: false }
    /// `uint16_t`, read and written as `char`.
    UInt16(u16) { signed: false, float: false }
    /// `uint32_t`, carried bit-for-bit in an `int`.
    UInt32(u32) { signed: false, float: false }
    /// `uint64_t`, carried bit-for-bit in a `long`.
    UInt64(u64) { signed: false, float: false }
    /// `float`
    Float32(f32) { signed: true, float: true }
    /// `double`
    Float64(f64) { signed: true, float: true }
    /// `uintptr_t`, read and written as `long`.
    UIntPtr(usize) { signed: false, float: false }
}

/// C `char`, read and written as `byte`.
#[derive(Debug)]
pub enum Char {}

impl CellKind for Char {
    type Native = c_char;
    type Host = jbyte;

    const DESCRIPTOR: KindDescriptor = KindDescriptor {
        name: "Char",
        size: size_of::<c_char>(),
        signed: true,
        float: false,
    };

    #[inline]
    fn to_host(native: c_char) -> jbyte {
        char_to_java(native)
    }

    #[inline]
    fn to_native(host: jbyte) -> c_char {
        char_from_java_byte(host)
    }
}

/// A cell holding another address (`void**`). Reads and writes exchange the
/// stored address as a handle.
#[derive(Debug)]
pub enum Indirect {}

impl CellKind for Indirect {
    type Native = *mut c_void;
    type Host = jlong;

    const DESCRIPTOR: KindDescriptor = KindDescriptor {
        name: "Indirect",
        size: size_of::<*mut c_void>(),
        signed: false,
        float: false,
    };

    #[inline]
    fn to_host(native: *mut c_void) -> jlong {
        to_java_pointer(native)
    }

    #[inline]
    fn to_native(host: jlong) -> *mut c_void {
        to_native_pointer(host)
    }
}

/// Opaque handle to one native cell of kind `K`, encoded as a Java `long`.
#[repr(transparent)]
pub struct Pointer<K: CellKind> {
    raw: jlong,
    _kind: PhantomData<fn() -> K>,
}

impl<K: CellKind> Pointer<K> {
    /// The null handle (`0`).
    #[inline]
    pub const fn null() -> Self {
        Self::from_raw(0)
    }

    /// Reinterpret a handle received from Java.
    #[inline]
    pub const fn from_raw(raw: jlong) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The handle as Java sees it.
    #[inline]
    pub const fn into_raw(self) -> jlong {
        self.raw
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    #[inline]
    pub fn from_ptr(ptr: *mut K::Native) -> Self {
        Self::from_raw(to_java_pointer(ptr))
    }

    #[inline]
    pub fn as_ptr(self) -> *mut K::Native {
        to_native_pointer(self.raw)
    }

    /// Allocate one uninitialized cell.
    ///
    /// Never returns null: running out of memory aborts through the global
    /// allocator.
    pub fn allocate() -> Self {
        let cell = Box::into_raw(Box::new(MaybeUninit::<K::Native>::uninit()));
        Self::from_ptr(cell.cast())
    }

    /// Release the cell.
    ///
    /// # Safety
    ///
    /// The handle must come from [`allocate`](Self::allocate) for the same
    /// kind and must not have been destroyed. It must not be used again.
    pub unsafe fn destroy(self) {
        drop(Box::from_raw(self.as_ptr().cast::<MaybeUninit<K::Native>>()));
    }

    /// Read the cell, converted for Java.
    ///
    /// # Safety
    ///
    /// The handle must address a live cell of this kind that has been
    /// written at least once, with no concurrent writer.
    #[inline]
    pub unsafe fn get(self) -> K::Host {
        K::to_host(self.as_ptr().read())
    }

    /// Write the cell from a Java value.
    ///
    /// # Safety
    ///
    /// The handle must address a live cell of this kind, with no concurrent
    /// reader or writer.
    #[inline]
    pub unsafe fn set(self, value: K::Host) {
        self.as_ptr().write(K::to_native(value));
    }

    /// Move the handle by `bytes`, e.g. to a struct field offset.
    #[inline]
    pub const fn advance(self, bytes: jlong) -> Self {
        Self::from_raw(self.raw.wrapping_add(bytes))
    }

    /// Move the handle by `count` cells of this kind, for walking arrays.
    #[inline]
    pub const fn offset(self, count: jlong) -> Self {
        self.advance(count.wrapping_mul(K::DESCRIPTOR.size as jlong))
    }

    /// Reinterpret the handle as addressing another kind.
    #[inline]
    pub const fn cast<T: CellKind>(self) -> Pointer<T> {
        Pointer::from_raw(self.raw)
    }
}

impl Pointer<Indirect> {
    /// The stored address, typed as a handle to `T`.
    ///
    /// # Safety
    ///
    /// Same as [`get`](Self::get).
    pub unsafe fn target<T: CellKind>(self) -> Pointer<T> {
        Pointer::from_raw(self.get())
    }

    /// Store the address of `target`.
    ///
    /// # Safety
    ///
    /// Same as [`set`](Self::set).
    pub unsafe fn set_target<T: CellKind>(self, target: Pointer<T>) {
        self.set(target.into_raw())
    }
}

impl Pointer<Char> {
    /// Copy the NUL-terminated string starting at this cell.
    ///
    /// Returns `None` for a null handle.
    ///
    /// # Safety
    ///
    /// Same contract as [`scan_c_string`]: with [`StringDeletion::Delete`]
    /// the buffer must come from the C allocator and the handle must not be
    /// used again.
    pub unsafe fn read_c_string(self, deletion: StringDeletion) -> Option<Vec<u8>> {
        scan_c_string(self.as_ptr(), deletion)
    }
}

impl<K: CellKind> Clone for Pointer<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: CellKind> Copy for Pointer<K> {}

impl<K: CellKind> PartialEq for Pointer<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: CellKind> Eq for Pointer<K> {}

impl<K: CellKind> Hash for Pointer<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: CellKind> Default for Pointer<K> {
    fn default() -> Self {
        Self::null()
    }
}

impl<K: CellKind> fmt::Debug for Pointer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer<{}>({:#x})", K::DESCRIPTOR.name, self.raw)
    }
}

static ADDRESS_WIDTH: Lazy<jint> = Lazy::new(|| size_of::<usize>() as jint);

/// Width of a native address in bytes (`sizeof(uintptr_t)`).
pub fn native_address_width() -> jint {
    *ADDRESS_WIDTH
}
