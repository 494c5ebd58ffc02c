//! Native side of a JVM bridge.
//!
//! This crate lets Java code exchange primitive data with unmanaged native
//! memory and lets native code call back into Java, while paying for each
//! reflective JNI lookup only once per process.
//!
//! * [`cache`] resolves and memoizes classes, fields and methods.
//! * [`pointer`] allocates, reads, writes and frees native primitive cells
//!   addressed by opaque `long` handles.
//! * [`convert`] and [`bytes`] marshal primitives and byte strings.
//! * [`callback`] keeps the JavaVM and a Java object reachable from any
//!   native thread.
//! * [`exports`] holds the `Java_...` entry points the Java classes bind to.
//!
//! # Example
//!
//! ```no_run
//! use jni_bridge::{CachedMethod, CallbackContext, JniEnv};
//!
//! static ON_EVENT: CachedMethod = CachedMethod::new("com/example/Listener", "onEvent", "(I)V");
//!
//! fn deliver(context: &CallbackContext) -> jni_bridge::Result<()> {
//!     // Works from threads the JVM has never seen.
//!     let env: JniEnv = context.env()?;
//!     let method = ON_EVENT.get(&env)?;
//!     println!("would call {:?} on {:?}", method, context.object());
//!     Ok(())
//! }
//! ```
//!
//! # Ownership
//!
//! Native cells have no finalizer on the Java side. Every handle returned by
//! an allocate call must be passed to the matching destroy call exactly
//! once; using a handle afterwards is undefined behaviour and is not
//! detected.

pub mod bytes;
pub mod cache;
pub mod callback;
pub mod config;
pub mod convert;
pub mod error;
pub mod exports;
pub mod ffi;
pub mod pointer;

// Re-export main types at the crate root
pub use bytes::{NativeBytes, StringDeletion};
pub use cache::{CachedClass, CachedField, CachedMethod, HandleCache, MemberKey, MemberKind, Resolver};
pub use callback::CallbackContext;
pub use config::{AttachPolicy, BridgeConfig};
pub use convert::NativePrimitive;
pub use error::{Error, Result};
pub use exports::throw_runtime_exception;
pub use ffi::{ClassHandle, FieldHandle, JavaVm, JniEnv, JniStatus, MethodHandle};
pub use pointer::{native_address_width, CellKind, Pointer};
