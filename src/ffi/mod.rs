//! Low-level JNI access.
//!
//! This module wraps the raw JNI function tables from `jni-sys` in thin,
//! copyable environment types and defines the typed handles the rest of the
//! crate passes around. Users should prefer the safe wrappers in the parent
//! modules where one exists.

pub mod error;
pub mod handles;
pub mod raw;

pub use error::{check_status, JniStatus};
pub use handles::*;
pub use raw::*;
