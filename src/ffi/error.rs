//! JNI status code decoding.

use std::fmt;

use jni_sys::{
    jint, JNI_EDETACHED, JNI_EEXIST, JNI_EINVAL, JNI_ENOMEM, JNI_ERR, JNI_EVERSION, JNI_OK,
};

use crate::error::{Error, Result};

/// Decoded JNI status code, as returned by the invocation interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JniStatus {
    /// `JNI_OK`
    Ok,
    /// `JNI_ERR`
    Unknown,
    /// `JNI_EDETACHED`: the thread is not attached to the JVM.
    Detached,
    /// `JNI_EVERSION`: the requested JNI version is not supported.
    Version,
    /// `JNI_ENOMEM`
    NoMemory,
    /// `JNI_EEXIST`
    Exists,
    /// `JNI_EINVAL`
    InvalidArguments,
    /// Any code outside the documented set.
    Other(jint),
}

impl JniStatus {
    /// Decode a raw status code.
    pub fn from_code(code: jint) -> Self {
        match code {
            JNI_OK => JniStatus::Ok,
            JNI_ERR => JniStatus::Unknown,
            JNI_EDETACHED => JniStatus::Detached,
            JNI_EVERSION => JniStatus::Version,
            JNI_ENOMEM => JniStatus::NoMemory,
            JNI_EEXIST => JniStatus::Exists,
            JNI_EINVAL => JniStatus::InvalidArguments,
            other => JniStatus::Other(other),
        }
    }

    /// The raw status code.
    pub fn code(self) -> jint {
        match self {
            JniStatus::Ok => JNI_OK,
            JniStatus::Unknown => JNI_ERR,
            JniStatus::Detached => JNI_EDETACHED,
            JniStatus::Version => JNI_EVERSION,
            JniStatus::NoMemory => JNI_ENOMEM,
            JniStatus::Exists => JNI_EEXIST,
            JniStatus::InvalidArguments => JNI_EINVAL,
            JniStatus::Other(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == JniStatus::Ok
    }
}

impl fmt::Display for JniStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JniStatus::Ok => "JNI_OK",
            JniStatus::Unknown => "JNI_ERR",
            JniStatus::Detached => "JNI_EDETACHED",
            JniStatus::Version => "JNI_EVERSION",
            JniStatus::NoMemory => "JNI_ENOMEM",
            JniStatus::Exists => "JNI_EEXIST",
            JniStatus::InvalidArguments => "JNI_EINVAL",
            JniStatus::Other(code) => return write!(f, "unknown JNI status {}", code),
        };
        f.write_str(name)
    }
}

/// Check a JNI status code and convert to Result.
///
/// `make` builds the error for any status other than `JNI_OK`.
pub fn check_status(code: jint, make: impl FnOnce(JniStatus) -> Error) -> Result<()> {
    match JniStatus::from_code(code) {
        JniStatus::Ok => Ok(()),
        status => Err(make(status)),
    }
}
