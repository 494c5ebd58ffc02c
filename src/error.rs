//! Error types for the jni-bridge crate.

use thiserror::Error;

use crate::ffi::JniStatus;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier or argument cannot be passed to the JVM.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `FindClass` failed for the given JNI class name.
    #[error("class not found: {0}")]
    ClassNotFound(String),

    /// A field or method lookup failed.
    #[error("member not found: {class}.{name}{signature}")]
    MemberNotFound {
        /// JNI name of the owning class.
        class: String,
        /// Field or method name.
        name: String,
        /// JNI type signature.
        signature: String,
    },

    /// A JNI call left a Java exception pending.
    #[error("java exception pending after {0}")]
    JavaException(&'static str),

    /// `GetJavaVM` failed.
    #[error("failed to get the JavaVM: {0}")]
    JavaVmUnavailable(JniStatus),

    /// `GetEnv` failed with something other than `JNI_EDETACHED`.
    #[error("failed to get a JNIEnv: {0}")]
    EnvUnavailable(JniStatus),

    /// The current thread could not be attached to the JVM.
    #[error("failed to attach the current thread: {0}")]
    AttachFailed(JniStatus),

    /// The process-wide configuration was already installed.
    #[error("bridge already configured")]
    AlreadyConfigured,
}

impl Error {
    /// Check if this error comes from a failed class or member lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ClassNotFound(_) | Error::MemberNotFound { .. })
    }

    /// Check if this error comes from failing to reach the JVM from the
    /// current thread.
    pub fn is_attach_failure(&self) -> bool {
        matches!(
            self,
            Error::AttachFailed(_) | Error::EnvUnavailable(_) | Error::JavaVmUnavailable(_)
        )
    }

    /// The JNI status code carried by this error, if any.
    pub fn status(&self) -> Option<JniStatus> {
        match self {
            Error::JavaVmUnavailable(s) | Error::EnvUnavailable(s) | Error::AttachFailed(s) => {
                Some(*s)
            }
            _ => None,
        }
    }
}
