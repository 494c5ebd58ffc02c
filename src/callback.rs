//! Contexts that let native callbacks re-enter the JVM from any thread.
//!
//! A native library that calls back into Java usually does so from threads
//! the JVM has never seen: audio threads, worker pools, OS event loops. A
//! [`CallbackContext`] keeps what such a thread needs: the process-wide
//! `JavaVM` and a global reference to the Java object to call. Its
//! [`env`](CallbackContext::env) attaches the calling thread on demand.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use jni_sys::{jint, jlong, jobject, JavaVMAttachArgs};
use tracing::{debug, warn};

use crate::config::{AttachPolicy, BridgeConfig};
use crate::error::{Error, Result};
use crate::ffi::{to_java_pointer, to_native_pointer, JavaVm, JniEnv, JniStatus};

/// A durable link between a native callback site and a Java object.
///
/// Owned by native code from [`new`](Self::new) until
/// [`release`](Self::release). The context itself is usable from any
/// thread.
#[derive(Debug)]
pub struct CallbackContext {
    vm: JavaVm,
    object: jobject,
    jni_version: jint,
    attach_policy: AttachPolicy,
    thread_name: Option<CString>,
}

// A global reference may be used from any thread, and the JavaVM is
// thread-safe.
unsafe impl Send for CallbackContext {}
unsafe impl Sync for CallbackContext {}

impl CallbackContext {
    /// Capture the JavaVM and pin `object` with a global reference.
    ///
    /// # Safety
    ///
    /// `env` must belong to the calling thread and `object` must be null or
    /// a live reference for it.
    pub unsafe fn new(env: JniEnv, object: jobject, config: &BridgeConfig) -> Result<Self> {
        let thread_name = match config.thread_name.as_deref() {
            Some(name) => Some(CString::new(name).map_err(|_| {
                Error::InvalidArgument(format!("thread name contains NUL: {:?}", name))
            })?),
            None => None,
        };

        let vm = env.java_vm()?;

        let global = if object.is_null() {
            ptr::null_mut()
        } else {
            let global = env.new_global_ref(object);
            if global.is_null() {
                return Err(Error::JavaException("NewGlobalRef"));
            }
            global
        };

        debug!(policy = ?config.attach_policy, "created callback context");

        Ok(Self {
            vm,
            object: global,
            jni_version: config.jni_version,
            attach_policy: config.attach_policy,
            thread_name,
        })
    }

    /// The pinned Java object, as a global reference.
    pub fn object(&self) -> jobject {
        self.object
    }

    pub fn java_vm(&self) -> JavaVm {
        self.vm
    }

    pub fn attach_policy(&self) -> AttachPolicy {
        self.attach_policy
    }

    /// A `JNIEnv` for the calling thread.
    ///
    /// If the thread is not attached yet it is attached as a daemon, and
    /// left attached or scheduled for detaching at thread exit according to
    /// the context's [`AttachPolicy`].
    ///
    /// A thread the bridge attached earlier through a `Permanent` context is
    /// scheduled for detaching as soon as a `DetachOnThreadExit` context
    /// uses it. Threads attached by anyone else are never detached.
    pub fn env(&self) -> Result<JniEnv> {
        match self.vm.get_env(self.jni_version) {
            Ok(env) => {
                if self.attach_policy == AttachPolicy::DetachOnThreadExit {
                    detach_on_thread_exit(self.vm);
                }
                Ok(env)
            }
            Err(JniStatus::Detached) => self.attach(),
            Err(status) => {
                warn!(%status, "GetEnv failed");
                Err(Error::EnvUnavailable(status))
            }
        }
    }

    fn attach(&self) -> Result<JniEnv> {
        let mut args = self.thread_name.as_ref().map(|name| JavaVMAttachArgs {
            version: self.jni_version,
            name: name.as_ptr() as *mut c_char,
            group: ptr::null_mut(),
        });

        let env = self
            .vm
            .attach_current_thread_as_daemon(args.as_mut())
            .map_err(|status| {
                warn!(%status, "failed to attach thread");
                Error::AttachFailed(status)
            })?;

        debug!(thread = ?std::thread::current().id(), "attached thread to the JVM");

        record_attach(
            self.vm,
            self.attach_policy == AttachPolicy::DetachOnThreadExit,
        );

        Ok(env)
    }

    /// Delete the global reference and consume the context.
    ///
    /// # Safety
    ///
    /// `env` must belong to the calling thread.
    pub unsafe fn release(self, env: JniEnv) {
        if !self.object.is_null() {
            env.delete_global_ref(self.object);
        }
        debug!("released callback context");
    }

    /// Move the context to the heap and return its address as a handle.
    pub fn into_handle(self) -> jlong {
        to_java_pointer(Box::into_raw(Box::new(self)))
    }

    /// Borrow the context behind a handle.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`into_handle`](Self::into_handle) and not
    /// have been passed to [`from_handle_owned`](Self::from_handle_owned).
    pub unsafe fn from_handle<'a>(handle: jlong) -> &'a CallbackContext {
        &*to_native_pointer::<CallbackContext>(handle)
    }

    /// Take back ownership of the context behind a handle.
    ///
    /// # Safety
    ///
    /// As for [`from_handle`](Self::from_handle); the handle is dead
    /// afterwards.
    pub unsafe fn from_handle_owned(handle: jlong) -> CallbackContext {
        *Box::from_raw(to_native_pointer::<CallbackContext>(handle))
    }
}

/// One JavaVM the bridge attached the current thread to.
struct Attachment {
    vm: JavaVm,
    detach_on_exit: bool,
}

/// Attachments made by the bridge on the current thread. Dropped when the
/// thread exits.
struct AttachedThread {
    attachments: Vec<Attachment>,
}

impl Drop for AttachedThread {
    fn drop(&mut self) {
        for attachment in self.attachments.drain(..) {
            if !attachment.detach_on_exit {
                continue;
            }
            match attachment.vm.detach_current_thread() {
                JniStatus::Ok => debug!("detached exiting thread from the JVM"),
                status => warn!(%status, "failed to detach exiting thread"),
            }
        }
    }
}

thread_local! {
    static ATTACHED_THREAD: RefCell<AttachedThread> =
        RefCell::new(AttachedThread { attachments: Vec::new() });
}

fn record_attach(vm: JavaVm, detach_on_exit: bool) {
    // Fails only while the thread is already tearing down its locals.
    let _ = ATTACHED_THREAD.try_with(|thread| {
        let mut thread = thread.borrow_mut();
        match thread.attachments.iter_mut().find(|a| a.vm == vm) {
            Some(attachment) => attachment.detach_on_exit |= detach_on_exit,
            None => thread.attachments.push(Attachment { vm, detach_on_exit }),
        }
    });
}

/// Schedule `vm` for detaching at thread exit, if the bridge attached this
/// thread to it.
fn detach_on_thread_exit(vm: JavaVm) {
    let _ = ATTACHED_THREAD.try_with(|thread| {
        let mut thread = thread.borrow_mut();
        if let Some(attachment) = thread.attachments.iter_mut().find(|a| a.vm == vm) {
            attachment.detach_on_exit = true;
        }
    });
}
