//! Process-wide bridge configuration.

use std::env;

use jni_sys::{jint, JNI_VERSION_1_2};
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};

/// Environment variable selecting the [`AttachPolicy`].
pub const ATTACH_POLICY_VAR: &str = "JNI_BRIDGE_ATTACH_POLICY";

/// Environment variable naming threads attached by the bridge.
pub const THREAD_NAME_VAR: &str = "JNI_BRIDGE_THREAD_NAME";

/// What happens to a native thread the bridge attached to the JVM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttachPolicy {
    /// Never detach. The thread stays known to the JVM until it exits.
    #[default]
    Permanent,
    /// Detach when the native thread exits. Applies to every thread the
    /// bridge attached, including threads first attached through a
    /// `Permanent` context. Threads attached by Java itself stay attached.
    DetachOnThreadExit,
}

impl AttachPolicy {
    /// Parse `permanent` or `detach-on-exit`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" => Some(AttachPolicy::Permanent),
            "detach-on-exit" | "detach_on_exit" => Some(AttachPolicy::DetachOnThreadExit),
            _ => None,
        }
    }
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// JNI version requested from `GetEnv`.
    pub jni_version: jint,
    /// Policy for threads attached by callback contexts.
    pub attach_policy: AttachPolicy,
    /// Java thread name given to attached threads.
    pub thread_name: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            jni_version: JNI_VERSION_1_2,
            attach_policy: AttachPolicy::Permanent,
            thread_name: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with `JNI_BRIDGE_ATTACH_POLICY` and
    /// `JNI_BRIDGE_THREAD_NAME`. Unrecognized values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var(ATTACH_POLICY_VAR) {
            match AttachPolicy::parse(&value) {
                Some(policy) => config.attach_policy = policy,
                None => tracing::warn!(value = %value, "ignoring unknown {}", ATTACH_POLICY_VAR),
            }
        }

        if let Ok(name) = env::var(THREAD_NAME_VAR) {
            if !name.is_empty() {
                config.thread_name = Some(name);
            }
        }

        config
    }

    pub fn with_attach_policy(mut self, policy: AttachPolicy) -> Self {
        self.attach_policy = policy;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }
}

static CONFIG: OnceCell<BridgeConfig> = OnceCell::new();

/// Install the process-wide configuration.
///
/// Must happen before the first JNI entry point that reads it, typically in
/// `JNI_OnLoad`. Fails with [`Error::AlreadyConfigured`] once a
/// configuration is in place.
pub fn configure(config: BridgeConfig) -> Result<()> {
    CONFIG.set(config).map_err(|_| Error::AlreadyConfigured)
}

/// The process-wide configuration, read from the environment on first use
/// if [`configure`] was never called.
pub fn current() -> &'static BridgeConfig {
    CONFIG.get_or_init(BridgeConfig::from_env)
}
