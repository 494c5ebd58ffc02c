//! Process-wide cache of resolved JNI identifiers.
//!
//! `FindClass`, `GetFieldID` and `GetMethodID` are expensive reflective
//! lookups, and their results stay valid for as long as the class is loaded.
//! The cache resolves each distinct (class, member, signature) key once and
//! hands the same handle to every later caller. Classes are pinned with a
//! global reference on first resolution and never released.
//!
//! Every key owns its own one-time-initialized slot. The map lock is only
//! held to find or insert a slot, never during a lookup, so first-time
//! resolutions of unrelated keys never wait on each other. Concurrent first
//! callers of the same key block until the winning resolution completes and
//! then observe its value.
//!
//! # Example
//!
//! ```no_run
//! use jni_bridge::{CachedMethod, HandleCache, JniEnv};
//!
//! static LIST_ADD: CachedMethod =
//!     CachedMethod::new("java/util/List", "add", "(Ljava/lang/Object;)Z");
//!
//! fn lookups(env: JniEnv) -> jni_bridge::Result<()> {
//!     let add = LIST_ADD.get(&env)?;
//!     let size = HandleCache::global().method(&env, "java/util/List", "size", "()I")?;
//!     assert_ne!(add, size);
//!     Ok(())
//! }
//! ```

use std::ffi::{CStr, CString};
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ffi::{ClassHandle, FieldHandle, JniEnv, MethodHandle};

/// The kind of member a key resolves to.
///
/// A field and a method can share a name and signature text, and their IDs
/// come from different JNI calls, so the kind is part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    StaticField,
    Method,
    StaticMethod,
}

impl MemberKind {
    pub fn is_static(self) -> bool {
        matches!(self, MemberKind::StaticField | MemberKind::StaticMethod)
    }
}

/// Identity of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    /// JNI class name, e.g. `java/lang/String`.
    pub class: &'static str,
    pub name: &'static str,
    /// JNI type signature, e.g. `(I)V`.
    pub signature: &'static str,
    pub kind: MemberKind,
}

impl MemberKey {
    pub const fn new(
        class: &'static str,
        name: &'static str,
        signature: &'static str,
        kind: MemberKind,
    ) -> Self {
        Self {
            class,
            name,
            signature,
            kind,
        }
    }

    fn not_found(&self) -> Error {
        Error::MemberNotFound {
            class: self.class.to_string(),
            name: self.name.to_string(),
            signature: self.signature.to_string(),
        }
    }
}

/// A member lookup handed to a [`Resolver`], with the owning class already
/// resolved and identifiers converted to C strings.
#[derive(Debug)]
pub struct MemberQuery<'a> {
    pub key: &'a MemberKey,
    pub class: ClassHandle,
    pub name: &'a CStr,
    pub signature: &'a CStr,
}

impl MemberQuery<'_> {
    /// The error reported when the lookup finds nothing.
    pub fn not_found(&self) -> Error {
        self.key.not_found()
    }
}

/// The reflective lookups the cache memoizes.
///
/// Implemented for [`JniEnv`]. Each method is called at most once per
/// distinct key for the life of a [`HandleCache`].
pub trait Resolver {
    /// Find a class and pin it for the rest of the process.
    fn resolve_class(&self, name: &CStr) -> Result<ClassHandle>;

    /// Look up an instance or static field, per `query.key.kind`.
    fn resolve_field(&self, query: &MemberQuery<'_>) -> Result<FieldHandle>;

    /// Look up an instance or static method, per `query.key.kind`.
    fn resolve_method(&self, query: &MemberQuery<'_>) -> Result<MethodHandle>;
}

impl Resolver for JniEnv {
    fn resolve_class(&self, name: &CStr) -> Result<ClassHandle> {
        let env = *self;
        unsafe {
            let local = env.find_class(name);
            if local.is_null() {
                // NoClassDefFoundError stays pending for the Java caller.
                return Err(Error::ClassNotFound(name.to_string_lossy().into_owned()));
            }

            let global = env.new_global_ref(local);
            env.delete_local_ref(local);
            if global.is_null() {
                return Err(Error::JavaException("NewGlobalRef"));
            }

            Ok(ClassHandle::from_raw(global))
        }
    }

    fn resolve_field(&self, query: &MemberQuery<'_>) -> Result<FieldHandle> {
        let env = *self;
        let class = query.class.as_raw();
        let id = unsafe {
            if query.key.kind.is_static() {
                env.get_static_field_id(class, query.name, query.signature)
            } else {
                env.get_field_id(class, query.name, query.signature)
            }
        };
        if id.is_null() {
            return Err(query.not_found());
        }
        Ok(FieldHandle::from_raw(id))
    }

    fn resolve_method(&self, query: &MemberQuery<'_>) -> Result<MethodHandle> {
        let env = *self;
        let class = query.class.as_raw();
        let id = unsafe {
            if query.key.kind.is_static() {
                env.get_static_method_id(class, query.name, query.signature)
            } else {
                env.get_method_id(class, query.name, query.signature)
            }
        };
        if id.is_null() {
            return Err(query.not_found());
        }
        Ok(MethodHandle::from_raw(id))
    }
}

type Slot<T> = Arc<OnceCell<T>>;

/// Memoized class, field and method lookups.
///
/// Entries are never evicted. Most code uses [`HandleCache::global`]; a
/// separate instance is only useful to scope resolutions, as tests do.
pub struct HandleCache {
    classes: DashMap<&'static str, Slot<ClassHandle>>,
    fields: DashMap<MemberKey, Slot<FieldHandle>>,
    methods: DashMap<MemberKey, Slot<MethodHandle>>,
}

static GLOBAL: Lazy<HandleCache> = Lazy::new(HandleCache::new);

impl HandleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
            fields: DashMap::new(),
            methods: DashMap::new(),
        }
    }

    /// The process-wide cache.
    pub fn global() -> &'static HandleCache {
        &GLOBAL
    }

    /// Resolve a class by JNI name, e.g. `java/lang/String`.
    pub fn class<R: Resolver + ?Sized>(&self, resolver: &R, name: &'static str) -> Result<ClassHandle> {
        let slot = slot(&self.classes, name);
        if let Some(class) = slot.get() {
            return Ok(*class);
        }

        slot.get_or_try_init(|| {
            let c_name = to_c_string(name)?;
            debug!(class = name, "resolving class");
            resolver.resolve_class(&c_name).map_err(|e| {
                warn!(class = name, error = %e, "class resolution failed");
                e
            })
        })
        .copied()
    }

    /// Resolve an instance field.
    pub fn field<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        class: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<FieldHandle> {
        self.resolve_field(resolver, MemberKey::new(class, name, signature, MemberKind::Field))
    }

    /// Resolve a static field.
    pub fn static_field<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        class: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<FieldHandle> {
        self.resolve_field(
            resolver,
            MemberKey::new(class, name, signature, MemberKind::StaticField),
        )
    }

    /// Resolve an instance method.
    pub fn method<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        class: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<MethodHandle> {
        self.resolve_method(resolver, MemberKey::new(class, name, signature, MemberKind::Method))
    }

    /// Resolve a static method.
    pub fn static_method<R: Resolver + ?Sized>(
        &self,
        resolver: &R,
        class: &'static str,
        name: &'static str,
        signature: &'static str,
    ) -> Result<MethodHandle> {
        self.resolve_method(
            resolver,
            MemberKey::new(class, name, signature, MemberKind::StaticMethod),
        )
    }

    /// Resolve a field key. The key's kind must be a field kind.
    pub fn resolve_field<R: Resolver + ?Sized>(&self, resolver: &R, key: MemberKey) -> Result<FieldHandle> {
        if !matches!(key.kind, MemberKind::Field | MemberKind::StaticField) {
            return Err(Error::InvalidArgument(format!("{:?} is not a field key", key.kind)));
        }
        self.resolve_member(&self.fields, resolver, key, |r, q| r.resolve_field(q))
    }

    /// Resolve a method key. The key's kind must be a method kind.
    pub fn resolve_method<R: Resolver + ?Sized>(&self, resolver: &R, key: MemberKey) -> Result<MethodHandle> {
        if !matches!(key.kind, MemberKind::Method | MemberKind::StaticMethod) {
            return Err(Error::InvalidArgument(format!("{:?} is not a method key", key.kind)));
        }
        self.resolve_member(&self.methods, resolver, key, |r, q| r.resolve_method(q))
    }

    /// Number of resolved entries, classes included.
    pub fn len(&self) -> usize {
        resolved(&self.classes) + resolved(&self.fields) + resolved(&self.methods)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve_member<T, R, F>(
        &self,
        map: &DashMap<MemberKey, Slot<T>>,
        resolver: &R,
        key: MemberKey,
        lookup: F,
    ) -> Result<T>
    where
        T: Copy,
        R: Resolver + ?Sized,
        F: FnOnce(&R, &MemberQuery<'_>) -> Result<T>,
    {
        let slot = slot(map, key);
        if let Some(value) = slot.get() {
            return Ok(*value);
        }

        slot.get_or_try_init(|| {
            let name = to_c_string(key.name)?;
            let signature = to_c_string(key.signature)?;
            let class = self.class(resolver, key.class)?;
            let query = MemberQuery {
                key: &key,
                class,
                name: &name,
                signature: &signature,
            };

            debug!(
                class = key.class,
                member = key.name,
                signature = key.signature,
                kind = ?key.kind,
                "resolving member"
            );
            lookup(resolver, &query).map_err(|e| {
                warn!(class = key.class, member = key.name, error = %e, "member resolution failed");
                e
            })
        })
        .copied()
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the slot for `key`, inserting an empty one if absent.
fn slot<K: Eq + Hash, T>(map: &DashMap<K, Slot<T>>, key: K) -> Slot<T> {
    if let Some(slot) = map.get(&key) {
        return Arc::clone(slot.value());
    }
    Arc::clone(map.entry(key).or_default().value())
}

fn resolved<K: Eq + Hash, T>(map: &DashMap<K, Slot<T>>) -> usize {
    map.iter().filter(|entry| entry.value().get().is_some()).count()
}

fn to_c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidArgument(format!("identifier contains NUL: {:?}", s)))
}

/// A statically declared class slot, for generated bindings.
///
/// The class resolves through [`HandleCache::global`], so a static slot and
/// a map lookup of the same name share one resolution.
pub struct CachedClass {
    name: &'static str,
    slot: OnceCell<ClassHandle>,
}

impl CachedClass {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<ClassHandle> {
        self.slot
            .get_or_try_init(|| HandleCache::global().class(resolver, self.name))
            .copied()
    }
}

/// A statically declared field slot, for generated bindings.
pub struct CachedField {
    key: MemberKey,
    slot: OnceCell<FieldHandle>,
}

impl CachedField {
    /// An instance field.
    pub const fn new(class: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            key: MemberKey::new(class, name, signature, MemberKind::Field),
            slot: OnceCell::new(),
        }
    }

    /// A static field.
    pub const fn new_static(class: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            key: MemberKey::new(class, name, signature, MemberKind::StaticField),
            slot: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &MemberKey {
        &self.key
    }

    pub fn get<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<FieldHandle> {
        self.slot
            .get_or_try_init(|| HandleCache::global().resolve_field(resolver, self.key))
            .copied()
    }
}

/// A statically declared method slot, for generated bindings.
pub struct CachedMethod {
    key: MemberKey,
    slot: OnceCell<MethodHandle>,
}

impl CachedMethod {
    /// An instance method.
    pub const fn new(class: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            key: MemberKey::new(class, name, signature, MemberKind::Method),
            slot: OnceCell::new(),
        }
    }

    /// A static method.
    pub const fn new_static(class: &'static str, name: &'static str, signature: &'static str) -> Self {
        Self {
            key: MemberKey::new(class, name, signature, MemberKind::StaticMethod),
            slot: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &MemberKey {
        &self.key
    }

    pub fn get<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<MethodHandle> {
        self.slot
            .get_or_try_init(|| HandleCache::global().resolve_method(resolver, self.key))
            .copied()
    }
}
