//! In-process stand-ins for the JNI function tables.
//!
//! `MockEnv` and `MockVm` are `#[repr(C)]` structs whose first field is the
//! function-table pointer, so a pointer to either one is a valid `JNIEnv*`
//! or `JavaVM*` for the purposes of this crate. Only the functions the
//! bridge calls are populated; everything else stays null.
//!
//! Mocks are leaked so the raw pointers handed to the bridge stay valid for
//! the whole test binary.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

use jni_bridge::ffi::{
    jboolean, jbyte, jbyteArray, jclass, jint, jobject, jsize, JNIEnv, JavaVM,
    JavaVMAttachArgs, JNI_EDETACHED, JNI_FALSE, JNI_OK, JNI_TRUE,
};
use jni_bridge::{JavaVm, JniEnv};
use jni_sys::{jarray, JNIInvokeInterface_, JNINativeInterface_, _jfieldID, _jmethodID, JNI_ERR};

/// Class names starting with this prefix are not found.
pub const MISSING_CLASS_PREFIX: &str = "missing/";

/// Members with this name are not found.
pub const MISSING_MEMBER: &str = "missing";

#[repr(C)]
pub struct MockEnv {
    table: *const JNINativeInterface_,
    vm: *mut JavaVM,
    pub find_class_calls: AtomicUsize,
    pub member_lookups: AtomicUsize,
    pub new_global_refs: AtomicUsize,
    pub deleted_global_refs: AtomicUsize,
    pub deleted_local_refs: AtomicUsize,
    pub released_arrays: AtomicUsize,
    pub last_release_mode: AtomicI32,
    pub exception_pending: AtomicBool,
    pub thrown: Mutex<Vec<String>>,
}

unsafe impl Send for MockEnv {}
unsafe impl Sync for MockEnv {}

impl MockEnv {
    /// A mock environment with no JavaVM behind it.
    pub fn new() -> &'static MockEnv {
        Self::with_vm(ptr::null_mut())
    }

    fn with_vm(vm: *mut JavaVM) -> &'static MockEnv {
        let mut table: JNINativeInterface_ = unsafe { std::mem::zeroed() };
        table.GetJavaVM = Some(get_java_vm);
        table.FindClass = Some(find_class);
        table.NewGlobalRef = Some(new_global_ref);
        table.DeleteGlobalRef = Some(delete_global_ref);
        table.DeleteLocalRef = Some(delete_local_ref);
        table.GetFieldID = Some(get_member_id::<_jfieldID>);
        table.GetStaticFieldID = Some(get_member_id::<_jfieldID>);
        table.GetMethodID = Some(get_member_id::<_jmethodID>);
        table.GetStaticMethodID = Some(get_member_id::<_jmethodID>);
        table.ExceptionCheck = Some(exception_check);
        table.ThrowNew = Some(throw_new);
        table.GetArrayLength = Some(get_array_length);
        table.GetByteArrayElements = Some(get_byte_array_elements);
        table.ReleaseByteArrayElements = Some(release_byte_array_elements);
        table.NewByteArray = Some(new_byte_array);
        table.SetByteArrayRegion = Some(set_byte_array_region);

        Box::leak(Box::new(MockEnv {
            table: Box::leak(Box::new(table)),
            vm,
            find_class_calls: AtomicUsize::new(0),
            member_lookups: AtomicUsize::new(0),
            new_global_refs: AtomicUsize::new(0),
            deleted_global_refs: AtomicUsize::new(0),
            deleted_local_refs: AtomicUsize::new(0),
            released_arrays: AtomicUsize::new(0),
            last_release_mode: AtomicI32::new(-1),
            exception_pending: AtomicBool::new(false),
            thrown: Mutex::new(Vec::new()),
        }))
    }

    pub fn raw(&'static self) -> *mut JNIEnv {
        self as *const MockEnv as *mut JNIEnv
    }

    pub fn env(&'static self) -> JniEnv {
        unsafe { JniEnv::from_raw(self.raw()) }
    }

    /// A Java `byte[]` holding `bytes`.
    pub fn new_java_bytes(&self, bytes: &[jbyte]) -> jbyteArray {
        Box::into_raw(Box::new(bytes.to_vec())) as jbyteArray
    }

    /// The contents of a `byte[]` created by this mock.
    pub fn java_bytes(&self, array: jbyteArray) -> Vec<jbyte> {
        unsafe { array_vec(array).clone() }
    }

    pub fn thrown(&self) -> Vec<String> {
        self.thrown.lock().unwrap().clone()
    }
}

#[repr(C)]
pub struct MockVm {
    table: *const JNIInvokeInterface_,
    env: *mut JNIEnv,
    pub attaches: AtomicUsize,
    pub detaches: AtomicUsize,
    pub fail_attach: AtomicBool,
    pub fail_detach: AtomicBool,
    pub thread_names: Mutex<Vec<String>>,
}

unsafe impl Send for MockVm {}
unsafe impl Sync for MockVm {}

thread_local! {
    // Addresses of the mock VMs the current thread is attached to.
    static ATTACHED: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

impl MockVm {
    /// A mock VM together with the environment it hands out.
    pub fn new() -> (&'static MockVm, &'static MockEnv) {
        let mut table: JNIInvokeInterface_ = unsafe { std::mem::zeroed() };
        table.GetEnv = Some(get_env);
        table.AttachCurrentThread = Some(attach_current_thread);
        table.AttachCurrentThreadAsDaemon = Some(attach_current_thread);
        table.DetachCurrentThread = Some(detach_current_thread);

        let vm: &'static mut MockVm = Box::leak(Box::new(MockVm {
            table: Box::leak(Box::new(table)),
            env: ptr::null_mut(),
            attaches: AtomicUsize::new(0),
            detaches: AtomicUsize::new(0),
            fail_attach: AtomicBool::new(false),
            fail_detach: AtomicBool::new(false),
            thread_names: Mutex::new(Vec::new()),
        }));

        let raw_vm = vm as *mut MockVm as *mut JavaVM;
        let env = MockEnv::with_vm(raw_vm);
        vm.env = env.raw();
        (vm, env)
    }

    pub fn raw(&'static self) -> *mut JavaVM {
        self as *const MockVm as *mut JavaVM
    }

    pub fn java_vm(&'static self) -> JavaVm {
        unsafe { JavaVm::from_raw(self.raw()) }
    }

    /// Mark the current thread as attached without going through the
    /// bridge, the way a thread started by Java would be.
    pub fn attach_as_java_thread(&'static self) {
        let key = self.raw() as usize;
        ATTACHED.with(|set| set.borrow_mut().insert(key));
    }

    pub fn is_attached_here(&'static self) -> bool {
        let key = self.raw() as usize;
        ATTACHED.with(|set| set.borrow().contains(&key))
    }

    pub fn attaches(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }

    pub fn detaches(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

unsafe fn mock_env<'a>(env: *mut JNIEnv) -> &'a MockEnv {
    &*(env as *const MockEnv)
}

unsafe fn mock_vm<'a>(vm: *mut JavaVM) -> &'a MockVm {
    &*(vm as *const MockVm)
}

unsafe fn array_vec<'a>(array: jobject) -> &'a mut Vec<jbyte> {
    &mut *(array as *mut Vec<jbyte>)
}

unsafe extern "system" fn get_java_vm(env: *mut JNIEnv, vm: *mut *mut JavaVM) -> jint {
    let mock = mock_env(env);
    if mock.vm.is_null() {
        return JNI_ERR;
    }
    *vm = mock.vm;
    JNI_OK
}

unsafe extern "system" fn find_class(env: *mut JNIEnv, name: *const c_char) -> jclass {
    let mock = mock_env(env);
    let calls = mock.find_class_calls.fetch_add(1, Ordering::SeqCst) + 1;
    let name = CStr::from_ptr(name).to_string_lossy();
    if name.starts_with(MISSING_CLASS_PREFIX) {
        mock.exception_pending.store(true, Ordering::SeqCst);
        return ptr::null_mut();
    }
    (calls * 0x100) as jclass
}

unsafe extern "system" fn new_global_ref(env: *mut JNIEnv, obj: jobject) -> jobject {
    if obj.is_null() {
        return ptr::null_mut();
    }
    mock_env(env).new_global_refs.fetch_add(1, Ordering::SeqCst);
    obj
}

unsafe extern "system" fn delete_global_ref(env: *mut JNIEnv, _obj: jobject) {
    mock_env(env).deleted_global_refs.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn delete_local_ref(env: *mut JNIEnv, _obj: jobject) {
    mock_env(env).deleted_local_refs.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "system" fn get_member_id<T>(
    env: *mut JNIEnv,
    _class: jclass,
    name: *const c_char,
    _sig: *const c_char,
) -> *mut T {
    let mock = mock_env(env);
    let lookups = mock.member_lookups.fetch_add(1, Ordering::SeqCst) + 1;
    if CStr::from_ptr(name).to_bytes() == MISSING_MEMBER.as_bytes() {
        mock.exception_pending.store(true, Ordering::SeqCst);
        return ptr::null_mut();
    }
    (lookups * 0x10) as *mut T
}

unsafe extern "system" fn exception_check(env: *mut JNIEnv) -> jboolean {
    if mock_env(env).exception_pending.load(Ordering::SeqCst) {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

unsafe extern "system" fn throw_new(env: *mut JNIEnv, _class: jclass, msg: *const c_char) -> jint {
    let mock = mock_env(env);
    let message = CStr::from_ptr(msg).to_string_lossy().into_owned();
    mock.thrown.lock().unwrap().push(message);
    mock.exception_pending.store(true, Ordering::SeqCst);
    JNI_OK
}

unsafe extern "system" fn get_array_length(_env: *mut JNIEnv, array: jarray) -> jsize {
    array_vec(array).len() as jsize
}

unsafe extern "system" fn get_byte_array_elements(
    _env: *mut JNIEnv,
    array: jbyteArray,
    _is_copy: *mut jboolean,
) -> *mut jbyte {
    array_vec(array).as_mut_ptr()
}

unsafe extern "system" fn release_byte_array_elements(
    env: *mut JNIEnv,
    _array: jbyteArray,
    _elems: *mut jbyte,
    mode: jint,
) {
    let mock = mock_env(env);
    mock.released_arrays.fetch_add(1, Ordering::SeqCst);
    mock.last_release_mode.store(mode, Ordering::SeqCst);
}

unsafe extern "system" fn new_byte_array(_env: *mut JNIEnv, len: jsize) -> jbyteArray {
    Box::into_raw(Box::new(vec![0 as jbyte; len as usize])) as jbyteArray
}

unsafe extern "system" fn set_byte_array_region(
    _env: *mut JNIEnv,
    array: jbyteArray,
    start: jsize,
    len: jsize,
    buf: *const jbyte,
) {
    let src = std::slice::from_raw_parts(buf, len as usize);
    let start = start as usize;
    array_vec(array)[start..start + src.len()].copy_from_slice(src);
}

unsafe extern "system" fn get_env(vm: *mut JavaVM, penv: *mut *mut c_void, _version: jint) -> jint {
    let key = vm as usize;
    let attached = ATTACHED
        .try_with(|set| set.borrow().contains(&key))
        .unwrap_or(false);
    if !attached {
        return JNI_EDETACHED;
    }
    *penv = mock_vm(vm).env as *mut c_void;
    JNI_OK
}

unsafe extern "system" fn attach_current_thread(
    vm: *mut JavaVM,
    penv: *mut *mut c_void,
    args: *mut c_void,
) -> jint {
    let mock = mock_vm(vm);
    if mock.fail_attach.load(Ordering::SeqCst) {
        return JNI_ERR;
    }

    if !args.is_null() {
        let args = &*(args as *const JavaVMAttachArgs);
        if !args.name.is_null() {
            let name = CStr::from_ptr(args.name).to_string_lossy().into_owned();
            mock.thread_names.lock().unwrap().push(name);
        }
    }

    let key = vm as usize;
    let _ = ATTACHED.try_with(|set| set.borrow_mut().insert(key));
    mock.attaches.fetch_add(1, Ordering::SeqCst);
    *penv = mock.env as *mut c_void;
    JNI_OK
}

unsafe extern "system" fn detach_current_thread(vm: *mut JavaVM) -> jint {
    let key = vm as usize;
    // The attachment set may already be gone when called from a thread-local
    // destructor.
    let _ = ATTACHED.try_with(|set| set.borrow_mut().remove(&key));
    let mock = mock_vm(vm);
    mock.detaches.fetch_add(1, Ordering::SeqCst);
    if mock.fail_detach.load(Ordering::SeqCst) {
        return JNI_ERR;
    }
    JNI_OK
}
