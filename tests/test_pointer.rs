//! Native cell tests: boundary values for every kind, indirection, and the
//! exported entry points Java binds to.
//!
//! None of these need a JVM.

mod common;

use std::fmt::Debug;
use std::os::raw::{c_char, c_void};
use std::ptr;

use jni_bridge::bytes::{alloc_c_string, StringDeletion};
use jni_bridge::exports;
use jni_bridge::pointer::{
    native_address_width, CellKind, Char, Float32, Float64, Indirect, Int16, Int32, Int64, Int8,
    Pointer, UInt16, UInt32, UInt64, UInt8, UIntPtr,
};

/// Write each host value, then check the stored native bits and the value
/// read back.
fn check_cell<K: CellKind>(cases: &[(K::Host, K::Native)])
where
    K::Host: PartialEq + Debug,
    K::Native: PartialEq + Debug,
{
    let cell = Pointer::<K>::allocate();
    for &(host, native) in cases {
        unsafe {
            cell.set(host);
            assert_eq!(
                *cell.as_ptr(),
                native,
                "{} stored the wrong bits for {:?}",
                K::DESCRIPTOR.name,
                host
            );
            assert_eq!(cell.get(), host, "{} changed {:?}", K::DESCRIPTOR.name, host);
        }
    }
    unsafe { cell.destroy() };
}

#[test]
fn test_every_kind_boundaries() {
    check_cell::<Int8>(&[(i8::MIN, i8::MIN), (i8::MAX, i8::MAX), (0, 0), (-1, -1)]);
    check_cell::<Int16>(&[(i16::MIN, i16::MIN), (i16::MAX, i16::MAX), (0, 0), (-1, -1)]);
    check_cell::<Int32>(&[(i32::MIN, i32::MIN), (i32::MAX, i32::MAX), (0, 0), (-1, -1)]);
    check_cell::<Int64>(&[(i64::MIN, i64::MIN), (i64::MAX, i64::MAX), (0, 0), (-1, -1)]);

    check_cell::<UInt8>(&[(0, 0), (-1, u8::MAX), (i8::MAX, 127), (i8::MIN, 128)]);
    check_cell::<UInt16>(&[(0, 0), (u16::MAX, u16::MAX), (0x8000, 0x8000)]);
    check_cell::<UInt32>(&[(0, 0), (-1, u32::MAX), (i32::MIN, 1 << 31)]);
    check_cell::<UInt64>(&[(0, 0), (-1, u64::MAX), (i64::MIN, 1 << 63)]);
    check_cell::<UIntPtr>(&[(0, 0), (usize::MAX as u64 as i64, usize::MAX)]);

    check_cell::<Float32>(&[(f32::MIN, f32::MIN), (f32::MAX, f32::MAX), (0.0, 0.0), (-1.0, -1.0)]);
    check_cell::<Float64>(&[(f64::MIN, f64::MIN), (f64::MAX, f64::MAX), (0.0, 0.0), (-1.0, -1.0)]);

    check_cell::<Char>(&[
        (i8::MIN, i8::MIN as c_char),
        (i8::MAX, i8::MAX as c_char),
        (0, 0),
        (-1, -1i8 as c_char),
    ]);
    check_cell::<Indirect>(&[(0, ptr::null_mut()), (0x1000, 0x1000usize as *mut c_void)]);
}

#[test]
fn test_unsigned_reads_as_signed_cell() {
    unsafe {
        let p = Pointer::<UInt8>::allocate();
        *p.as_ptr() = 255;
        assert_eq!(p.get(), -1, "255 should read back as the byte -1");
        assert_eq!(p.get() as u8, 255);
        p.destroy();

        let p = Pointer::<UInt32>::allocate();
        *p.as_ptr() = 0x8000_0000;
        assert_eq!(p.get(), i32::MIN);
        p.destroy();
    }
}

#[test]
fn test_floats() {
    unsafe {
        let p = Pointer::<Float32>::allocate();
        for v in [f32::MIN, -0.5, 0.0, f32::MAX, f32::INFINITY] {
            p.set(v);
            assert_eq!(p.get(), v);
        }
        p.set(f32::NAN);
        assert!(p.get().is_nan());
        p.destroy();

        let p = Pointer::<Float64>::allocate();
        for v in [f64::MIN, 1.0e-300, f64::MAX, f64::NEG_INFINITY] {
            p.set(v);
            assert_eq!(p.get(), v);
        }
        p.destroy();
    }
}

#[test]
fn test_uintptr_and_char() {
    unsafe {
        let p = Pointer::<UIntPtr>::allocate();
        p.set(0x1234_5678);
        assert_eq!(*p.as_ptr(), 0x1234_5678usize);
        assert_eq!(p.get(), 0x1234_5678);
        p.destroy();

        let c = Pointer::<Char>::allocate();
        c.set(b'A' as i8);
        assert_eq!(c.get(), 65);
        c.set(-1);
        assert_eq!(*c.as_ptr() as u8, 0xff);
        c.destroy();
    }
}

#[test]
fn test_indirect_target() {
    unsafe {
        let target = Pointer::<Int32>::allocate();
        target.set(99);

        let holder = Pointer::<Indirect>::allocate();
        holder.set_target(target);
        assert_eq!(holder.get(), target.into_raw());
        assert_eq!(holder.target::<Int32>().get(), 99);

        holder.set_target(Pointer::<Int32>::null());
        assert_eq!(holder.get(), 0, "null target should read back as 0");
        assert!(holder.target::<Int32>().is_null());

        holder.destroy();
        target.destroy();
    }
}

#[test]
fn test_walk_array() {
    let mut values = [10i16, -20, 30];
    let base = Pointer::<Int16>::from_ptr(values.as_mut_ptr());
    unsafe {
        assert_eq!(base.offset(2).get(), 30);
        base.offset(1).set(7);
    }
    assert_eq!(values, [10, 7, 30]);
}

#[test]
fn test_read_c_string_stops_at_zero() {
    let raw = alloc_c_string(&[72, 101, 121, 0, 33]);
    let cell = Pointer::<Char>::from_ptr(raw);
    unsafe {
        assert_eq!(cell.read_c_string(StringDeletion::Keep), Some(b"Hey".to_vec()));
        assert_eq!(cell.read_c_string(StringDeletion::Delete), Some(b"Hey".to_vec()));
    }
    assert_eq!(unsafe { Pointer::<Char>::null().read_c_string(StringDeletion::Delete) }, None);
}

#[test]
fn test_exported_cells() {
    let env = common::MockEnv::new().raw();
    let class = ptr::null_mut();
    unsafe {
        let h = exports::uint8_pointer::allocate(env, class);
        assert_ne!(h, 0, "allocation must not return the null handle");
        exports::uint8_pointer::set(env, class, h, 255u8 as i8);
        assert_eq!(exports::uint8_pointer::get(env, class, h), -1);
        exports::uint8_pointer::destroy(env, class, h);

        let h = exports::int32_pointer::allocate(env, class);
        exports::int32_pointer::set(env, class, h, -7);
        assert_eq!(exports::int32_pointer::get(env, class, h), -7);
        exports::int32_pointer::destroy(env, class, h);

        let target = exports::double_pointer::allocate(env, class);
        exports::double_pointer::set(env, class, target, 2.5);
        let holder = exports::indirected_pointer::allocate(env, class);
        exports::indirected_pointer::set(env, class, holder, target);
        let stored = exports::indirected_pointer::get(env, class, holder);
        assert_eq!(stored, target);
        assert_eq!(exports::double_pointer::get(env, class, stored), 2.5);
        exports::indirected_pointer::destroy(env, class, holder);
        exports::double_pointer::destroy(env, class, target);
    }
}

#[test]
fn test_exported_address_width() {
    let env = common::MockEnv::new().raw();
    let width = exports::pointers_native_long_size(env, ptr::null_mut());
    assert_eq!(width as usize, std::mem::size_of::<usize>());
    assert_eq!(
        exports::pointer_operations_native_long_size(env, ptr::null_mut()),
        width
    );
    assert_eq!(native_address_width(), width);
}
