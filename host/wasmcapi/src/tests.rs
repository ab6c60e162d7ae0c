#![cfg(test)]

use std::{cell::RefCell, panic, rc::Rc};

use wasmcapi_sys::{WASM_LIMITS_MAX_DEFAULT, wasm_limits_t};

use super::*;

#[test]
fn scope_releases_in_reverse_order() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let scope = Scope::open();
    for i in 0..4 {
        let log = log.clone();
        scope.register(move || log.borrow_mut().push(i));
    }

    assert_eq!(scope.pending(), 4);
    scope.close();

    assert_eq!(*log.borrow(), [3, 2, 1, 0]);
}

#[test]
fn early_release_runs_once() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let scope = Scope::open();
    let first = {
        let log = log.clone();
        scope.register(move || log.borrow_mut().push("first"))
    };
    {
        let log = log.clone();
        scope.register(move || log.borrow_mut().push("second"));
    }

    assert!(scope.release(first));
    assert!(!scope.release(first));
    assert_eq!(scope.pending(), 1);

    drop(scope);
    assert_eq!(*log.borrow(), ["first", "second"]);
}

#[test]
fn forgotten_action_never_runs() {
    let ran = Rc::new(RefCell::new(false));

    let scope = Scope::open();
    let key = {
        let ran = ran.clone();
        scope.register(move || *ran.borrow_mut() = true)
    };

    assert!(scope.forget(key));
    scope.close();

    assert!(!*ran.borrow());
}

#[test]
#[should_panic(expected = "used with scope")]
fn foreign_key_is_rejected() {
    let a = Scope::open();
    let b = Scope::open();

    let key = a.register(|| {});
    b.release(key);
}

#[test]
fn scope_releases_on_unwind() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let scope = Scope::open();
        for i in 0..3 {
            let log = log.clone();
            scope.register(move || log.borrow_mut().push(i));
        }

        panic!("body failed");
    }));

    assert!(result.is_err());
    assert_eq!(*log.borrow(), [2, 1, 0]);
}

#[test]
fn panicking_action_does_not_leak_earlier_ones() {
    let log = Rc::new(RefCell::new(Vec::new()));

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let scope = Scope::open();
        {
            let log = log.clone();
            scope.register(move || log.borrow_mut().push("outer"));
        }
        scope.register(|| panic!("release failed"));
    }));

    assert!(result.is_err());
    assert_eq!(*log.borrow(), ["outer"]);
}

#[test]
fn host_records_are_writable() {
    let scope = Scope::open();

    let mut record = HostRecord::new(&scope, 5u32);
    record.set(9);

    assert_eq!(record.get(), 9);
    assert_eq!(record.as_record().get(), 9);
}

#[test]
fn val_encoding_preserves_payload_bits() {
    let cases = [
        Val::I32(-7),
        Val::I64(i64::MIN),
        Val::F32(f32::from_bits(0x7fc0_0001)),
        Val::F64(-0.0),
        Val::AnyRef(None),
        Val::FuncRef(None),
    ];

    for val in cases {
        let raw = val::encode(val);
        assert_eq!(raw.kind, val.kind().as_raw());

        let back = val::decode(&raw).unwrap();
        assert!(back.bit_eq(&val), "{val:?} decoded as {back:?}");
    }
}

#[test]
fn decode_rejects_unknown_kind() {
    let mut raw = val::encode(Val::I32(1));
    raw.kind = 42;

    assert!(matches!(val::decode(&raw), Err(Error::UnrecognizedValKind(42))));
}

#[test]
fn val_slot_checks_kind() {
    let scope = Scope::open();

    let slot = ValSlot::of(&scope, ValKind::I64, 3i64).unwrap();
    assert_eq!(slot.get().unwrap(), Val::I64(3));

    let err = ValSlot::of(&scope, ValKind::I32, 3i64).unwrap_err();
    assert!(matches!(
        err,
        Error::TypeMismatch {
            expected: ValKind::I32,
            actual: ValKind::I64,
        }
    ));
}

#[test]
fn limits_map_unbounded_max() {
    let raw = wasm_limits_t::from(Limits::at_least(2));
    assert_eq!(raw.max, WASM_LIMITS_MAX_DEFAULT);

    assert_eq!(Limits::from(raw), Limits::at_least(2));
    assert_eq!(
        Limits::from(wasm_limits_t { min: 1, max: 4 }),
        Limits::new(1, Some(4))
    );
}

#[test]
fn extern_kind_rejects_unknown_tags() {
    assert_eq!(ExternKind::try_from(3).unwrap(), ExternKind::Memory);
    assert!(matches!(ExternKind::try_from(4), Err(Error::UnrecognizedKind(4))));
}

#[test]
fn trap_info_display_includes_origin() {
    let info = TrapInfo {
        message: "boom".to_string(),
        origin: Some(FrameInfo {
            func_index: 2,
            func_offset: 1,
            module_offset: 0x30,
        }),
        trace: Vec::new(),
    };

    assert_eq!(info.to_string(), "boom (in function 2 at offset 0x30)");
}

#[test]
fn extern_type_downcast_checks_the_tag() {
    let rt = Runtime::from_api(wasmcapi_wasmtime::api());
    let scope = Scope::open();

    let ty = FuncType::new(&scope, rt, &[ValKind::I32], &[]).unwrap();
    let ext = ty.as_extern_type();
    assert_eq!(ext.kind().unwrap(), ExternKind::Func);

    let handle = unsafe { Handle::new(rt, ext.as_handle().as_non_null()) };
    assert!(matches!(
        ExternType::downcast(handle, 9),
        Err(Error::UnrecognizedKind(9))
    ));

    let resolved = ext.downcast().unwrap();
    assert_eq!(resolved.kind(), ExternKind::Func);
    assert_eq!(resolved.func().unwrap().param_kinds().unwrap(), [ValKind::I32]);
}
