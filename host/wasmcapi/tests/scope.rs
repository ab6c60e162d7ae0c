mod common;

use wasmcapi::{Engine, FuncType, GlobalType, Mutability, Scope, Store, ValKind};

use self::common::{deletes, runtime};

#[test]
fn owned_types_are_deleted_when_the_scope_closes() {
    let rt = runtime();

    let scope = Scope::open();
    let func = FuncType::new(&scope, rt, &[ValKind::I32, ValKind::I64], &[ValKind::F64]).unwrap();
    let global = GlobalType::new(&scope, rt, ValKind::F32, Mutability::Var).unwrap();

    assert_eq!(func.param_kinds().unwrap(), [ValKind::I32, ValKind::I64]);
    assert_eq!(func.result_kinds().unwrap(), [ValKind::F64]);
    assert_eq!(global.content().kind().unwrap(), ValKind::F32);
    assert!(global.is_mutable());

    assert_eq!(deletes("wasm_functype_delete"), 0);
    scope.close();

    assert_eq!(deletes("wasm_functype_delete"), 1);
    assert_eq!(deletes("wasm_globaltype_delete"), 1);
}

#[test]
fn early_close_is_not_repeated_at_scope_close() {
    let rt = runtime();

    let scope = Scope::open();
    let ty = FuncType::new(&scope, rt, &[], &[]).unwrap();
    let key = ty.key();

    ty.close();
    assert_eq!(deletes("wasm_functype_delete"), 1);

    assert!(!scope.release(key));
    scope.close();

    assert_eq!(deletes("wasm_functype_delete"), 1);
}

#[test]
fn scope_closes_on_error_paths() {
    let rt = runtime();

    fn build(rt: wasmcapi::Runtime) -> wasmcapi::Result<()> {
        let scope = Scope::open();
        let _ty = FuncType::new(&scope, rt, &[ValKind::I32], &[])?;

        wasmcapi_wasmtime::fail_next_alloc();
        let _second = FuncType::new(&scope, rt, &[ValKind::I32], &[])?;

        unreachable!("the second allocation must fail");
    }

    let err = build(rt).unwrap_err();
    assert!(matches!(err, wasmcapi::Error::Allocation { .. }), "{err}");

    assert_eq!(deletes("wasm_functype_delete"), 1);
}

#[test]
fn store_rooted_objects_release_before_their_store() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();
    let store = Store::new(&engine).unwrap();

    {
        let scope = Scope::open();
        let ty = GlobalType::new(&scope, rt, ValKind::I32, Mutability::Const).unwrap();
        let global = wasmcapi::Global::new(&scope, &store, &ty, wasmcapi::Val::I32(11)).unwrap();

        assert_eq!(global.get().unwrap().i32(), Some(11));
    }

    assert_eq!(deletes("wasm_global_delete"), 1);
    assert_eq!(deletes("wasm_store_delete"), 0);

    drop(store);
    assert_eq!(deletes("wasm_store_delete"), 1);
}
