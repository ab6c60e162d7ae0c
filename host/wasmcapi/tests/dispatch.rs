mod common;

use wasmcapi::{
    Engine, Error, Extern, ExternKind, ExternType, ExternVec, Instance, Limits, MemoryType, Module,
    Scope, Store, TableType, Val, ValKind,
};

use self::common::{deletes, runtime, wasm};

const ALL_KINDS: &str = r#"
    (module
        (func (export "f") (param i32) (result i32) local.get 0)
        (global (export "g") (mut i64) (i64.const 5))
        (table (export "t") 2 8 funcref)
        (memory (export "m") 1 3))
"#;

#[test]
fn export_types_resolve_to_their_kind() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();
    let store = Store::new(&engine).unwrap();
    let module = Module::new(&store, &wasm(ALL_KINDS)).unwrap();

    let scope = Scope::open();
    let exports = module.exports(&scope);

    let names = exports
        .iter()
        .map(|export| export.name().to_string_lossy())
        .collect::<Vec<_>>();
    assert_eq!(names, ["f", "g", "t", "m"]);

    let kinds = exports
        .iter()
        .map(|export| export.ty().kind().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [ExternKind::Func, ExternKind::Global, ExternKind::Table, ExternKind::Memory]
    );

    for export in exports.iter() {
        match export.ty().downcast().unwrap() {
            ExternType::Func(ty) => {
                assert_eq!(ty.param_kinds().unwrap(), [ValKind::I32]);
                assert_eq!(ty.result_kinds().unwrap(), [ValKind::I32]);
            }
            ExternType::Global(ty) => {
                assert_eq!(ty.content().kind().unwrap(), ValKind::I64);
                assert!(ty.is_mutable());
            }
            ExternType::Table(ty) => {
                assert_eq!(ty.element().kind().unwrap(), ValKind::FuncRef);
                assert_eq!(ty.limits(), Limits::new(2, Some(8)));
            }
            ExternType::Memory(ty) => {
                assert_eq!(ty.limits(), Limits::new(1, Some(3)));
            }
        }
    }
}

#[test]
fn instance_exports_resolve_to_their_kind() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();
    let store = Store::new(&engine).unwrap();
    let module = Module::new(&store, &wasm(ALL_KINDS)).unwrap();

    let scope = Scope::open();
    let instance = Instance::new(&store, &module, &ExternVec::empty(&scope, rt)).unwrap();
    let exports = instance.exports(&scope);
    assert_eq!(exports.len(), 4);

    for export in exports.iter() {
        match export.downcast().unwrap() {
            Extern::Func(func) => {
                assert_eq!(func.param_arity(), 1);
                assert_eq!(func.call(&[Val::I32(9)]).unwrap(), [Val::I32(9)]);
            }
            Extern::Global(global) => {
                assert_eq!(global.get().unwrap(), Val::I64(5));

                global.set(Val::I64(6)).unwrap();
                assert_eq!(global.get().unwrap(), Val::I64(6));

                assert!(matches!(
                    global.set(Val::I32(1)),
                    Err(Error::TypeMismatch { .. })
                ));
            }
            Extern::Table(table) => {
                assert_eq!(table.size(), 2);
                assert_eq!(table.ty(&scope).unwrap().limits(), Limits::new(2, Some(8)));
            }
            Extern::Memory(memory) => {
                assert_eq!(memory.size(), 1);
                assert_eq!(memory.data_size(), 65536);
            }
        }
    }

    let kinds = exports
        .iter()
        .map(|export| export.ty(&scope).unwrap().kind().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [ExternKind::Func, ExternKind::Global, ExternKind::Table, ExternKind::Memory]
    );
}

#[test]
fn table_and_memory_types_keep_their_limits() {
    let rt = runtime();
    let scope = Scope::open();

    let table = TableType::new(&scope, rt, ValKind::FuncRef, Limits::new(1, Some(4))).unwrap();
    assert_eq!(table.element().kind().unwrap(), ValKind::FuncRef);
    assert_eq!(table.limits(), Limits::new(1, Some(4)));

    let memory = MemoryType::new(&scope, rt, Limits::new(2, None)).unwrap();
    assert_eq!(memory.limits(), Limits::new(2, None));
    assert_eq!(memory.limits_record().get().max, wasmcapi::sys::WASM_LIMITS_MAX_DEFAULT);

    scope.close();
    assert_eq!(deletes("wasm_tabletype_delete"), 1);
    assert_eq!(deletes("wasm_memorytype_delete"), 1);
}

#[test]
fn immutable_globals_reject_writes() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();
    let store = Store::new(&engine).unwrap();

    let scope = Scope::open();
    let ty = wasmcapi::GlobalType::new(&scope, rt, ValKind::I32, wasmcapi::Mutability::Const)
        .unwrap();
    let global = wasmcapi::Global::new(&scope, &store, &ty, Val::I32(1)).unwrap();

    assert!(matches!(global.set(Val::I32(2)), Err(Error::ImmutableGlobal)));
    assert_eq!(global.as_extern().downcast().unwrap().kind(), ExternKind::Global);
}
