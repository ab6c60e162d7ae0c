//! Kept to a single test: the callback registry is process-wide.

mod common;

use std::sync::Arc;

use wasmcapi::{Engine, ExternVec, Func, FuncType, Instance, Module, Scope, Store, live_callbacks};

use self::common::{deletes, runtime, wasm};

#[test]
fn closures_live_until_the_engine_finalizes_them() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();
    let store = Store::new(&engine).unwrap();

    let token = Arc::new(());
    assert_eq!(live_callbacks(), 0);

    let module = Module::new(
        &store,
        &wasm(r#"(module (import "env" "noop" (func)) (export "noop" (func 0)))"#),
    )
    .unwrap();

    {
        let scope = Scope::open();
        let ty = FuncType::new(&scope, rt, &[], &[]).unwrap();
        let noop = Func::new(&scope, &store, &ty, {
            let token = token.clone();
            move |_, _, _| {
                let _ = &token;
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(live_callbacks(), 1);

        let instance =
            Instance::new(&store, &module, &ExternVec::from_host(&scope, rt, &[&noop])).unwrap();
        noop.close();

        let exports = instance.exports(&scope);
        exports.get(0).into_func().unwrap().call(&[]).unwrap();
        exports.close();

        instance.close();
    }

    // Wasmtime keeps host functions alive for as long as their store.
    assert_eq!(deletes("wasm_func_delete"), 1);
    assert_eq!(live_callbacks(), 1);
    assert_eq!(Arc::strong_count(&token), 2);

    module.close();
    store.close();

    assert_eq!(live_callbacks(), 0);
    assert_eq!(Arc::strong_count(&token), 1);
}
