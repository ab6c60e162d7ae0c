mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicI32, Ordering::Relaxed},
    },
    thread,
};

use wasmcapi::{
    Engine, ExternVec, Func, FuncType, Global, GlobalType, Instance, Module, Mutability, Scope,
    Store, Val, ValKind,
};

use self::common::{runtime, wasm};

const IDENTITY: &str = r#"
    (module
        (import "env" "id" (global $id i32))
        (import "env" "report" (func $report (param i32)))
        (func (export "run") (result i32)
            global.get $id
            call $report
            global.get $id))
"#;

#[test]
fn shared_module_runs_on_many_threads() {
    let rt = runtime();
    let engine = Engine::new(rt).unwrap();

    let shared = {
        let store = Store::new(&engine).unwrap();
        let module = Module::new(&store, &wasm(IDENTITY)).unwrap();
        module.share().unwrap()
    };

    thread::scope(|s| {
        let workers = (0..4)
            .map(|id| {
                let engine = &engine;
                let shared = &shared;

                s.spawn(move || {
                    let store = Store::new(engine).unwrap();
                    let module = Module::obtain(&store, shared).unwrap();
                    let reported = Arc::new(AtomicI32::new(-1));

                    let scope = Scope::open();
                    let global_ty =
                        GlobalType::new(&scope, rt, ValKind::I32, Mutability::Const).unwrap();
                    let global = Global::new(&scope, &store, &global_ty, Val::I32(id)).unwrap();

                    let report_ty = FuncType::new(&scope, rt, &[ValKind::I32], &[]).unwrap();
                    let report = Func::new(&scope, &store, &report_ty, {
                        let reported = reported.clone();
                        move |_, params, _| {
                            let seen = params.i32(0)?;
                            anyhow::ensure!(seen == id, "thread {id} observed id {seen}");

                            reported.store(seen, Relaxed);
                            Ok(())
                        }
                    })
                    .unwrap();

                    let imports = ExternVec::from_host(&scope, rt, &[&global, &report]);
                    let instance = Instance::new(&store, &module, &imports).unwrap();
                    let exports = instance.exports(&scope);

                    let results = exports.get(0).into_func().unwrap().call(&[]).unwrap();
                    assert_eq!(reported.load(Relaxed), id);

                    results[0].i32().unwrap()
                })
            })
            .collect::<Vec<_>>();

        for (id, worker) in workers.into_iter().enumerate() {
            assert_eq!(worker.join().unwrap(), id as i32);
        }
    });

    shared.close();
    engine.close();
}
