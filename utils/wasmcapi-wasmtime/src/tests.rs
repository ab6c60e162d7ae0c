#![cfg(test)]

use super::*;

use std::thread;

const EMPTY_MODULE: &[u8] = b"\0asm\x01\0\0\0";

#[test]
fn deletes_are_counted_per_symbol() {
    reset_counters();
    let api = api();

    unsafe {
        let engine = (api.wasm_engine_new)();
        let store = (api.wasm_store_new)(engine);
        assert!(!store.is_null());

        (api.wasm_store_delete)(store);
        (api.wasm_engine_delete)(engine);
    }

    assert_eq!(delete_count("wasm_store_delete"), 1);
    assert_eq!(delete_count("wasm_engine_delete"), 1);
    assert_eq!(delete_count("wasm_module_delete"), 0);

    reset_counters();
    assert_eq!(delete_count("wasm_store_delete"), 0);
}

#[test]
fn injected_failures_hit_one_constructor() {
    reset_counters();
    let api = api();

    unsafe {
        let engine = (api.wasm_engine_new)();

        fail_next_alloc();
        assert!((api.wasm_store_new)(engine).is_null());

        let store = (api.wasm_store_new)(engine);
        assert!(!store.is_null());

        (api.wasm_store_delete)(store);
        (api.wasm_engine_delete)(engine);
    }
}

#[test]
fn counters_are_thread_local() {
    reset_counters();

    thread::spawn(|| unsafe {
        let api = api();
        (api.wasm_engine_delete)((api.wasm_engine_new)());
        assert_eq!(delete_count("wasm_engine_delete"), 1);
    })
    .join()
    .unwrap();

    assert_eq!(delete_count("wasm_engine_delete"), 0);
}

#[test]
fn forwards_to_the_engine() {
    let api = api();

    unsafe {
        let engine = (api.wasm_engine_new)();
        let store = (api.wasm_store_new)(engine);

        let mut bytes = EMPTY_MODULE.to_vec();
        let binary = wasm_byte_vec_t {
            size: bytes.len(),
            data: bytes.as_mut_ptr(),
        };
        assert!((api.wasm_module_validate)(store, &binary));

        bytes[0] = b'!';
        assert!(!(api.wasm_module_validate)(store, &binary));

        (api.wasm_store_delete)(store);
        (api.wasm_engine_delete)(engine);
    }
}
