//! A [`WasmApi`] backed by Wasmtime's implementation of `wasm.h`, linked into the process.
//!
//! Every entry point forwards to the engine. The `*_delete` family bumps a per-thread counter
//! first, and a few constructors can be made to return null with [`fail_next_alloc`], so that
//! ownership bugs in a binding show up as wrong counts.

#![allow(clippy::missing_safety_doc)]

mod counters;
mod tests;

pub use self::counters::{delete_count, fail_next_alloc, reset_counters};

use std::{ffi::c_void, ptr};

use wasmcapi_sys::*;

// Pulls the engine's `wasm_*` symbols into the final binary.
use wasmtime_c_api as _;

use crate::counters::{count_delete, take_alloc_failure};

const ENGINE: WasmApi = WasmApi::linked();

/// Returns the function table backed by Wasmtime.
pub fn api() -> &'static WasmApi {
    &API
}

static API: WasmApi = WasmApi {
    wasm_store_new,
    wasm_functype_new,
    wasm_globaltype_new,
    wasm_trap_new,
    wasm_global_new,
    wasm_func_new_with_env,

    wasm_config_delete,
    wasm_engine_delete,
    wasm_store_delete,
    wasm_byte_vec_delete,
    wasm_val_vec_delete,
    wasm_valtype_vec_delete,
    wasm_extern_vec_delete,
    wasm_importtype_vec_delete,
    wasm_exporttype_vec_delete,
    wasm_frame_vec_delete,
    wasm_valtype_delete,
    wasm_functype_delete,
    wasm_globaltype_delete,
    wasm_tabletype_delete,
    wasm_memorytype_delete,
    wasm_externtype_delete,
    wasm_frame_delete,
    wasm_trap_delete,
    wasm_module_delete,
    wasm_shared_module_delete,
    wasm_func_delete,
    wasm_global_delete,
    wasm_instance_delete,

    ..ENGINE
};

// === Deletes === //

macro_rules! counted_deletes {
    ($($name:ident($ty:ty);)*) => {$(
        unsafe extern "C" fn $name(ptr: *mut $ty) {
            count_delete(stringify!($name));
            unsafe { (ENGINE.$name)(ptr) }
        }
    )*};
}

counted_deletes! {
    wasm_config_delete(wasm_config_t);
    wasm_engine_delete(wasm_engine_t);
    wasm_store_delete(wasm_store_t);
    wasm_byte_vec_delete(wasm_byte_vec_t);
    wasm_val_vec_delete(wasm_val_vec_t);
    wasm_valtype_vec_delete(wasm_valtype_vec_t);
    wasm_extern_vec_delete(wasm_extern_vec_t);
    wasm_importtype_vec_delete(wasm_importtype_vec_t);
    wasm_exporttype_vec_delete(wasm_exporttype_vec_t);
    wasm_frame_vec_delete(wasm_frame_vec_t);
    wasm_valtype_delete(wasm_valtype_t);
    wasm_functype_delete(wasm_functype_t);
    wasm_globaltype_delete(wasm_globaltype_t);
    wasm_tabletype_delete(wasm_tabletype_t);
    wasm_memorytype_delete(wasm_memorytype_t);
    wasm_externtype_delete(wasm_externtype_t);
    wasm_frame_delete(wasm_frame_t);
    wasm_trap_delete(wasm_trap_t);
    wasm_module_delete(wasm_module_t);
    wasm_shared_module_delete(wasm_shared_module_t);
    wasm_func_delete(wasm_func_t);
    wasm_global_delete(wasm_global_t);
    wasm_instance_delete(wasm_instance_t);
}

// === Fallible Constructors === //

fn injected_failure(symbol: &'static str) -> bool {
    let fail = take_alloc_failure();
    if fail {
        tracing::debug!(symbol, "failing allocation on request");
    }
    fail
}

unsafe extern "C" fn wasm_store_new(engine: *mut wasm_engine_t) -> *mut wasm_store_t {
    if injected_failure("wasm_store_new") {
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_store_new)(engine) }
}

unsafe extern "C" fn wasm_functype_new(
    params: *mut wasm_valtype_vec_t,
    results: *mut wasm_valtype_vec_t,
) -> *mut wasm_functype_t {
    if injected_failure("wasm_functype_new") {
        // The constructor owns the contents of both vectors even when it fails.
        unsafe {
            (ENGINE.wasm_valtype_vec_delete)(params);
            (ENGINE.wasm_valtype_vec_delete)(results);
        }
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_functype_new)(params, results) }
}

unsafe extern "C" fn wasm_globaltype_new(
    content: *mut wasm_valtype_t,
    mutability: wasm_mutability_t,
) -> *mut wasm_globaltype_t {
    if injected_failure("wasm_globaltype_new") {
        unsafe { (ENGINE.wasm_valtype_delete)(content) };
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_globaltype_new)(content, mutability) }
}

unsafe extern "C" fn wasm_trap_new(
    store: *mut wasm_store_t,
    message: *const wasm_message_t,
) -> *mut wasm_trap_t {
    if injected_failure("wasm_trap_new") {
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_trap_new)(store, message) }
}

unsafe extern "C" fn wasm_global_new(
    store: *mut wasm_store_t,
    ty: *const wasm_globaltype_t,
    val: *const wasm_val_t,
) -> *mut wasm_global_t {
    if injected_failure("wasm_global_new") {
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_global_new)(store, ty, val) }
}

unsafe extern "C" fn wasm_func_new_with_env(
    store: *mut wasm_store_t,
    ty: *const wasm_functype_t,
    callback: wasm_func_callback_with_env_t,
    env: *mut c_void,
    finalizer: wasm_finalizer_t,
) -> *mut wasm_func_t {
    // On failure `env` stays with the caller, who never handed its ownership over.
    if injected_failure("wasm_func_new_with_env") {
        return ptr::null_mut();
    }

    unsafe { (ENGINE.wasm_func_new_with_env)(store, ty, callback, env, finalizer) }
}
