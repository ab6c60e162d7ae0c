use std::{ffi::c_void, fmt};

use libloading::Library;

use crate::*;

macro_rules! wasm_api {
    ($(
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// The foreign function table, one entry per `wasm.h` symbol this binding uses.
        ///
        /// Fields are named after the C symbol they resolve to.
        #[derive(Copy, Clone)]
        pub struct WasmApi {
            $(pub $name: unsafe extern "C" fn($($arg: $ty),*) $(-> $ret)?,)*
        }

        impl WasmApi {
            /// Every symbol resolved by [`WasmApi::load`].
            pub const SYMBOLS: &'static [&'static str] = &[$(stringify!($name)),*];

            /// Resolves every entry of the table from `lib`.
            ///
            /// # Safety
            ///
            /// The symbols exported by `lib` must have the signatures declared by `wasm.h`.
            pub unsafe fn load(lib: &Library) -> Result<Self, libloading::Error> {
                Ok(Self {
                    $($name: unsafe {
                        *lib.get::<unsafe extern "C" fn($($arg: $ty),*) $(-> $ret)?>(
                            concat!(stringify!($name), "\0").as_bytes(),
                        )?
                    },)*
                })
            }
        }

        #[cfg(feature = "linked")]
        mod linked {
            use super::*;

            unsafe extern "C" {
                $(pub fn $name($($arg: $ty),*) $(-> $ret)?;)*
            }
        }

        #[cfg(feature = "linked")]
        impl WasmApi {
            /// The table of symbols resolved by the linker, for binaries that link an engine
            /// into the process instead of loading one.
            pub const fn linked() -> Self {
                Self {
                    $($name: linked::$name,)*
                }
            }
        }
    };
}

impl fmt::Debug for WasmApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmApi")
            .field("symbols", &Self::SYMBOLS.len())
            .finish_non_exhaustive()
    }
}

wasm_api! {
    // Runtime
    fn wasm_config_new() -> *mut wasm_config_t;
    fn wasm_config_delete(config: *mut wasm_config_t);
    fn wasm_engine_new() -> *mut wasm_engine_t;
    fn wasm_engine_new_with_config(config: *mut wasm_config_t) -> *mut wasm_engine_t;
    fn wasm_engine_delete(engine: *mut wasm_engine_t);
    fn wasm_store_new(engine: *mut wasm_engine_t) -> *mut wasm_store_t;
    fn wasm_store_delete(store: *mut wasm_store_t);

    // Vectors
    fn wasm_byte_vec_new_empty(out: *mut wasm_byte_vec_t);
    fn wasm_byte_vec_delete(vec: *mut wasm_byte_vec_t);
    fn wasm_val_vec_new_empty(out: *mut wasm_val_vec_t);
    fn wasm_val_vec_delete(vec: *mut wasm_val_vec_t);
    fn wasm_valtype_vec_new_empty(out: *mut wasm_valtype_vec_t);
    fn wasm_valtype_vec_new(out: *mut wasm_valtype_vec_t, size: usize, data: *const *mut wasm_valtype_t);
    fn wasm_valtype_vec_delete(vec: *mut wasm_valtype_vec_t);
    fn wasm_extern_vec_new_empty(out: *mut wasm_extern_vec_t);
    fn wasm_extern_vec_delete(vec: *mut wasm_extern_vec_t);
    fn wasm_importtype_vec_new_empty(out: *mut wasm_importtype_vec_t);
    fn wasm_importtype_vec_delete(vec: *mut wasm_importtype_vec_t);
    fn wasm_exporttype_vec_new_empty(out: *mut wasm_exporttype_vec_t);
    fn wasm_exporttype_vec_delete(vec: *mut wasm_exporttype_vec_t);
    fn wasm_frame_vec_new_empty(out: *mut wasm_frame_vec_t);
    fn wasm_frame_vec_delete(vec: *mut wasm_frame_vec_t);

    // Types
    fn wasm_valtype_new(kind: wasm_valkind_t) -> *mut wasm_valtype_t;
    fn wasm_valtype_kind(ty: *const wasm_valtype_t) -> wasm_valkind_t;
    fn wasm_valtype_delete(ty: *mut wasm_valtype_t);

    fn wasm_functype_new(params: *mut wasm_valtype_vec_t, results: *mut wasm_valtype_vec_t) -> *mut wasm_functype_t;
    fn wasm_functype_params(ty: *const wasm_functype_t) -> *const wasm_valtype_vec_t;
    fn wasm_functype_results(ty: *const wasm_functype_t) -> *const wasm_valtype_vec_t;
    fn wasm_functype_as_externtype(ty: *mut wasm_functype_t) -> *mut wasm_externtype_t;
    fn wasm_functype_delete(ty: *mut wasm_functype_t);

    fn wasm_globaltype_new(content: *mut wasm_valtype_t, mutability: wasm_mutability_t) -> *mut wasm_globaltype_t;
    fn wasm_globaltype_content(ty: *const wasm_globaltype_t) -> *const wasm_valtype_t;
    fn wasm_globaltype_mutability(ty: *const wasm_globaltype_t) -> wasm_mutability_t;
    fn wasm_globaltype_as_externtype(ty: *mut wasm_globaltype_t) -> *mut wasm_externtype_t;
    fn wasm_globaltype_delete(ty: *mut wasm_globaltype_t);

    fn wasm_tabletype_new(element: *mut wasm_valtype_t, limits: *const wasm_limits_t) -> *mut wasm_tabletype_t;
    fn wasm_tabletype_element(ty: *const wasm_tabletype_t) -> *const wasm_valtype_t;
    fn wasm_tabletype_limits(ty: *const wasm_tabletype_t) -> *const wasm_limits_t;
    fn wasm_tabletype_as_externtype(ty: *mut wasm_tabletype_t) -> *mut wasm_externtype_t;
    fn wasm_tabletype_delete(ty: *mut wasm_tabletype_t);

    fn wasm_memorytype_new(limits: *const wasm_limits_t) -> *mut wasm_memorytype_t;
    fn wasm_memorytype_limits(ty: *const wasm_memorytype_t) -> *const wasm_limits_t;
    fn wasm_memorytype_as_externtype(ty: *mut wasm_memorytype_t) -> *mut wasm_externtype_t;
    fn wasm_memorytype_delete(ty: *mut wasm_memorytype_t);

    fn wasm_externtype_kind(ty: *const wasm_externtype_t) -> wasm_externkind_t;
    fn wasm_externtype_as_functype(ty: *mut wasm_externtype_t) -> *mut wasm_functype_t;
    fn wasm_externtype_as_globaltype(ty: *mut wasm_externtype_t) -> *mut wasm_globaltype_t;
    fn wasm_externtype_as_tabletype(ty: *mut wasm_externtype_t) -> *mut wasm_tabletype_t;
    fn wasm_externtype_as_memorytype(ty: *mut wasm_externtype_t) -> *mut wasm_memorytype_t;
    fn wasm_externtype_delete(ty: *mut wasm_externtype_t);

    fn wasm_importtype_module(ty: *const wasm_importtype_t) -> *const wasm_name_t;
    fn wasm_importtype_name(ty: *const wasm_importtype_t) -> *const wasm_name_t;
    fn wasm_importtype_type(ty: *const wasm_importtype_t) -> *const wasm_externtype_t;
    fn wasm_exporttype_name(ty: *const wasm_exporttype_t) -> *const wasm_name_t;
    fn wasm_exporttype_type(ty: *const wasm_exporttype_t) -> *const wasm_externtype_t;

    // Traps
    fn wasm_frame_func_index(frame: *const wasm_frame_t) -> u32;
    fn wasm_frame_func_offset(frame: *const wasm_frame_t) -> usize;
    fn wasm_frame_module_offset(frame: *const wasm_frame_t) -> usize;
    fn wasm_frame_delete(frame: *mut wasm_frame_t);

    fn wasm_trap_new(store: *mut wasm_store_t, message: *const wasm_message_t) -> *mut wasm_trap_t;
    fn wasm_trap_message(trap: *const wasm_trap_t, out: *mut wasm_message_t);
    fn wasm_trap_origin(trap: *const wasm_trap_t) -> *mut wasm_frame_t;
    fn wasm_trap_trace(trap: *const wasm_trap_t, out: *mut wasm_frame_vec_t);
    fn wasm_trap_delete(trap: *mut wasm_trap_t);

    // Modules
    fn wasm_module_validate(store: *mut wasm_store_t, binary: *const wasm_byte_vec_t) -> bool;
    fn wasm_module_new(store: *mut wasm_store_t, binary: *const wasm_byte_vec_t) -> *mut wasm_module_t;
    fn wasm_module_imports(module: *const wasm_module_t, out: *mut wasm_importtype_vec_t);
    fn wasm_module_exports(module: *const wasm_module_t, out: *mut wasm_exporttype_vec_t);
    fn wasm_module_serialize(module: *const wasm_module_t, out: *mut wasm_byte_vec_t);
    fn wasm_module_deserialize(store: *mut wasm_store_t, binary: *const wasm_byte_vec_t) -> *mut wasm_module_t;
    fn wasm_module_share(module: *const wasm_module_t) -> *mut wasm_shared_module_t;
    fn wasm_module_obtain(store: *mut wasm_store_t, shared: *const wasm_shared_module_t) -> *mut wasm_module_t;
    fn wasm_module_delete(module: *mut wasm_module_t);
    fn wasm_shared_module_delete(shared: *mut wasm_shared_module_t);

    // Externs
    fn wasm_func_new(store: *mut wasm_store_t, ty: *const wasm_functype_t, callback: wasm_func_callback_t) -> *mut wasm_func_t;
    fn wasm_func_new_with_env(
        store: *mut wasm_store_t,
        ty: *const wasm_functype_t,
        callback: wasm_func_callback_with_env_t,
        env: *mut c_void,
        finalizer: wasm_finalizer_t,
    ) -> *mut wasm_func_t;
    fn wasm_func_type(func: *const wasm_func_t) -> *mut wasm_functype_t;
    fn wasm_func_param_arity(func: *const wasm_func_t) -> usize;
    fn wasm_func_result_arity(func: *const wasm_func_t) -> usize;
    fn wasm_func_call(func: *const wasm_func_t, args: *const wasm_val_vec_t, results: *mut wasm_val_vec_t) -> *mut wasm_trap_t;
    fn wasm_func_as_extern(func: *mut wasm_func_t) -> *mut wasm_extern_t;
    fn wasm_func_delete(func: *mut wasm_func_t);

    fn wasm_global_new(store: *mut wasm_store_t, ty: *const wasm_globaltype_t, val: *const wasm_val_t) -> *mut wasm_global_t;
    fn wasm_global_type(global: *const wasm_global_t) -> *mut wasm_globaltype_t;
    fn wasm_global_get(global: *const wasm_global_t, out: *mut wasm_val_t);
    fn wasm_global_set(global: *mut wasm_global_t, val: *const wasm_val_t);
    fn wasm_global_as_extern(global: *mut wasm_global_t) -> *mut wasm_extern_t;
    fn wasm_global_delete(global: *mut wasm_global_t);

    fn wasm_table_type(table: *const wasm_table_t) -> *mut wasm_tabletype_t;
    fn wasm_table_size(table: *const wasm_table_t) -> wasm_table_size_t;
    fn wasm_table_as_extern(table: *mut wasm_table_t) -> *mut wasm_extern_t;

    fn wasm_memory_type(memory: *const wasm_memory_t) -> *mut wasm_memorytype_t;
    fn wasm_memory_size(memory: *const wasm_memory_t) -> wasm_memory_pages_t;
    fn wasm_memory_data_size(memory: *const wasm_memory_t) -> usize;
    fn wasm_memory_as_extern(memory: *mut wasm_memory_t) -> *mut wasm_extern_t;

    fn wasm_extern_kind(ext: *const wasm_extern_t) -> wasm_externkind_t;
    fn wasm_extern_type(ext: *const wasm_extern_t) -> *mut wasm_externtype_t;
    fn wasm_extern_as_func(ext: *mut wasm_extern_t) -> *mut wasm_func_t;
    fn wasm_extern_as_global(ext: *mut wasm_extern_t) -> *mut wasm_global_t;
    fn wasm_extern_as_table(ext: *mut wasm_extern_t) -> *mut wasm_table_t;
    fn wasm_extern_as_memory(ext: *mut wasm_extern_t) -> *mut wasm_memory_t;

    // Instances
    fn wasm_instance_new(
        store: *mut wasm_store_t,
        module: *const wasm_module_t,
        imports: *const wasm_extern_vec_t,
        trap: *mut *mut wasm_trap_t,
    ) -> *mut wasm_instance_t;
    fn wasm_instance_exports(instance: *const wasm_instance_t, out: *mut wasm_extern_vec_t);
    fn wasm_instance_delete(instance: *mut wasm_instance_t);
}
