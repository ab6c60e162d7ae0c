use std::{
    ffi::c_void,
    fmt,
    marker::{PhantomData, PhantomPinned},
    ptr,
};

use bytemuck::{Pod, Zeroable};
use derive_where::derive_where;

// === Opaque Objects === //

macro_rules! opaque_types {
    ($($name:ident),*$(,)?) => {$(
        #[repr(C)]
        pub struct $name {
            _data: [u8; 0],
            _marker: PhantomData<(*mut u8, PhantomPinned)>,
        }
    )*};
}

opaque_types!(
    wasm_config_t,
    wasm_engine_t,
    wasm_store_t,
    wasm_valtype_t,
    wasm_functype_t,
    wasm_globaltype_t,
    wasm_tabletype_t,
    wasm_memorytype_t,
    wasm_externtype_t,
    wasm_importtype_t,
    wasm_exporttype_t,
    wasm_ref_t,
    wasm_frame_t,
    wasm_trap_t,
    wasm_module_t,
    wasm_shared_module_t,
    wasm_func_t,
    wasm_global_t,
    wasm_table_t,
    wasm_memory_t,
    wasm_extern_t,
    wasm_instance_t,
);

// === Scalars === //

pub type wasm_byte_t = u8;
pub type wasm_valkind_t = u8;
pub type wasm_externkind_t = u8;
pub type wasm_mutability_t = u8;
pub type wasm_table_size_t = u32;
pub type wasm_memory_pages_t = u32;

pub const WASM_I32: wasm_valkind_t = 0;
pub const WASM_I64: wasm_valkind_t = 1;
pub const WASM_F32: wasm_valkind_t = 2;
pub const WASM_F64: wasm_valkind_t = 3;
pub const WASM_ANYREF: wasm_valkind_t = 128;
pub const WASM_FUNCREF: wasm_valkind_t = 129;

pub const WASM_EXTERN_FUNC: wasm_externkind_t = 0;
pub const WASM_EXTERN_GLOBAL: wasm_externkind_t = 1;
pub const WASM_EXTERN_TABLE: wasm_externkind_t = 2;
pub const WASM_EXTERN_MEMORY: wasm_externkind_t = 3;

pub const WASM_CONST: wasm_mutability_t = 0;
pub const WASM_VAR: wasm_mutability_t = 1;

pub const WASM_LIMITS_MAX_DEFAULT: u32 = 0xffff_ffff;

pub const WASM_PAGE_SIZE: usize = 0x10000;

// === Vectors === //

/// The `{size, data}` record shared by every `wasm_*_vec_t`.
///
/// Flat vectors (`byte`, `val`) store elements inline. Pointer vectors store `*mut T` for an
/// opaque `T` and own the pointees.
#[derive_where(Copy, Clone)]
#[repr(C)]
pub struct wasm_vec_t<T> {
    pub size: usize,
    pub data: *mut T,
}

unsafe impl<T: 'static> Zeroable for wasm_vec_t<T> {}

impl<T> fmt::Debug for wasm_vec_t<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("wasm_vec_t")
            .field("size", &self.size)
            .field("data", &self.data)
            .finish()
    }
}

impl<T> Default for wasm_vec_t<T> {
    fn default() -> Self {
        Self {
            size: 0,
            data: ptr::null_mut(),
        }
    }
}

pub type wasm_byte_vec_t = wasm_vec_t<wasm_byte_t>;
pub type wasm_name_t = wasm_byte_vec_t;
pub type wasm_message_t = wasm_name_t;
pub type wasm_val_vec_t = wasm_vec_t<wasm_val_t>;
pub type wasm_valtype_vec_t = wasm_vec_t<*mut wasm_valtype_t>;
pub type wasm_extern_vec_t = wasm_vec_t<*mut wasm_extern_t>;
pub type wasm_importtype_vec_t = wasm_vec_t<*mut wasm_importtype_t>;
pub type wasm_exporttype_vec_t = wasm_vec_t<*mut wasm_exporttype_t>;
pub type wasm_frame_vec_t = wasm_vec_t<*mut wasm_frame_t>;

// === Records === //

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct wasm_limits_t {
    pub min: u32,
    pub max: u32,
}

#[derive(Copy, Clone)]
#[repr(C)]
pub union wasm_val_union {
    pub i32: i32,
    pub i64: i64,
    pub f32: f32,
    pub f64: f64,
    pub ref_: *mut wasm_ref_t,
}

unsafe impl Zeroable for wasm_val_union {}

#[derive(Copy, Clone)]
#[repr(C)]
pub struct wasm_val_t {
    pub kind: wasm_valkind_t,
    pub of: wasm_val_union,
}

unsafe impl Zeroable for wasm_val_t {}

impl fmt::Debug for wasm_val_t {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("wasm_val_t")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// === Callbacks === //

pub type wasm_func_callback_t = Option<
    unsafe extern "C" fn(args: *const wasm_val_vec_t, results: *mut wasm_val_vec_t) -> *mut wasm_trap_t,
>;

pub type wasm_func_callback_with_env_t = Option<
    unsafe extern "C" fn(
        env: *mut c_void,
        args: *const wasm_val_vec_t,
        results: *mut wasm_val_vec_t,
    ) -> *mut wasm_trap_t,
>;

pub type wasm_finalizer_t = Option<unsafe extern "C" fn(env: *mut c_void)>;
