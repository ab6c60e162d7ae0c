//! Raw declarations for the `wasm.h` embedding API.
//!
//! Nothing here is safe to use directly. The layouts mirror the C headers and every foreign
//! function is reached through a [`WasmApi`] table so that the implementation can either be
//! loaded from a shared library or resolved at link time (the `linked` feature).

#![allow(non_camel_case_types, clippy::missing_safety_doc)]

mod api;
pub use self::api::*;

mod types;
pub use self::types::*;
