//! Typed, scope-checked bindings over the `wasm.h` embedding API.
//!
//! Foreign objects come in two flavors. Borrowed views (`FuncType<'a>`, `ByteVec<'a>`, ...)
//! have no destructor and cannot outlive whatever owns them. [`Owned`] wrappers pair a view
//! with a release action registered in a [`Scope`]; the foreign destructor runs exactly once,
//! either when the wrapper is closed early or when the scope closes.
//!
//! The session objects ([`Engine`], [`Store`], [`Module`], [`SharedModule`], [`Instance`]) are
//! plain RAII types whose lifetimes encode the parent-before-child destruction order.

#![allow(clippy::missing_safety_doc)]

mod callback;
pub use self::callback::*;

mod engine;
pub use self::engine::*;

mod error;
pub use self::error::*;

mod externs;
pub use self::externs::*;

mod handle;
pub use self::handle::*;

mod instance;
pub use self::instance::*;

mod module;
pub use self::module::*;

mod record;
pub use self::record::*;

mod runtime;
pub use self::runtime::*;

mod scope;
pub use self::scope::*;

mod store;
pub use self::store::*;

mod trap;
pub use self::trap::*;

mod types;
pub use self::types::*;

mod val;
pub use self::val::*;

mod vec;
pub use self::vec::*;

mod tests;

pub use wasmcapi_sys as sys;
