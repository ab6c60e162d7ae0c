use std::{marker::PhantomData, ptr::NonNull};

use wasmcapi_sys::*;

use crate::{Engine, Error, Result, Runtime};

/// An isolated collection of runtime objects, tied to one thread.
///
/// Everything created in a store must be released before the store is. Store-rooted
/// constructors take `&'env Store` next to a `&Scope<'env>`, which makes the borrow checker
/// reject scopes that outlive their store.
#[derive(Debug)]
pub struct Store<'e> {
    engine: &'e Engine,
    raw: NonNull<wasm_store_t>,
    _no_send_sync: PhantomData<*mut ()>,
}

impl<'e> Store<'e> {
    pub fn new(engine: &'e Engine) -> Result<Self> {
        let raw = unsafe { (engine.runtime().api().wasm_store_new)(engine.as_ptr()) };
        let raw = NonNull::new(raw).ok_or_else(|| Error::allocation("wasm_store_new"))?;

        tracing::trace!(ptr = ?raw, "created store");

        Ok(Self {
            engine,
            raw,
            _no_send_sync: PhantomData,
        })
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn runtime(&self) -> Runtime {
        self.engine.runtime()
    }

    pub fn as_ptr(&self) -> *mut wasm_store_t {
        self.raw.as_ptr()
    }

    pub(crate) fn as_non_null(&self) -> NonNull<wasm_store_t> {
        self.raw
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Store<'_> {
    fn drop(&mut self) {
        tracing::trace!(ptr = ?self.raw, "deleting store");
        unsafe { (self.runtime().api().wasm_store_delete)(self.raw.as_ptr()) };
    }
}
