use std::ptr::NonNull;

use wasmcapi_sys::*;

use crate::{Error, Result, Runtime};

// === Config === //

/// Engine configuration. Consumed by [`Engine::with_config`].
#[derive(Debug)]
pub struct Config {
    rt: Runtime,
    raw: NonNull<wasm_config_t>,
}

impl Config {
    pub fn new(rt: Runtime) -> Result<Self> {
        let raw = unsafe { (rt.api().wasm_config_new)() };
        let raw = NonNull::new(raw).ok_or_else(|| Error::allocation("wasm_config_new"))?;

        Ok(Self { rt, raw })
    }

    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    fn into_raw(self) -> NonNull<wasm_config_t> {
        let raw = self.raw;
        std::mem::forget(self);
        raw
    }
}

impl Drop for Config {
    fn drop(&mut self) {
        unsafe { (self.rt.api().wasm_config_delete)(self.raw.as_ptr()) };
    }
}

// === Engine === //

/// The root of every object graph. Outlives the stores created from it.
///
/// Engines may be shared across threads.
#[derive(Debug)]
pub struct Engine {
    rt: Runtime,
    raw: NonNull<wasm_engine_t>,
}

unsafe impl Send for Engine {}
unsafe impl Sync for Engine {}

impl Engine {
    pub fn new(rt: Runtime) -> Result<Self> {
        let raw = unsafe { (rt.api().wasm_engine_new)() };
        Self::from_ctor(rt, raw, "wasm_engine_new")
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let rt = config.runtime();

        // Takes ownership of the config whether or not it succeeds.
        let raw = unsafe { (rt.api().wasm_engine_new_with_config)(config.into_raw().as_ptr()) };
        Self::from_ctor(rt, raw, "wasm_engine_new_with_config")
    }

    fn from_ctor(rt: Runtime, raw: *mut wasm_engine_t, what: &'static str) -> Result<Self> {
        let raw = NonNull::new(raw).ok_or_else(|| Error::allocation(what))?;
        tracing::debug!(ptr = ?raw, "created engine");

        Ok(Self { rt, raw })
    }

    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    pub fn as_ptr(&self) -> *mut wasm_engine_t {
        self.raw.as_ptr()
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        tracing::debug!(ptr = ?self.raw, "deleting engine");
        unsafe { (self.rt.api().wasm_engine_delete)(self.raw.as_ptr()) };
    }
}
