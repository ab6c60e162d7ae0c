use std::{marker::PhantomData, ptr::NonNull};

use wasmcapi_sys::*;

use crate::{
    ByteElem, ByteVec, Error, ExportTypeElem, ExportTypeVec, ImportTypeElem, ImportTypeVec,
    OwnedVec, Result, Runtime, Scope, Store,
};

// === Module === //

/// A compiled module, usable within the store it was compiled or obtained in.
#[derive(Debug)]
pub struct Module<'st> {
    rt: Runtime,
    raw: NonNull<wasm_module_t>,
    _store: PhantomData<&'st ()>,
}

impl<'st> Module<'st> {
    /// Checks whether `binary` is a valid module without compiling it.
    pub fn validate(store: &Store<'_>, binary: &[u8]) -> bool {
        let rt = store.runtime();
        let scope = Scope::open();
        let binary = ByteVec::from_host(&scope, rt, binary);

        unsafe { (rt.api().wasm_module_validate)(store.as_ptr(), binary.as_ptr()) }
    }

    pub fn new(store: &'st Store<'_>, binary: &[u8]) -> Result<Self> {
        let rt = store.runtime();
        let scope = Scope::open();
        let binary = ByteVec::from_host(&scope, rt, binary);

        let raw = unsafe { (rt.api().wasm_module_new)(store.as_ptr(), binary.as_ptr()) };
        let Some(raw) = NonNull::new(raw) else {
            tracing::debug!(len = binary.len(), "module failed to compile");
            return Err(Error::Compilation);
        };

        Ok(Self::from_raw(rt, raw))
    }

    /// Rebuilds a module from the output of [`Module::serialize`].
    pub fn deserialize(store: &'st Store<'_>, serialized: &[u8]) -> Result<Self> {
        let rt = store.runtime();
        let scope = Scope::open();
        let serialized = ByteVec::from_host(&scope, rt, serialized);

        let raw = unsafe { (rt.api().wasm_module_deserialize)(store.as_ptr(), serialized.as_ptr()) };
        let raw = NonNull::new(raw).ok_or(Error::Deserialization)?;

        Ok(Self::from_raw(rt, raw))
    }

    /// Materializes a module shared from another store, possibly on another thread.
    pub fn obtain(store: &'st Store<'_>, shared: &SharedModule) -> Result<Self> {
        let rt = store.runtime();

        let raw = unsafe { (rt.api().wasm_module_obtain)(store.as_ptr(), shared.raw.as_ptr()) };
        let raw = NonNull::new(raw).ok_or_else(|| Error::allocation("wasm_module_obtain"))?;

        Ok(Self::from_raw(rt, raw))
    }

    fn from_raw(rt: Runtime, raw: NonNull<wasm_module_t>) -> Self {
        tracing::trace!(ptr = ?raw, "created module");

        Self {
            rt,
            raw,
            _store: PhantomData,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    pub fn as_ptr(&self) -> *mut wasm_module_t {
        self.raw.as_ptr()
    }

    pub fn imports<'s>(&self, scope: &'s Scope<'_>) -> OwnedVec<'s, ImportTypeElem> {
        let api = self.rt.api();
        let raw = self.as_ptr();

        unsafe { ImportTypeVec::owned_output(scope, self.rt, |out| (api.wasm_module_imports)(raw, out)) }
    }

    pub fn exports<'s>(&self, scope: &'s Scope<'_>) -> OwnedVec<'s, ExportTypeElem> {
        let api = self.rt.api();
        let raw = self.as_ptr();

        unsafe { ExportTypeVec::owned_output(scope, self.rt, |out| (api.wasm_module_exports)(raw, out)) }
    }

    /// Engine-specific bytes that [`Module::deserialize`] accepts.
    pub fn serialize<'s>(&self, scope: &'s Scope<'_>) -> OwnedVec<'s, ByteElem> {
        let api = self.rt.api();
        let raw = self.as_ptr();

        unsafe { ByteVec::owned_output(scope, self.rt, |out| (api.wasm_module_serialize)(raw, out)) }
    }

    pub fn serialize_to_vec(&self) -> Vec<u8> {
        let scope = Scope::open();
        self.serialize(&scope).as_bytes().to_vec()
    }

    pub fn share(&self) -> Result<SharedModule> {
        let raw = unsafe { (self.rt.api().wasm_module_share)(self.as_ptr()) };
        let raw = NonNull::new(raw).ok_or_else(|| Error::allocation("wasm_module_share"))?;

        Ok(SharedModule { rt: self.rt, raw })
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Module<'_> {
    fn drop(&mut self) {
        tracing::trace!(ptr = ?self.raw, "deleting module");
        unsafe { (self.rt.api().wasm_module_delete)(self.raw.as_ptr()) };
    }
}

// === SharedModule === //

/// A store-independent handle to a compiled module that may cross threads.
#[derive(Debug)]
pub struct SharedModule {
    rt: Runtime,
    raw: NonNull<wasm_shared_module_t>,
}

unsafe impl Send for SharedModule {}
unsafe impl Sync for SharedModule {}

impl SharedModule {
    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    pub fn as_ptr(&self) -> *mut wasm_shared_module_t {
        self.raw.as_ptr()
    }

    pub fn close(self) {
        drop(self);
    }
}

impl Drop for SharedModule {
    fn drop(&mut self) {
        unsafe { (self.rt.api().wasm_shared_module_delete)(self.raw.as_ptr()) };
    }
}
