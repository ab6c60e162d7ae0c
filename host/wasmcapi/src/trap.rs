use std::{fmt, ptr::NonNull};

use wasmcapi_sys::*;

use crate::{
    ByteElem, ByteVec, FrameElem, FrameVec, Handle, Owned, OwnedVec, Result, Runtime, Scope,
    Store,
    handle::{foreign_object, foreign_view},
};

// === Frame === //

foreign_view! {
    /// One activation record of a trap's stack trace.
    pub struct Frame(wasm_frame_t);
}

foreign_object!(Frame(wasm_frame_t) => wasm_frame_delete);

impl Frame<'_> {
    pub fn func_index(&self) -> u32 {
        unsafe { (self.handle.api().wasm_frame_func_index)(self.as_ptr()) }
    }

    pub fn func_offset(&self) -> usize {
        unsafe { (self.handle.api().wasm_frame_func_offset)(self.as_ptr()) }
    }

    pub fn module_offset(&self) -> usize {
        unsafe { (self.handle.api().wasm_frame_module_offset)(self.as_ptr()) }
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            func_index: self.func_index(),
            func_offset: self.func_offset(),
            module_offset: self.module_offset(),
        }
    }
}

/// A host copy of a [`Frame`].
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct FrameInfo {
    pub func_index: u32,
    pub func_offset: usize,
    pub module_offset: usize,
}

impl fmt::Display for FrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function {} at offset {:#x}",
            self.func_index, self.module_offset
        )
    }
}

// === Trap === //

foreign_view! {
    pub struct Trap(wasm_trap_t);
}

foreign_object!(Trap(wasm_trap_t) => wasm_trap_delete);

impl<'s> Trap<'s> {
    /// Creates a trap carrying `message`, e.g. to hand back from a raw host callback.
    pub fn new<'env>(
        scope: &'s Scope<'env>,
        store: &'env Store<'_>,
        message: &str,
    ) -> Result<Owned<'s, Self>> {
        let rt = store.runtime();
        let raw = unsafe { new_raw(rt, store.as_ptr(), message) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_trap_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

/// Calls `wasm_trap_new` with a NUL-terminated copy of `message`. The caller owns the result.
pub(crate) unsafe fn new_raw(
    rt: Runtime,
    store: *mut wasm_store_t,
    message: &str,
) -> *mut wasm_trap_t {
    let scope = Scope::open();

    let mut bytes = Vec::with_capacity(message.len() + 1);
    bytes.extend_from_slice(message.as_bytes());
    bytes.push(0);

    let message = ByteVec::from_host(&scope, rt, &bytes);
    unsafe { (rt.api().wasm_trap_new)(store, message.as_ptr()) }
}

impl Trap<'_> {
    pub fn message<'s>(&self, scope: &'s Scope<'_>) -> OwnedVec<'s, ByteElem> {
        let api = self.handle.api();
        let raw = self.as_ptr();

        unsafe {
            ByteVec::owned_output(scope, self.runtime(), |out| (api.wasm_trap_message)(raw, out))
        }
    }

    /// The message decoded as UTF-8 without its terminating NUL.
    pub fn message_string(&self) -> String {
        let scope = Scope::open();
        self.message(&scope).to_string_lossy()
    }

    /// The frame the trap was raised in, if the engine recorded one.
    ///
    /// Engines may keep frames pointing into the trap, so they borrow it.
    pub fn origin<'s>(&'s self, scope: &'s Scope<'_>) -> Option<Owned<'s, Frame<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_trap_origin)(self.as_ptr()) };
        let raw = NonNull::new(raw)?;

        Some(unsafe { Owned::adopt(scope, Frame::from_handle(Handle::new(self.runtime(), raw))) })
    }

    pub fn trace<'s>(&'s self, scope: &'s Scope<'_>) -> OwnedVec<'s, FrameElem> {
        let api = self.handle.api();
        let raw = self.as_ptr();

        unsafe {
            FrameVec::owned_output(scope, self.runtime(), |out| (api.wasm_trap_trace)(raw, out))
        }
    }

    /// Copies everything the trap reports into host memory.
    pub fn info(&self) -> TrapInfo {
        let scope = Scope::open();

        let origin = self.origin(&scope).map(|frame| frame.info());
        let trace = self.trace(&scope).iter().map(|frame| frame.info()).collect();

        TrapInfo {
            message: self.message(&scope).to_string_lossy(),
            origin,
            trace,
        }
    }
}

// === TrapInfo === //

/// A host copy of a trap, detached from the store it was raised in.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrapInfo {
    pub message: String,
    pub origin: Option<FrameInfo>,
    pub trace: Vec<FrameInfo>,
}

impl TrapInfo {
    /// Copies out and deletes a trap the caller owns.
    pub(crate) unsafe fn take(rt: Runtime, raw: NonNull<wasm_trap_t>) -> Self {
        let scope = Scope::open();
        let trap = unsafe { Owned::adopt(&scope, Trap::from_handle(Handle::new(rt, raw))) };

        let info = trap.info();
        tracing::debug!(trap = %info.message, frames = info.trace.len(), "took trap");

        info
    }
}

impl fmt::Display for TrapInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;

        if let Some(origin) = &self.origin {
            write!(f, " (in {origin})")?;
        }

        Ok(())
    }
}
