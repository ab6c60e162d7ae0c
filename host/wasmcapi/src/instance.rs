use std::{
    marker::PhantomData,
    ptr::{self, NonNull},
};

use wasmcapi_sys::*;

use crate::{
    Error, Extern, ExternElem, ExternRef, ExternType, ExternTypeRef, ExternVec, Module, OwnedVec,
    Result, Runtime, Scope, Store, TrapInfo,
};

/// An instantiated module.
#[derive(Debug)]
pub struct Instance<'st> {
    rt: Runtime,
    raw: NonNull<wasm_instance_t>,
    _store: PhantomData<&'st ()>,
}

impl<'st> Instance<'st> {
    /// Instantiates `module` with `imports` in declaration order, running its start function.
    ///
    /// Fails with [`Error::ImportMismatch`] if the imports do not line up with the module's
    /// declarations and with [`Error::InstantiationTrapped`] if the engine reports a trap,
    /// most commonly from the start function.
    pub fn new(store: &'st Store<'_>, module: &Module<'_>, imports: &ExternVec<'_>) -> Result<Self> {
        let rt = store.runtime();
        let api = rt.api();

        // Engines differ in how they report link errors, some through the trap out-parameter.
        check_imports(module, imports)?;

        let mut trap = ptr::null_mut();
        let raw = unsafe {
            (api.wasm_instance_new)(store.as_ptr(), module.as_ptr(), imports.as_ptr(), &mut trap)
        };

        match (NonNull::new(raw), NonNull::new(trap)) {
            (Some(raw), None) => {
                tracing::trace!(ptr = ?raw, imports = imports.len(), "instantiated module");

                Ok(Self {
                    rt,
                    raw,
                    _store: PhantomData,
                })
            }
            (None, Some(trap)) => Err(Error::InstantiationTrapped(unsafe { TrapInfo::take(rt, trap) })),
            (Some(raw), Some(trap)) => {
                tracing::warn!("instantiation returned both an instance and a trap, discarding the instance");
                unsafe { (api.wasm_instance_delete)(raw.as_ptr()) };

                Err(Error::InstantiationTrapped(unsafe { TrapInfo::take(rt, trap) }))
            }
            (None, None) => Err(Error::ImportMismatch),
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    pub fn as_ptr(&self) -> *mut wasm_instance_t {
        self.raw.as_ptr()
    }

    /// The instance's exports in declaration order.
    pub fn exports<'s, 'env>(&self, scope: &'s Scope<'env>) -> OwnedVec<'s, ExternElem>
    where
        'st: 'env,
    {
        let api = self.rt.api();
        let raw = self.as_ptr();

        unsafe { ExternVec::owned_output(scope, self.rt, |out| (api.wasm_instance_exports)(raw, out)) }
    }

    pub fn close(self) {
        drop(self);
    }
}

/// Compares `imports` against the module's declarations by count, kind and, for functions
/// and globals, by type. Table and memory limits are left to the engine.
fn check_imports(module: &Module<'_>, imports: &ExternVec<'_>) -> Result<()> {
    let scope = Scope::open();
    let declared = module.imports(&scope);

    if declared.len() != imports.len() {
        tracing::debug!(
            expected = declared.len(),
            actual = imports.len(),
            "wrong number of imports"
        );
        return Err(Error::ImportMismatch);
    }

    for (import, ext) in declared.iter().zip(imports.iter()) {
        if !import_matches(&scope, &import.ty(), &ext)? {
            tracing::debug!(
                module = %import.module().to_string_lossy(),
                name = %import.name().to_string_lossy(),
                "incompatible import"
            );
            return Err(Error::ImportMismatch);
        }
    }

    Ok(())
}

fn import_matches(
    scope: &Scope<'_>,
    declared: &ExternTypeRef<'_>,
    ext: &ExternRef<'_>,
) -> Result<bool> {
    Ok(match (declared.downcast()?, ext.downcast()?) {
        (ExternType::Func(expected), Extern::Func(func)) => {
            let actual = func.ty(scope)?;
            expected.param_kinds()? == actual.param_kinds()?
                && expected.result_kinds()? == actual.result_kinds()?
        }
        (ExternType::Global(expected), Extern::Global(global)) => {
            let actual = global.ty(scope)?;
            expected.content().kind()? == actual.content().kind()?
                && expected.mutability() == actual.mutability()
        }
        (ExternType::Table(_), Extern::Table(_)) | (ExternType::Memory(_), Extern::Memory(_)) => {
            true
        }
        _ => false,
    })
}

impl Drop for Instance<'_> {
    fn drop(&mut self) {
        tracing::trace!(ptr = ?self.raw, "deleting instance");
        unsafe { (self.rt.api().wasm_instance_delete)(self.raw.as_ptr()) };
    }
}
