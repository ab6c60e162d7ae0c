//! Host functions callable from guests.
//!
//! Closures live in a process-wide arena. The environment pointer handed to the engine is a
//! boxed [`CallbackEnv`] naming the closure's slot, and the engine's finalizer frees both.

use std::{
    ffi::c_void,
    panic::{self, AssertUnwindSafe},
    process,
    ptr::{self, NonNull},
    sync::{Arc, LazyLock, Mutex, PoisonError},
};

use thunderdome::{Arena, Index};
use wasmcapi_sys::*;

use crate::{
    Error, Func, FuncType, Handle, Owned, Result, Runtime, Scope, Store, Val, ValKind, ValVec,
    trap,
};

// === Registry === //

type HostFn = dyn Fn(&Scope<'_>, &Params<'_>, &mut Results<'_>) -> anyhow::Result<()>
    + Send
    + Sync;

static CALLBACKS: LazyLock<Mutex<Arena<Arc<HostFn>>>> = LazyLock::new(Default::default);

fn callbacks() -> std::sync::MutexGuard<'static, Arena<Arc<HostFn>>> {
    CALLBACKS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Number of host closures whose functions have not been finalized yet.
pub fn live_callbacks() -> usize {
    callbacks().len()
}

struct CallbackEnv {
    rt: Runtime,
    store: NonNull<wasm_store_t>,
    index: Index,
    result_kinds: Vec<ValKind>,
}

// === Params & Results === //

/// Arguments passed to a host function.
#[derive(Debug)]
pub struct Params<'a> {
    vals: ValVec<'a>,
}

impl Params<'_> {
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn get(&self, index: usize) -> Result<Val> {
        self.vals.get(index)
    }

    pub fn i32(&self, index: usize) -> Result<i32> {
        let val = self.get(index)?;
        val.i32().ok_or(Error::TypeMismatch {
            expected: ValKind::I32,
            actual: val.kind(),
        })
    }

    pub fn i64(&self, index: usize) -> Result<i64> {
        let val = self.get(index)?;
        val.i64().ok_or(Error::TypeMismatch {
            expected: ValKind::I64,
            actual: val.kind(),
        })
    }

    pub fn to_vals(&self) -> Result<Vec<Val>> {
        self.vals.to_vals()
    }
}

/// Result slots of a host function. Every slot must be set before the callback returns.
#[derive(Debug)]
pub struct Results<'a> {
    vals: ValVec<'a>,
    kinds: &'a [ValKind],
    filled: Vec<bool>,
}

impl<'a> Results<'a> {
    fn new(vals: ValVec<'a>, kinds: &'a [ValKind]) -> Self {
        Self {
            filled: vec![false; kinds.len()],
            vals,
            kinds,
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn set(&mut self, index: usize, value: impl Into<Val>) -> Result<()> {
        let Some(&kind) = self.kinds.get(index) else {
            return Err(Error::ArityMismatch {
                expected: self.kinds.len(),
                actual: index.saturating_add(1),
            });
        };

        self.vals.write(index, Val::of(kind, value)?);
        self.filled[index] = true;

        Ok(())
    }

    fn finish(&self) -> anyhow::Result<()> {
        if let Some(index) = self.filled.iter().position(|&filled| !filled) {
            anyhow::bail!("host function left result {index} of {} unset", self.kinds.len());
        }

        Ok(())
    }
}

// === Trampoline === //

unsafe extern "C" fn trampoline(
    env: *mut c_void,
    args: *const wasm_val_vec_t,
    results: *mut wasm_val_vec_t,
) -> *mut wasm_trap_t {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        dispatch(&*env.cast::<CallbackEnv>(), args, results)
    }));

    match outcome {
        Ok(trap) => trap,
        Err(_) => {
            // Unwinding into the engine is undefined behavior.
            tracing::error!("host function panicked, aborting");
            process::abort();
        }
    }
}

unsafe fn dispatch(
    env: &CallbackEnv,
    args: *const wasm_val_vec_t,
    results: *mut wasm_val_vec_t,
) -> *mut wasm_trap_t {
    // The lock must not be held while the closure runs, since it may create functions itself.
    let callback = callbacks().get(env.index).cloned();

    let outcome = match callback {
        Some(callback) => unsafe { run(env, &*callback, args, results) },
        None => Err(anyhow::anyhow!("host function called after it was finalized")),
    };

    match outcome {
        Ok(()) => ptr::null_mut(),
        Err(err) => {
            let message = format!("{err:#}");
            tracing::debug!(%message, "host function failed");

            let trap = unsafe { trap::new_raw(env.rt, env.store.as_ptr(), &message) };
            if trap.is_null() {
                tracing::error!("could not allocate a trap for a failed host function");
            }

            trap
        }
    }
}

unsafe fn run(
    env: &CallbackEnv,
    callback: &HostFn,
    args: *const wasm_val_vec_t,
    results: *mut wasm_val_vec_t,
) -> anyhow::Result<()> {
    let (Some(args), Some(results)) = (NonNull::new(args.cast_mut()), NonNull::new(results)) else {
        anyhow::bail!("host function received a null vector");
    };

    let scope = Scope::open();
    let params = Params {
        vals: unsafe { ValVec::borrowed(env.rt, args) },
    };
    let mut results = Results::new(unsafe { ValVec::borrowed(env.rt, results) }, &env.result_kinds);

    if results.vals.len() < results.len() {
        anyhow::bail!(
            "results vector holds {} slots, expected {}",
            results.vals.len(),
            results.len()
        );
    }

    callback(&scope, &params, &mut results)?;
    results.finish()
}

unsafe extern "C" fn finalize(env: *mut c_void) {
    let env = unsafe { Box::from_raw(env.cast::<CallbackEnv>()) };
    let callback = callbacks().remove(env.index);

    tracing::trace!(released = callback.is_some(), "finalized host function");

    // Dropped after the lock is released.
    drop(callback);
}

// === Constructors === //

impl<'s> Func<'s> {
    /// Creates a host function of type `ty` backed by `callback`.
    ///
    /// An `Err` returned by the callback becomes a trap whose message is the error's display
    /// form, causes included. A panic aborts the process.
    pub fn new<'env, F>(
        scope: &'s Scope<'env>,
        store: &'env Store<'_>,
        ty: &FuncType<'_>,
        callback: F,
    ) -> Result<Owned<'s, Self>>
    where
        F: Fn(&Scope<'_>, &Params<'_>, &mut Results<'_>) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        let rt = store.runtime();
        let result_kinds = ty.result_kinds()?;

        let index = callbacks().insert(Arc::new(callback));
        let env = Box::into_raw(Box::new(CallbackEnv {
            rt,
            store: store.as_non_null(),
            index,
            result_kinds,
        }));

        let raw = unsafe {
            (rt.api().wasm_func_new_with_env)(
                store.as_ptr(),
                ty.as_ptr(),
                Some(trampoline),
                env.cast(),
                Some(finalize),
            )
        };

        let Some(raw) = NonNull::new(raw) else {
            // The environment was not adopted.
            drop(unsafe { Box::from_raw(env) });
            let callback = callbacks().remove(index);
            drop(callback);

            return Err(Error::allocation("wasm_func_new_with_env"));
        };

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(Handle::new(rt, raw))) })
    }

    /// Creates a host function from a raw C callback.
    ///
    /// # Safety
    ///
    /// `callback` must honor the C API's calling contract for functions of type `ty`.
    pub unsafe fn new_raw<'env>(
        scope: &'s Scope<'env>,
        store: &'env Store<'_>,
        ty: &FuncType<'_>,
        callback: unsafe extern "C" fn(*const wasm_val_vec_t, *mut wasm_val_vec_t) -> *mut wasm_trap_t,
    ) -> Result<Owned<'s, Self>> {
        let rt = store.runtime();

        let raw = unsafe { (rt.api().wasm_func_new)(store.as_ptr(), ty.as_ptr(), Some(callback)) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_func_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}
