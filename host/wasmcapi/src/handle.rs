use std::{fmt, marker::PhantomData, ops::Deref, ptr::NonNull};

use derive_where::derive_where;
use wasmcapi_sys::WasmApi;

use crate::{Error, ReleaseKey, Result, Runtime, Scope, scope::Release};

// === Handle === //

/// A non-owning reference to a foreign object of raw type `R`, valid for `'a`.
#[derive_where(Debug)]
pub struct Handle<'a, R> {
    rt: Runtime,
    raw: NonNull<R>,
    _ty: PhantomData<&'a R>,
}

impl<'a, R> Handle<'a, R> {
    /// # Safety
    ///
    /// `raw` must point to a live object created by `rt` that stays live for `'a`.
    pub unsafe fn new(rt: Runtime, raw: NonNull<R>) -> Self {
        Self {
            rt,
            raw,
            _ty: PhantomData,
        }
    }

    /// Like [`Handle::new`] but maps a null result of a foreign constructor to an allocation
    /// error.
    pub(crate) unsafe fn from_ctor(rt: Runtime, raw: *mut R, what: &'static str) -> Result<Self> {
        match NonNull::new(raw) {
            Some(raw) => Ok(unsafe { Self::new(rt, raw) }),
            None => Err(Error::allocation(what)),
        }
    }

    /// Wraps a pointer the foreign contract guarantees to be non-null.
    pub(crate) unsafe fn from_nonnull_contract(rt: Runtime, raw: *const R, what: &'static str) -> Self {
        let Some(raw) = NonNull::new(raw.cast_mut()) else {
            panic!("`{what}` returned null in violation of its contract");
        };

        unsafe { Self::new(rt, raw) }
    }

    pub fn runtime(&self) -> Runtime {
        self.rt
    }

    pub fn api(&self) -> &'static WasmApi {
        self.rt.api()
    }

    pub fn as_ptr(&self) -> *mut R {
        self.raw.as_ptr()
    }

    pub fn as_non_null(&self) -> NonNull<R> {
        self.raw
    }

    pub(crate) fn reborrow(&self) -> Handle<'_, R> {
        unsafe { Handle::new(self.rt, self.raw) }
    }
}

// === ForeignObject === //

/// A view type whose underlying foreign object can be freed through a single C function.
///
/// # Safety
///
/// `delete` must be the destructor matching `Raw` in the C API.
pub unsafe trait ForeignObject {
    type Raw: 'static;

    const NAME: &'static str;

    fn handle(&self) -> &Handle<'_, Self::Raw>;

    unsafe fn delete(api: &WasmApi, raw: NonNull<Self::Raw>);
}

// === Owned === //

/// A view paired with the obligation to free its foreign object exactly once.
///
/// The destructor runs when [`Owned::close`] is called or, failing that, when the scope the
/// value was registered in closes. `close` consumes the wrapper so a second close cannot be
/// expressed, and the scope skips actions that already ran.
pub struct Owned<'s, T: ForeignObject> {
    value: T,
    scope: &'s dyn Release,
    key: ReleaseKey,
}

impl<T: ForeignObject + fmt::Debug> fmt::Debug for Owned<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("value", &self.value)
            .field("key", &self.key)
            .finish()
    }
}

impl<'s, T: ForeignObject> Owned<'s, T> {
    /// Takes ownership of `value`'s foreign object on behalf of `scope`.
    ///
    /// # Safety
    ///
    /// The caller must own the foreign object, and `value` must not borrow from anything that
    /// dies before `scope` closes.
    pub(crate) unsafe fn adopt(scope: &'s Scope<'_>, value: T) -> Self {
        let handle = value.handle();
        let key = register_delete(scope, T::NAME, handle.api(), handle.as_non_null(), T::delete);

        Self { value, scope, key }
    }

    /// Frees the foreign object now.
    pub fn close(self) {
        self.scope.release(self.key);
    }

    pub fn key(&self) -> ReleaseKey {
        self.key
    }
}

fn register_delete<R: 'static>(
    scope: &Scope<'_>,
    what: &'static str,
    api: &'static WasmApi,
    raw: NonNull<R>,
    delete: unsafe fn(&WasmApi, NonNull<R>),
) -> ReleaseKey {
    tracing::trace!(scope = scope.id(), what, ptr = ?raw, "adopted foreign object");

    scope.register_named(what, move || {
        tracing::trace!(what, ptr = ?raw, "deleting foreign object");
        unsafe { delete(api, raw) };
    })
}

impl<T: ForeignObject> Deref for Owned<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

// === View Macros === //

/// Declares a borrowed view over a foreign object.
macro_rules! foreign_view {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($raw:ty);) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $name<'a> {
            handle: $crate::Handle<'a, $raw>,
        }

        impl<'a> $name<'a> {
            #[allow(dead_code)]
            pub(crate) unsafe fn from_handle(handle: $crate::Handle<'a, $raw>) -> Self {
                Self { handle }
            }

            pub fn as_handle(&self) -> &$crate::Handle<'a, $raw> {
                &self.handle
            }

            pub fn as_ptr(&self) -> *mut $raw {
                self.handle.as_ptr()
            }

            pub fn runtime(&self) -> $crate::Runtime {
                self.handle.runtime()
            }
        }
    };
}

pub(crate) use foreign_view;

/// Marks a view declared with `foreign_view!` as freeable through `$delete`.
macro_rules! foreign_object {
    ($name:ident($raw:ty) => $delete:ident) => {
        unsafe impl $crate::ForeignObject for $name<'_> {
            type Raw = $raw;

            const NAME: &'static str = stringify!($raw);

            fn handle(&self) -> &$crate::Handle<'_, $raw> {
                &self.handle
            }

            unsafe fn delete(api: &wasmcapi_sys::WasmApi, raw: std::ptr::NonNull<$raw>) {
                unsafe { (api.$delete)(raw.as_ptr()) }
            }
        }
    };
}

pub(crate) use foreign_object;
