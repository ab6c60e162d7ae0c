use std::{fmt, marker::PhantomData, ptr::NonNull};

use bytemuck::Zeroable;
use wasmcapi_sys::{WASM_LIMITS_MAX_DEFAULT, wasm_limits_t};

use crate::Scope;

// === Records === //

/// A read-only view of a fixed-layout record owned by the foreign side or by another wrapper.
pub struct Record<'a, T: Copy + 'static> {
    raw: NonNull<T>,
    _ty: PhantomData<&'a T>,
}

impl<T: Copy + fmt::Debug + 'static> fmt::Debug for Record<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Record").field(&self.get()).finish()
    }
}

impl<'a, T: Copy + 'static> Record<'a, T> {
    /// # Safety
    ///
    /// `raw` must point to an initialized `T` that stays valid and unmodified for `'a`.
    pub(crate) unsafe fn borrowed(raw: NonNull<T>) -> Self {
        Self {
            raw,
            _ty: PhantomData,
        }
    }

    pub fn get(&self) -> T {
        unsafe { self.raw.read() }
    }

    pub fn as_ptr(&self) -> *const T {
        self.raw.as_ptr()
    }
}

/// A fixed-layout record allocated in a [`Scope`] and writable from the host.
pub struct HostRecord<'s, T: Copy + 'static> {
    raw: NonNull<T>,
    _ty: PhantomData<&'s T>,
}

impl<T: Copy + fmt::Debug + 'static> fmt::Debug for HostRecord<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostRecord").field(&self.get()).finish()
    }
}

impl<'s, T: Copy + 'static> HostRecord<'s, T> {
    pub fn new(scope: &'s Scope<'_>, value: T) -> Self {
        Self {
            raw: scope.alloc(value),
            _ty: PhantomData,
        }
    }

    pub fn zeroed(scope: &'s Scope<'_>) -> Self
    where
        T: Zeroable,
    {
        Self::new(scope, T::zeroed())
    }

    pub fn get(&self) -> T {
        unsafe { self.raw.read() }
    }

    pub fn set(&mut self, value: T) {
        unsafe { self.raw.write(value) }
    }

    pub fn as_record(&self) -> Record<'_, T> {
        unsafe { Record::borrowed(self.raw) }
    }

    pub fn as_ptr(&self) -> *const T {
        self.raw.as_ptr()
    }

    /// Pointer for foreign calls that fill the record as an out-parameter.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.raw.as_ptr()
    }
}

// === Limits === //

/// Size bounds of a table or memory. A `max` of `None` means unbounded.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub const fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }
}

impl From<wasm_limits_t> for Limits {
    fn from(raw: wasm_limits_t) -> Self {
        Self {
            min: raw.min,
            max: (raw.max != WASM_LIMITS_MAX_DEFAULT).then_some(raw.max),
        }
    }
}

impl From<Limits> for wasm_limits_t {
    fn from(limits: Limits) -> Self {
        Self {
            min: limits.min,
            max: limits.max.unwrap_or(WASM_LIMITS_MAX_DEFAULT),
        }
    }
}

impl Record<'_, wasm_limits_t> {
    pub fn limits(&self) -> Limits {
        self.get().into()
    }
}
