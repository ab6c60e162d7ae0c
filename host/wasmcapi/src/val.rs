use std::ptr::{self, NonNull};

use wasmcapi_sys::*;

use crate::{Error, HostRecord, Result, Scope};

// === ValKind === //

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum ValKind {
    I32 = WASM_I32,
    I64 = WASM_I64,
    F32 = WASM_F32,
    F64 = WASM_F64,
    AnyRef = WASM_ANYREF,
    FuncRef = WASM_FUNCREF,
}

impl ValKind {
    pub fn as_raw(self) -> wasm_valkind_t {
        self as wasm_valkind_t
    }

    pub fn is_num(self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::F32 | Self::F64)
    }

    pub fn is_ref(self) -> bool {
        !self.is_num()
    }
}

impl TryFrom<wasm_valkind_t> for ValKind {
    type Error = Error;

    fn try_from(raw: wasm_valkind_t) -> Result<Self> {
        Ok(match raw {
            WASM_I32 => Self::I32,
            WASM_I64 => Self::I64,
            WASM_F32 => Self::F32,
            WASM_F64 => Self::F64,
            WASM_ANYREF => Self::AnyRef,
            WASM_FUNCREF => Self::FuncRef,
            other => return Err(Error::UnrecognizedValKind(other)),
        })
    }
}

// === Val === //

/// A host-side copy of a `wasm_val_t`.
///
/// References are carried as raw foreign pointers; this binding never dereferences them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Val {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    AnyRef(Option<NonNull<wasm_ref_t>>),
    FuncRef(Option<NonNull<wasm_ref_t>>),
}

impl Val {
    /// Checks `payload` against `kind`.
    pub fn of(kind: ValKind, payload: impl Into<Val>) -> Result<Self> {
        let val = payload.into();

        if val.kind() != kind {
            return Err(Error::TypeMismatch {
                expected: kind,
                actual: val.kind(),
            });
        }

        Ok(val)
    }

    pub fn kind(&self) -> ValKind {
        match self {
            Self::I32(_) => ValKind::I32,
            Self::I64(_) => ValKind::I64,
            Self::F32(_) => ValKind::F32,
            Self::F64(_) => ValKind::F64,
            Self::AnyRef(_) => ValKind::AnyRef,
            Self::FuncRef(_) => ValKind::FuncRef,
        }
    }

    /// The zero value of `kind`, used for result slots.
    pub fn default_for(kind: ValKind) -> Self {
        match kind {
            ValKind::I32 => Self::I32(0),
            ValKind::I64 => Self::I64(0),
            ValKind::F32 => Self::F32(0.),
            ValKind::F64 => Self::F64(0.),
            ValKind::AnyRef => Self::AnyRef(None),
            ValKind::FuncRef => Self::FuncRef(None),
        }
    }

    pub fn i32(&self) -> Option<i32> {
        match *self {
            Self::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn i64(&self) -> Option<i64> {
        match *self {
            Self::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f32(&self) -> Option<f32> {
        match *self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64(&self) -> Option<f64> {
        match *self {
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Whether both values have the same kind and the same payload bits. Unlike `==`, this
    /// treats identical NaNs as equal.
    pub fn bit_eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

impl From<i32> for Val {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<i64> for Val {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<f32> for Val {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<f64> for Val {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

// === Encoding === //

// These two functions are the only places that touch `wasm_val_t::of`.

pub(crate) fn encode(val: Val) -> wasm_val_t {
    let mut of = wasm_val_union { i64: 0 };

    match val {
        Val::I32(v) => of.i32 = v,
        Val::I64(v) => of.i64 = v,
        Val::F32(v) => of.f32 = v,
        Val::F64(v) => of.f64 = v,
        Val::AnyRef(r) | Val::FuncRef(r) => {
            of.ref_ = r.map_or(ptr::null_mut(), NonNull::as_ptr);
        }
    }

    wasm_val_t {
        kind: val.kind().as_raw(),
        of,
    }
}

pub(crate) fn decode(raw: &wasm_val_t) -> Result<Val> {
    let kind = ValKind::try_from(raw.kind)?;

    // SAFETY: the field read is selected by the tag, which a well-formed value keeps in sync
    // with the active field.
    Ok(unsafe {
        match kind {
            ValKind::I32 => Val::I32(raw.of.i32),
            ValKind::I64 => Val::I64(raw.of.i64),
            ValKind::F32 => Val::F32(raw.of.f32),
            ValKind::F64 => Val::F64(raw.of.f64),
            ValKind::AnyRef => Val::AnyRef(NonNull::new(raw.of.ref_)),
            ValKind::FuncRef => Val::FuncRef(NonNull::new(raw.of.ref_)),
        }
    })
}

// === ValSlot === //

/// A single `wasm_val_t` in scope-owned memory, for foreign calls that take or fill one.
#[derive(Debug)]
pub struct ValSlot<'s> {
    record: HostRecord<'s, wasm_val_t>,
}

impl<'s> ValSlot<'s> {
    /// Writes `payload` tagged as `kind`, failing if the payload's type does not match.
    pub fn of(scope: &'s Scope<'_>, kind: ValKind, payload: impl Into<Val>) -> Result<Self> {
        let val = Val::of(kind, payload)?;

        Ok(Self {
            record: HostRecord::new(scope, encode(val)),
        })
    }

    /// A zeroed `i32` slot for foreign calls to fill.
    pub fn uninit(scope: &'s Scope<'_>) -> Self {
        Self {
            record: HostRecord::new(scope, encode(Val::I32(0))),
        }
    }

    pub fn get(&self) -> Result<Val> {
        decode(&self.record.get())
    }

    pub fn set(&mut self, val: Val) {
        self.record.set(encode(val));
    }

    pub fn kind(&self) -> Result<ValKind> {
        ValKind::try_from(self.record.get().kind)
    }

    pub fn as_ptr(&self) -> *const wasm_val_t {
        self.record.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut wasm_val_t {
        self.record.as_mut_ptr()
    }
}
