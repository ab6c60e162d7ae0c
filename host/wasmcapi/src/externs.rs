use std::ptr::NonNull;

use bytemuck::Zeroable;
use wasmcapi_sys::*;

use crate::{
    Error, ExternKind, ExternTypeRef, ForeignObject, FuncType, GlobalType, Handle, MemoryType,
    Mutability, Owned, Result, Scope, Store, TableType, TrapInfo, Val, ValKind, ValVec,
    handle::{foreign_object, foreign_view},
    val,
};

// === AsExtern === //

/// Objects that can be passed where the C API expects a `wasm_extern_t`.
pub trait AsExtern {
    fn as_extern_ptr(&self) -> *mut wasm_extern_t;
}

impl<T: AsExtern + ForeignObject> AsExtern for Owned<'_, T> {
    fn as_extern_ptr(&self) -> *mut wasm_extern_t {
        (**self).as_extern_ptr()
    }
}

macro_rules! impl_as_extern {
    ($($name:ident => $cast:ident),* $(,)?) => {$(
        impl AsExtern for $name<'_> {
            fn as_extern_ptr(&self) -> *mut wasm_extern_t {
                unsafe { (self.handle.api().$cast)(self.as_ptr()) }
            }
        }

        impl $name<'_> {
            pub fn as_extern(&self) -> ExternRef<'_> {
                unsafe {
                    ExternRef::from_handle(Handle::from_nonnull_contract(
                        self.runtime(),
                        self.as_extern_ptr(),
                        stringify!($cast),
                    ))
                }
            }
        }
    )*};
}

// === ExternRef === //

foreign_view! {
    /// An extern whose kind has not been inspected yet.
    pub struct ExternRef(wasm_extern_t);
}

impl AsExtern for ExternRef<'_> {
    fn as_extern_ptr(&self) -> *mut wasm_extern_t {
        self.as_ptr()
    }
}

/// An extern resolved to its kind.
#[derive(Debug)]
pub enum Extern<'a> {
    Func(Func<'a>),
    Global(Global<'a>),
    Table(Table<'a>),
    Memory(Memory<'a>),
}

impl<'a> ExternRef<'a> {
    pub fn kind(&self) -> Result<ExternKind> {
        ExternKind::try_from(unsafe { (self.handle.api().wasm_extern_kind)(self.as_ptr()) })
    }

    pub fn ty<'s>(&self, scope: &'s Scope<'_>) -> Result<Owned<'s, ExternTypeRef<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_extern_type)(self.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(self.runtime(), raw, "wasm_extern_type") }?;

        Ok(unsafe { Owned::adopt(scope, ExternTypeRef::from_handle(handle)) })
    }

    /// Resolves the extern to the view selected by its kind tag.
    pub fn downcast(&self) -> Result<Extern<'a>> {
        let rt = self.runtime();
        let api = rt.api();
        let raw = self.as_ptr();

        unsafe {
            Ok(match self.kind()? {
                ExternKind::Func => Extern::Func(Func::from_handle(Handle::from_nonnull_contract(
                    rt,
                    (api.wasm_extern_as_func)(raw),
                    "wasm_extern_as_func",
                ))),
                ExternKind::Global => Extern::Global(Global::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_extern_as_global)(raw),
                        "wasm_extern_as_global",
                    ),
                )),
                ExternKind::Table => Extern::Table(Table::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_extern_as_table)(raw),
                        "wasm_extern_as_table",
                    ),
                )),
                ExternKind::Memory => Extern::Memory(Memory::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_extern_as_memory)(raw),
                        "wasm_extern_as_memory",
                    ),
                )),
            })
        }
    }

    pub fn into_func(self) -> Option<Func<'a>> {
        match self.downcast().ok()? {
            Extern::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn into_global(self) -> Option<Global<'a>> {
        match self.downcast().ok()? {
            Extern::Global(global) => Some(global),
            _ => None,
        }
    }
}

impl Extern<'_> {
    pub fn kind(&self) -> ExternKind {
        match self {
            Self::Func(_) => ExternKind::Func,
            Self::Global(_) => ExternKind::Global,
            Self::Table(_) => ExternKind::Table,
            Self::Memory(_) => ExternKind::Memory,
        }
    }
}

// === Func === //

foreign_view! {
    pub struct Func(wasm_func_t);
}

foreign_object!(Func(wasm_func_t) => wasm_func_delete);

impl Func<'_> {
    pub fn param_arity(&self) -> usize {
        unsafe { (self.handle.api().wasm_func_param_arity)(self.as_ptr()) }
    }

    pub fn result_arity(&self) -> usize {
        unsafe { (self.handle.api().wasm_func_result_arity)(self.as_ptr()) }
    }

    pub fn ty<'s>(&self, scope: &'s Scope<'_>) -> Result<Owned<'s, FuncType<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_func_type)(self.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(self.runtime(), raw, "wasm_func_type") }?;

        Ok(unsafe { Owned::adopt(scope, FuncType::from_handle(handle)) })
    }

    /// Calls the function with `args`, checking them against its type first.
    ///
    /// A guest trap is returned as [`Error::Trap`].
    pub fn call(&self, args: &[Val]) -> Result<Vec<Val>> {
        let rt = self.runtime();
        let scope = Scope::open();
        let ty = self.ty(&scope)?;

        let param_kinds = ty.param_kinds()?;
        if param_kinds.len() != args.len() {
            return Err(Error::ArityMismatch {
                expected: param_kinds.len(),
                actual: args.len(),
            });
        }

        for (arg, &kind) in args.iter().zip(&param_kinds) {
            Val::of(kind, *arg)?;
        }

        let args = ValVec::from_host(&scope, rt, args);
        let results = ValVec::for_results(&scope, rt, &ty.result_kinds()?);

        unsafe { self.call_vec(&args, &results) }?;

        let results = results.to_vals()?;
        Ok(results)
    }

    /// Calls the function with pre-built vectors and no type checking.
    ///
    /// # Safety
    ///
    /// `args` must match the parameter types, and `results` must be a writable vector with at
    /// least `result_arity` elements.
    pub unsafe fn call_vec(&self, args: &ValVec<'_>, results: &ValVec<'_>) -> Result<()> {
        let trap = unsafe {
            (self.handle.api().wasm_func_call)(self.as_ptr(), args.as_ptr(), results.as_ptr())
        };

        match NonNull::new(trap) {
            None => Ok(()),
            Some(trap) => Err(Error::Trap(unsafe { TrapInfo::take(self.runtime(), trap) })),
        }
    }
}

// === Global === //

foreign_view! {
    pub struct Global(wasm_global_t);
}

foreign_object!(Global(wasm_global_t) => wasm_global_delete);

impl<'s> Global<'s> {
    pub fn new<'env>(
        scope: &'s Scope<'env>,
        store: &'env Store<'_>,
        ty: &GlobalType<'_>,
        init: Val,
    ) -> Result<Owned<'s, Self>> {
        let rt = store.runtime();
        let init = Val::of(ty.content().kind()?, init)?;
        let init = val::encode(init);

        let raw = unsafe { (rt.api().wasm_global_new)(store.as_ptr(), ty.as_ptr(), &init) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_global_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

impl Global<'_> {
    pub fn ty<'s>(&self, scope: &'s Scope<'_>) -> Result<Owned<'s, GlobalType<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_global_type)(self.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(self.runtime(), raw, "wasm_global_type") }?;

        Ok(unsafe { Owned::adopt(scope, GlobalType::from_handle(handle)) })
    }

    pub fn get(&self) -> Result<Val> {
        let mut out = wasm_val_t::zeroed();
        unsafe { (self.handle.api().wasm_global_get)(self.as_ptr(), &mut out) };
        val::decode(&out)
    }

    /// Writes a mutable global. The value's kind must match the global's content type.
    pub fn set(&self, value: Val) -> Result<()> {
        let scope = Scope::open();
        let ty = self.ty(&scope)?;

        if ty.mutability() == Mutability::Const {
            return Err(Error::ImmutableGlobal);
        }

        let value = val::encode(Val::of(ty.content().kind()?, value)?);
        unsafe { (self.handle.api().wasm_global_set)(self.as_ptr(), &value) };

        Ok(())
    }

    pub fn content_kind(&self) -> Result<ValKind> {
        let scope = Scope::open();
        self.ty(&scope)?.content().kind()
    }
}

// === Table === //

foreign_view! {
    pub struct Table(wasm_table_t);
}

impl Table<'_> {
    pub fn size(&self) -> u32 {
        unsafe { (self.handle.api().wasm_table_size)(self.as_ptr()) }
    }

    pub fn ty<'s>(&self, scope: &'s Scope<'_>) -> Result<Owned<'s, TableType<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_table_type)(self.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(self.runtime(), raw, "wasm_table_type") }?;

        Ok(unsafe { Owned::adopt(scope, TableType::from_handle(handle)) })
    }
}

// === Memory === //

foreign_view! {
    pub struct Memory(wasm_memory_t);
}

impl Memory<'_> {
    /// Current size in pages.
    pub fn size(&self) -> u32 {
        unsafe { (self.handle.api().wasm_memory_size)(self.as_ptr()) }
    }

    /// Current size in bytes.
    pub fn data_size(&self) -> usize {
        unsafe { (self.handle.api().wasm_memory_data_size)(self.as_ptr()) }
    }

    pub fn ty<'s>(&self, scope: &'s Scope<'_>) -> Result<Owned<'s, MemoryType<'s>>> {
        let raw = unsafe { (self.handle.api().wasm_memory_type)(self.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(self.runtime(), raw, "wasm_memory_type") }?;

        Ok(unsafe { Owned::adopt(scope, MemoryType::from_handle(handle)) })
    }
}

impl_as_extern! {
    Func => wasm_func_as_extern,
    Global => wasm_global_as_extern,
    Table => wasm_table_as_extern,
    Memory => wasm_memory_as_extern,
}
