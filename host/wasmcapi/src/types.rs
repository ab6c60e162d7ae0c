use std::ptr::NonNull;

use wasmcapi_sys::*;

use crate::{
    ByteVec, Error, Handle, Limits, Owned, Record, Result, Runtime, Scope, ValKind, ValTypeVec,
    handle::{foreign_object, foreign_view},
    record::HostRecord,
};

// === ValType === //

foreign_view! {
    pub struct ValType(wasm_valtype_t);
}

impl ValType<'_> {
    pub fn kind(&self) -> Result<ValKind> {
        ValKind::try_from(unsafe { (self.handle.api().wasm_valtype_kind)(self.as_ptr()) })
    }
}

fn kinds_of(vec: &ValTypeVec<'_>) -> Result<Vec<ValKind>> {
    vec.iter().map(|ty| ty.kind()).collect()
}

// === FuncType === //

foreign_view! {
    pub struct FuncType(wasm_functype_t);
}

foreign_object!(FuncType(wasm_functype_t) => wasm_functype_delete);

impl<'s> FuncType<'s> {
    pub fn new(
        scope: &'s Scope<'_>,
        rt: Runtime,
        params: &[ValKind],
        results: &[ValKind],
    ) -> Result<Owned<'s, Self>> {
        let api = rt.api();

        let params = ValTypeVec::foreign_from_kinds(scope, rt, params)?;
        let results = ValTypeVec::foreign_from_kinds(scope, rt, results)?;

        // Consumes the contents of both vectors, leaving their records empty.
        let raw = unsafe { (api.wasm_functype_new)(params.as_ptr(), results.as_ptr()) };

        params.close();
        results.close();

        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_functype_new") }?;
        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

impl FuncType<'_> {
    pub fn params(&self) -> ValTypeVec<'_> {
        let raw = unsafe { (self.handle.api().wasm_functype_params)(self.as_ptr()) };
        unsafe { ValTypeVec::borrowed(self.runtime(), non_null(raw, "wasm_functype_params")) }
    }

    pub fn results(&self) -> ValTypeVec<'_> {
        let raw = unsafe { (self.handle.api().wasm_functype_results)(self.as_ptr()) };
        unsafe { ValTypeVec::borrowed(self.runtime(), non_null(raw, "wasm_functype_results")) }
    }

    pub fn param_kinds(&self) -> Result<Vec<ValKind>> {
        kinds_of(&self.params())
    }

    pub fn result_kinds(&self) -> Result<Vec<ValKind>> {
        kinds_of(&self.results())
    }

    pub fn as_extern_type(&self) -> ExternTypeRef<'_> {
        let raw = unsafe { (self.handle.api().wasm_functype_as_externtype)(self.as_ptr()) };
        unsafe {
            ExternTypeRef::from_handle(Handle::from_nonnull_contract(
                self.runtime(),
                raw,
                "wasm_functype_as_externtype",
            ))
        }
    }
}

fn non_null<T>(raw: *const T, what: &'static str) -> NonNull<T> {
    NonNull::new(raw.cast_mut())
        .unwrap_or_else(|| panic!("`{what}` returned null in violation of its contract"))
}

// === GlobalType === //

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum Mutability {
    Const,
    Var,
}

impl Mutability {
    fn as_raw(self) -> wasm_mutability_t {
        match self {
            Self::Const => WASM_CONST,
            Self::Var => WASM_VAR,
        }
    }
}

foreign_view! {
    pub struct GlobalType(wasm_globaltype_t);
}

foreign_object!(GlobalType(wasm_globaltype_t) => wasm_globaltype_delete);

impl<'s> GlobalType<'s> {
    pub fn new(
        scope: &'s Scope<'_>,
        rt: Runtime,
        content: ValKind,
        mutability: Mutability,
    ) -> Result<Owned<'s, Self>> {
        let api = rt.api();

        let content = unsafe { (api.wasm_valtype_new)(content.as_raw()) };
        if content.is_null() {
            return Err(Error::allocation("wasm_valtype_new"));
        }

        // Takes ownership of `content` whether or not it succeeds.
        let raw = unsafe { (api.wasm_globaltype_new)(content, mutability.as_raw()) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_globaltype_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

impl GlobalType<'_> {
    pub fn content(&self) -> ValType<'_> {
        let raw = unsafe { (self.handle.api().wasm_globaltype_content)(self.as_ptr()) };
        unsafe {
            ValType::from_handle(Handle::from_nonnull_contract(
                self.runtime(),
                raw,
                "wasm_globaltype_content",
            ))
        }
    }

    pub fn mutability(&self) -> Mutability {
        match unsafe { (self.handle.api().wasm_globaltype_mutability)(self.as_ptr()) } {
            WASM_CONST => Mutability::Const,
            _ => Mutability::Var,
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.mutability() == Mutability::Var
    }
}

// === TableType === //

foreign_view! {
    pub struct TableType(wasm_tabletype_t);
}

foreign_object!(TableType(wasm_tabletype_t) => wasm_tabletype_delete);

impl<'s> TableType<'s> {
    pub fn new(
        scope: &'s Scope<'_>,
        rt: Runtime,
        element: ValKind,
        limits: Limits,
    ) -> Result<Owned<'s, Self>> {
        let api = rt.api();

        let element = unsafe { (api.wasm_valtype_new)(element.as_raw()) };
        if element.is_null() {
            return Err(Error::allocation("wasm_valtype_new"));
        }

        let limits = HostRecord::new(scope, wasm_limits_t::from(limits));
        let raw = unsafe { (api.wasm_tabletype_new)(element, limits.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_tabletype_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

impl TableType<'_> {
    pub fn element(&self) -> ValType<'_> {
        let raw = unsafe { (self.handle.api().wasm_tabletype_element)(self.as_ptr()) };
        unsafe {
            ValType::from_handle(Handle::from_nonnull_contract(
                self.runtime(),
                raw,
                "wasm_tabletype_element",
            ))
        }
    }

    pub fn limits_record(&self) -> Record<'_, wasm_limits_t> {
        let raw = unsafe { (self.handle.api().wasm_tabletype_limits)(self.as_ptr()) };
        unsafe { Record::borrowed(non_null(raw, "wasm_tabletype_limits")) }
    }

    pub fn limits(&self) -> Limits {
        self.limits_record().limits()
    }
}

// === MemoryType === //

foreign_view! {
    pub struct MemoryType(wasm_memorytype_t);
}

foreign_object!(MemoryType(wasm_memorytype_t) => wasm_memorytype_delete);

impl<'s> MemoryType<'s> {
    pub fn new(scope: &'s Scope<'_>, rt: Runtime, limits: Limits) -> Result<Owned<'s, Self>> {
        let limits = HostRecord::new(scope, wasm_limits_t::from(limits));
        let raw = unsafe { (rt.api().wasm_memorytype_new)(limits.as_ptr()) };
        let handle = unsafe { Handle::from_ctor(rt, raw, "wasm_memorytype_new") }?;

        Ok(unsafe { Owned::adopt(scope, Self::from_handle(handle)) })
    }
}

impl MemoryType<'_> {
    pub fn limits_record(&self) -> Record<'_, wasm_limits_t> {
        let raw = unsafe { (self.handle.api().wasm_memorytype_limits)(self.as_ptr()) };
        unsafe { Record::borrowed(non_null(raw, "wasm_memorytype_limits")) }
    }

    pub fn limits(&self) -> Limits {
        self.limits_record().limits()
    }
}

// === ExternKind === //

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[repr(u8)]
pub enum ExternKind {
    Func = WASM_EXTERN_FUNC,
    Global = WASM_EXTERN_GLOBAL,
    Table = WASM_EXTERN_TABLE,
    Memory = WASM_EXTERN_MEMORY,
}

impl TryFrom<wasm_externkind_t> for ExternKind {
    type Error = Error;

    fn try_from(raw: wasm_externkind_t) -> Result<Self> {
        Ok(match raw {
            WASM_EXTERN_FUNC => Self::Func,
            WASM_EXTERN_GLOBAL => Self::Global,
            WASM_EXTERN_TABLE => Self::Table,
            WASM_EXTERN_MEMORY => Self::Memory,
            other => return Err(Error::UnrecognizedKind(other)),
        })
    }
}

// === ExternType === //

foreign_view! {
    /// An extern type whose kind has not been inspected yet.
    pub struct ExternTypeRef(wasm_externtype_t);
}

foreign_object!(ExternTypeRef(wasm_externtype_t) => wasm_externtype_delete);

/// An extern type resolved to its kind. Borrows from the [`ExternTypeRef`] it came from.
#[derive(Debug)]
pub enum ExternType<'a> {
    Func(FuncType<'a>),
    Global(GlobalType<'a>),
    Table(TableType<'a>),
    Memory(MemoryType<'a>),
}

impl ExternTypeRef<'_> {
    pub fn kind(&self) -> Result<ExternKind> {
        ExternKind::try_from(self.raw_kind())
    }

    pub fn raw_kind(&self) -> wasm_externkind_t {
        unsafe { (self.handle.api().wasm_externtype_kind)(self.as_ptr()) }
    }

    pub fn downcast(&self) -> Result<ExternType<'_>> {
        ExternType::downcast(self.handle.reborrow(), self.raw_kind())
    }
}

impl<'a> ExternType<'a> {
    /// Resolves `ty` to the concrete type selected by `tag`, which must be the tag `ty`
    /// reports. [`ExternTypeRef::downcast`] reads it.
    ///
    /// This is the only place that calls the `wasm_externtype_as_*` accessors.
    pub(crate) fn downcast(ty: Handle<'a, wasm_externtype_t>, tag: wasm_externkind_t) -> Result<Self> {
        let rt = ty.runtime();
        let api = rt.api();
        let raw = ty.as_ptr();

        unsafe {
            Ok(match ExternKind::try_from(tag)? {
                ExternKind::Func => Self::Func(FuncType::from_handle(Handle::from_nonnull_contract(
                    rt,
                    (api.wasm_externtype_as_functype)(raw),
                    "wasm_externtype_as_functype",
                ))),
                ExternKind::Global => Self::Global(GlobalType::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_externtype_as_globaltype)(raw),
                        "wasm_externtype_as_globaltype",
                    ),
                )),
                ExternKind::Table => Self::Table(TableType::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_externtype_as_tabletype)(raw),
                        "wasm_externtype_as_tabletype",
                    ),
                )),
                ExternKind::Memory => Self::Memory(MemoryType::from_handle(
                    Handle::from_nonnull_contract(
                        rt,
                        (api.wasm_externtype_as_memorytype)(raw),
                        "wasm_externtype_as_memorytype",
                    ),
                )),
            })
        }
    }

    pub fn kind(&self) -> ExternKind {
        match self {
            Self::Func(_) => ExternKind::Func,
            Self::Global(_) => ExternKind::Global,
            Self::Table(_) => ExternKind::Table,
            Self::Memory(_) => ExternKind::Memory,
        }
    }

    pub fn func(&self) -> Option<&FuncType<'a>> {
        match self {
            Self::Func(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn global(&self) -> Option<&GlobalType<'a>> {
        match self {
            Self::Global(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableType<'a>> {
        match self {
            Self::Table(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn memory(&self) -> Option<&MemoryType<'a>> {
        match self {
            Self::Memory(ty) => Some(ty),
            _ => None,
        }
    }
}

// === Import & Export Types === //

foreign_view! {
    pub struct ImportType(wasm_importtype_t);
}

impl ImportType<'_> {
    pub fn module(&self) -> ByteVec<'_> {
        let raw = unsafe { (self.handle.api().wasm_importtype_module)(self.as_ptr()) };
        unsafe { ByteVec::borrowed(self.runtime(), non_null(raw, "wasm_importtype_module")) }
    }

    pub fn name(&self) -> ByteVec<'_> {
        let raw = unsafe { (self.handle.api().wasm_importtype_name)(self.as_ptr()) };
        unsafe { ByteVec::borrowed(self.runtime(), non_null(raw, "wasm_importtype_name")) }
    }

    pub fn ty(&self) -> ExternTypeRef<'_> {
        let raw = unsafe { (self.handle.api().wasm_importtype_type)(self.as_ptr()) };
        unsafe {
            ExternTypeRef::from_handle(Handle::from_nonnull_contract(
                self.runtime(),
                raw,
                "wasm_importtype_type",
            ))
        }
    }
}

foreign_view! {
    pub struct ExportType(wasm_exporttype_t);
}

impl ExportType<'_> {
    pub fn name(&self) -> ByteVec<'_> {
        let raw = unsafe { (self.handle.api().wasm_exporttype_name)(self.as_ptr()) };
        unsafe { ByteVec::borrowed(self.runtime(), non_null(raw, "wasm_exporttype_name")) }
    }

    pub fn ty(&self) -> ExternTypeRef<'_> {
        let raw = unsafe { (self.handle.api().wasm_exporttype_type)(self.as_ptr()) };
        unsafe {
            ExternTypeRef::from_handle(Handle::from_nonnull_contract(
                self.runtime(),
                raw,
                "wasm_exporttype_type",
            ))
        }
    }
}
