//! Every read or write of a `wasm_vec_t`'s `size` and `data` fields lives in this module.

use std::{marker::PhantomData, ptr::NonNull, slice};

use bytemuck::Zeroable;
use derive_where::derive_where;
use wasmcapi_sys::*;

use crate::{
    AsExtern, Error, ExportType, ExternRef, ForeignObject, Frame, Handle, ImportType, Owned, Result,
    Runtime, Scope, Val, ValKind, ValType, val,
};

// === Element Shapes === //

/// An element shape of a C API vector.
///
/// # Safety
///
/// `new_empty` and `delete` must be the vector functions for `wasm_vec_t<Self::Raw>`.
pub unsafe trait VecElem: 'static {
    type Raw: Copy + 'static;

    type Item<'a>;

    const NAME: &'static str;

    fn new_empty(api: &WasmApi) -> unsafe extern "C" fn(*mut wasm_vec_t<Self::Raw>);

    fn delete(api: &WasmApi) -> unsafe extern "C" fn(*mut wasm_vec_t<Self::Raw>);

    /// # Safety
    ///
    /// `raw` must be an element of a live vector of this shape created by `rt`.
    unsafe fn item<'a>(rt: Runtime, raw: &'a Self::Raw) -> Self::Item<'a>;
}

macro_rules! vec_elems {
    ($(
        $(#[$meta:meta])*
        $elem:ident($raw:ty) as $name:literal via $new_empty:ident, $delete:ident;
        item<$lt:lifetime>($rt:ident, $r:ident) -> $item:ty $body:block
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $elem {}

        unsafe impl VecElem for $elem {
            type Raw = $raw;

            type Item<$lt> = $item;

            const NAME: &'static str = $name;

            fn new_empty(api: &WasmApi) -> unsafe extern "C" fn(*mut wasm_vec_t<$raw>) {
                api.$new_empty
            }

            fn delete(api: &WasmApi) -> unsafe extern "C" fn(*mut wasm_vec_t<$raw>) {
                api.$delete
            }

            #[allow(unused_variables)]
            unsafe fn item<$lt>($rt: Runtime, $r: &$lt $raw) -> $item $body
        }
    )*};
}

vec_elems! {
    /// Flat `wasm_byte_t` elements.
    ByteElem(wasm_byte_t) as "wasm_byte_vec_t" via wasm_byte_vec_new_empty, wasm_byte_vec_delete;
    item<'a>(rt, raw) -> u8 { *raw }

    /// Flat `wasm_val_t` elements.
    ValElem(wasm_val_t) as "wasm_val_vec_t" via wasm_val_vec_new_empty, wasm_val_vec_delete;
    item<'a>(rt, raw) -> Result<Val> { val::decode(raw) }

    ValTypeElem(*mut wasm_valtype_t) as "wasm_valtype_vec_t" via wasm_valtype_vec_new_empty, wasm_valtype_vec_delete;
    item<'a>(rt, raw) -> ValType<'a> {
        unsafe { ValType::from_handle(Handle::from_nonnull_contract(rt, *raw, "wasm_valtype_vec_t")) }
    }

    ExternElem(*mut wasm_extern_t) as "wasm_extern_vec_t" via wasm_extern_vec_new_empty, wasm_extern_vec_delete;
    item<'a>(rt, raw) -> ExternRef<'a> {
        unsafe { ExternRef::from_handle(Handle::from_nonnull_contract(rt, *raw, "wasm_extern_vec_t")) }
    }

    ImportTypeElem(*mut wasm_importtype_t) as "wasm_importtype_vec_t" via wasm_importtype_vec_new_empty, wasm_importtype_vec_delete;
    item<'a>(rt, raw) -> ImportType<'a> {
        unsafe {
            ImportType::from_handle(Handle::from_nonnull_contract(rt, *raw, "wasm_importtype_vec_t"))
        }
    }

    ExportTypeElem(*mut wasm_exporttype_t) as "wasm_exporttype_vec_t" via wasm_exporttype_vec_new_empty, wasm_exporttype_vec_delete;
    item<'a>(rt, raw) -> ExportType<'a> {
        unsafe {
            ExportType::from_handle(Handle::from_nonnull_contract(rt, *raw, "wasm_exporttype_vec_t"))
        }
    }

    FrameElem(*mut wasm_frame_t) as "wasm_frame_vec_t" via wasm_frame_vec_new_empty, wasm_frame_vec_delete;
    item<'a>(rt, raw) -> Frame<'a> {
        unsafe { Frame::from_handle(Handle::from_nonnull_contract(rt, *raw, "wasm_frame_vec_t")) }
    }
}

pub type ByteVec<'a> = VecView<'a, ByteElem>;
pub type ValVec<'a> = VecView<'a, ValElem>;
pub type ValTypeVec<'a> = VecView<'a, ValTypeElem>;
pub type ExternVec<'a> = VecView<'a, ExternElem>;
pub type ImportTypeVec<'a> = VecView<'a, ImportTypeElem>;
pub type ExportTypeVec<'a> = VecView<'a, ExportTypeElem>;
pub type FrameVec<'a> = VecView<'a, FrameElem>;

/// A vector whose contents this binding must free with the matching `*_vec_delete`.
pub type OwnedVec<'s, E> = Owned<'s, VecView<'s, E>>;

// === VecView === //

/// A view of a `wasm_vec_t` record.
///
/// Views come from three constructors only: [`VecView::empty`], the `from_host` family (both
/// backed by scope memory and never passed to a foreign destructor), and foreign out-parameter
/// or accessor results. Whether the latter are owned is visible in the returning function's
/// signature: [`OwnedVec`] or a plain view.
#[derive_where(Debug)]
pub struct VecView<'a, E: VecElem> {
    handle: Handle<'a, wasm_vec_t<E::Raw>>,
    _ty: PhantomData<E>,
}

unsafe impl<E: VecElem> ForeignObject for VecView<'_, E> {
    type Raw = wasm_vec_t<E::Raw>;

    const NAME: &'static str = E::NAME;

    fn handle(&self) -> &Handle<'_, Self::Raw> {
        &self.handle
    }

    unsafe fn delete(api: &WasmApi, raw: NonNull<Self::Raw>) {
        unsafe { (E::delete(api))(raw.as_ptr()) }
    }
}

impl<'a, E: VecElem> VecView<'a, E> {
    /// A zero-length vector. Owns nothing and is never passed to a foreign destructor.
    pub fn empty(scope: &'a Scope<'_>, rt: Runtime) -> Self {
        let raw = scope.alloc(wasm_vec_t::<E::Raw>::zeroed());
        unsafe { (E::new_empty(rt.api()))(raw.as_ptr()) };

        unsafe { Self::borrowed(rt, raw) }
    }

    /// Copies `items` into a scope-owned buffer.
    pub(crate) fn from_raw_items(scope: &'a Scope<'_>, rt: Runtime, items: &[E::Raw]) -> Self {
        if items.is_empty() {
            return Self::empty(scope, rt);
        }

        let data = scope.alloc_slice(items);
        let raw = scope.alloc(wasm_vec_t {
            size: items.len(),
            data: data.as_ptr(),
        });

        tracing::trace!(elem = E::NAME, len = items.len(), "built host vector");

        unsafe { Self::borrowed(rt, raw) }
    }

    /// Wraps a record the caller does not own.
    ///
    /// # Safety
    ///
    /// `raw` must point to a vector of this shape created by `rt` that stays valid for `'a`.
    pub(crate) unsafe fn borrowed(rt: Runtime, raw: NonNull<wasm_vec_t<E::Raw>>) -> Self {
        Self {
            handle: unsafe { Handle::new(rt, raw) },
            _ty: PhantomData,
        }
    }

    /// Lets a foreign call fill a scope-allocated record and takes ownership of the result.
    ///
    /// # Safety
    ///
    /// `fill` must initialize the record with a vector the caller then owns.
    pub(crate) unsafe fn owned_output(
        scope: &'a Scope<'_>,
        rt: Runtime,
        fill: impl FnOnce(*mut wasm_vec_t<E::Raw>),
    ) -> OwnedVec<'a, E> {
        let raw = scope.alloc(wasm_vec_t::<E::Raw>::zeroed());
        fill(raw.as_ptr());

        unsafe { Owned::adopt(scope, Self::borrowed(rt, raw)) }
    }

    pub fn runtime(&self) -> Runtime {
        self.handle.runtime()
    }

    pub fn as_ptr(&self) -> *mut wasm_vec_t<E::Raw> {
        self.handle.as_ptr()
    }

    fn raw_items(&self) -> &[E::Raw] {
        let raw = unsafe { self.handle.as_non_null().read() };

        if raw.size == 0 {
            &[]
        } else {
            unsafe { slice::from_raw_parts(raw.data, raw.size) }
        }
    }

    pub fn len(&self) -> usize {
        self.raw_items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> E::Item<'_> {
        let items = self.raw_items();

        let Some(raw) = items.get(index) else {
            panic!(
                "index {index} out of bounds for {} of length {}",
                E::NAME,
                items.len()
            );
        };

        unsafe { E::item(self.runtime(), raw) }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = E::Item<'_>> + '_ {
        let rt = self.runtime();
        self.raw_items()
            .iter()
            .map(move |raw| unsafe { E::item(rt, raw) })
    }

    /// Overwrites element `index` of a vector whose buffer the caller may write.
    ///
    /// # Safety
    ///
    /// The vector's buffer must be writable, as is the case for result vectors handed to a
    /// callback and for host-built vectors.
    pub(crate) unsafe fn write_raw(&self, index: usize, value: E::Raw) {
        let len = self.len();
        assert!(
            index < len,
            "index {index} out of bounds for {} of length {len}",
            E::NAME
        );

        unsafe {
            let raw = self.handle.as_non_null().read();
            raw.data.add(index).write(value);
        }
    }
}

// === Typed Constructors === //

impl<'a> ByteVec<'a> {
    pub fn from_host(scope: &'a Scope<'_>, rt: Runtime, bytes: &[u8]) -> Self {
        Self::from_raw_items(scope, rt, bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw_items()
    }

    /// Decodes the bytes as UTF-8, dropping one trailing NUL if present.
    pub fn to_string_lossy(&self) -> String {
        let bytes = self.as_bytes();
        let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl<'a> ValVec<'a> {
    pub fn from_host(scope: &'a Scope<'_>, rt: Runtime, vals: &[Val]) -> Self {
        let raw = vals.iter().map(|&v| val::encode(v)).collect::<Vec<_>>();
        Self::from_raw_items(scope, rt, &raw)
    }

    /// A vector of zero values of the given kinds, used to receive call results.
    pub fn for_results(scope: &'a Scope<'_>, rt: Runtime, kinds: &[ValKind]) -> Self {
        let vals = kinds.iter().map(|&k| Val::default_for(k)).collect::<Vec<_>>();
        Self::from_host(scope, rt, &vals)
    }

    pub fn to_vals(&self) -> Result<Vec<Val>> {
        self.iter().collect()
    }

    pub(crate) fn write(&self, index: usize, value: Val) {
        unsafe { self.write_raw(index, val::encode(value)) };
    }
}

impl<'a> ExternVec<'a> {
    /// Collects the addresses of `externs`. The externs themselves are not copied, so they
    /// must stay alive as long as the vector is used.
    pub fn from_host(scope: &'a Scope<'_>, rt: Runtime, externs: &[&'a dyn AsExtern]) -> Self {
        let raw = externs
            .iter()
            .map(|ext| ext.as_extern_ptr())
            .collect::<Vec<_>>();

        Self::from_raw_items(scope, rt, &raw)
    }
}

impl<'s> ValTypeVec<'s> {
    /// Builds a vector whose valtypes and buffer are owned by the foreign side, as expected
    /// by constructors such as `wasm_functype_new` that consume their inputs.
    pub(crate) fn foreign_from_kinds(
        scope: &'s Scope<'_>,
        rt: Runtime,
        kinds: &[ValKind],
    ) -> Result<OwnedVec<'s, ValTypeElem>> {
        let api = rt.api();

        // Release already-created valtypes if a later one fails.
        let mut created = scopeguard::guard(Vec::with_capacity(kinds.len()), |created| {
            for ty in created {
                unsafe { (api.wasm_valtype_delete)(ty) };
            }
        });

        for &kind in kinds {
            let ty = unsafe { (api.wasm_valtype_new)(kind.as_raw()) };
            if ty.is_null() {
                return Err(Error::allocation("wasm_valtype_new"));
            }
            created.push(ty);
        }

        let created = scopeguard::ScopeGuard::into_inner(created);

        Ok(unsafe {
            Self::owned_output(scope, rt, |out| {
                (api.wasm_valtype_vec_new)(out, created.len(), created.as_ptr());
            })
        })
    }
}
