use std::{
    env, fmt, mem,
    path::{Path, PathBuf},
    sync::{LazyLock, Mutex, PoisonError},
};

use libloading::Library;
use rustc_hash::FxHashMap;
use wasmcapi_sys::WasmApi;

use crate::{Error, Result};

/// The environment variable consulted by [`Runtime::from_env`].
pub const LIBRARY_ENV_VAR: &str = "WASMCAPI_LIBRARY";

static LOADED: LazyLock<Mutex<FxHashMap<PathBuf, &'static WasmApi>>> =
    LazyLock::new(Default::default);

/// A capability to call into one implementation of the C API.
///
/// Every wrapper carries the runtime it was created from so that its foreign calls and its
/// destructor resolve against the same table.
#[derive(Copy, Clone)]
pub struct Runtime {
    api: &'static WasmApi,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Runtime")
            .field(&(self.api as *const WasmApi))
            .finish()
    }
}

impl PartialEq for Runtime {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.api, other.api)
    }
}

impl Eq for Runtime {}

impl Runtime {
    /// Wraps a table that is statically available, e.g. an in-process implementation.
    pub const fn from_api(api: &'static WasmApi) -> Self {
        Self { api }
    }

    /// Loads the shared library at `path` and resolves its function table.
    ///
    /// Loading is idempotent per canonical path. Loaded libraries stay mapped until the
    /// process exits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let mut loaded = LOADED.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(&api) = loaded.get(&key) {
            return Ok(Self { api });
        }

        let library = unsafe { Library::new(path) }?;
        let api = unsafe { WasmApi::load(&library) }?;

        let api: &'static WasmApi = Box::leak(Box::new(api));
        mem::forget(library);

        tracing::debug!(path = %key.display(), symbols = WasmApi::SYMBOLS.len(), "loaded wasm C API");
        loaded.insert(key, api);

        Ok(Self { api })
    }

    /// Loads the library named by the `WASMCAPI_LIBRARY` environment variable.
    pub fn from_env() -> Result<Self> {
        match env::var_os(LIBRARY_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(path),
            _ => Err(Error::MissingLibrary(LIBRARY_ENV_VAR)),
        }
    }

    pub fn api(self) -> &'static WasmApi {
        self.api
    }
}
