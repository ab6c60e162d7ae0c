use thiserror::Error;

use crate::{TrapInfo, ValKind};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load the wasm C API library")]
    Load(#[from] libloading::Error),

    #[error("environment variable `{0}` does not name a wasm C API library")]
    MissingLibrary(&'static str),

    #[error("foreign allocation failed in `{what}`")]
    Allocation { what: &'static str },

    #[error("module failed to compile")]
    Compilation,

    #[error("serialized module could not be deserialized")]
    Deserialization,

    #[error("instantiation trapped: {0}")]
    InstantiationTrapped(TrapInfo),

    #[error("supplied imports do not match the module's import types")]
    ImportMismatch,

    #[error("guest trapped: {0}")]
    Trap(TrapInfo),

    #[error("unrecognized extern kind tag {0}")]
    UnrecognizedKind(u8),

    #[error("unrecognized value kind tag {0}")]
    UnrecognizedValKind(u8),

    #[error("expected a value of kind {expected:?}, got {actual:?}")]
    TypeMismatch { expected: ValKind, actual: ValKind },

    #[error("global is immutable")]
    ImmutableGlobal,

    #[error("expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

impl Error {
    pub(crate) fn allocation(what: &'static str) -> Self {
        tracing::warn!("foreign allocation failed in `{what}`");
        Self::Allocation { what }
    }

    /// Whether this error is a guest-visible trap rather than a binding or host failure.
    pub fn is_trap(&self) -> bool {
        matches!(self, Self::Trap(_) | Self::InstantiationTrapped(_))
    }

    pub fn trap_info(&self) -> Option<&TrapInfo> {
        match self {
            Self::Trap(info) | Self::InstantiationTrapped(info) => Some(info),
            _ => None,
        }
    }
}
