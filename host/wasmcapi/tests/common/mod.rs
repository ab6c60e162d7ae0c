#![allow(dead_code)]

use tracing_subscriber::EnvFilter;
use wasmcapi::Runtime;

pub fn runtime() -> Runtime {
    init_tracing();
    wasmcapi_wasmtime::reset_counters();
    Runtime::from_api(wasmcapi_wasmtime::api())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

pub fn wasm(text: &str) -> Vec<u8> {
    wat::parse_str(text).expect("invalid test module")
}

pub fn deletes(symbol: &str) -> usize {
    wasmcapi_wasmtime::delete_count(symbol)
}
