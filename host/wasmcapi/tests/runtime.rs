//! Kept to a single test: it rewrites the process environment.

mod common;

use std::env;

use wasmcapi::{Error, LIBRARY_ENV_VAR, Runtime};

#[test]
fn libraries_are_located_through_the_environment() {
    common::init_tracing();

    unsafe { env::remove_var(LIBRARY_ENV_VAR) };
    assert!(matches!(
        Runtime::from_env(),
        Err(Error::MissingLibrary(LIBRARY_ENV_VAR))
    ));

    unsafe { env::set_var(LIBRARY_ENV_VAR, "") };
    assert!(matches!(
        Runtime::from_env(),
        Err(Error::MissingLibrary(LIBRARY_ENV_VAR))
    ));

    let missing = env::temp_dir().join("wasmcapi-missing").join("libwasm.so");
    assert!(matches!(Runtime::load(&missing), Err(Error::Load(_))));

    unsafe { env::set_var(LIBRARY_ENV_VAR, &missing) };
    let err = Runtime::from_env().unwrap_err();
    assert!(matches!(err, Error::Load(_)), "{err}");

    // Failed loads are not cached.
    assert!(matches!(Runtime::load(&missing), Err(Error::Load(_))));

    let linked = Runtime::from_api(wasmcapi_wasmtime::api());
    assert_eq!(linked, Runtime::from_api(wasmcapi_wasmtime::api()));
}
