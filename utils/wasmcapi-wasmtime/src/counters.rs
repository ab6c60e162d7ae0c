use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

thread_local! {
    static DELETES: RefCell<FxHashMap<&'static str, usize>> = RefCell::new(FxHashMap::default());
    static FAIL_NEXT_ALLOC: Cell<bool> = const { Cell::new(false) };
}

/// Number of times the `wasm_*_delete` entry point named `symbol` ran on this thread since the
/// last [`reset_counters`].
pub fn delete_count(symbol: &str) -> usize {
    DELETES.with_borrow(|map| map.get(symbol).copied().unwrap_or(0))
}

pub fn reset_counters() {
    DELETES.with_borrow_mut(|map| map.clear());
    FAIL_NEXT_ALLOC.set(false);
}

/// Makes the next allocating constructor called on this thread return null.
pub fn fail_next_alloc() {
    FAIL_NEXT_ALLOC.set(true);
}

pub(crate) fn count_delete(symbol: &'static str) {
    DELETES.with_borrow_mut(|map| *map.entry(symbol).or_default() += 1);
}

pub(crate) fn take_alloc_failure() -> bool {
    FAIL_NEXT_ALLOC.replace(false)
}
