use std::{
    cell::RefCell,
    fmt,
    marker::PhantomData,
    ptr::{self, NonNull},
    sync::atomic::{AtomicU64, Ordering::Relaxed},
};

// === Scope === //

/// A region whose foreign allocations are released together.
///
/// Release actions run in reverse registration order, exactly once, when the scope is closed
/// or dropped. Dropping covers every exit path, unwinding included. `'env` is the lifetime of
/// everything the release actions depend on, most notably the [`Store`](crate::Store) that
/// store-rooted objects were created in. Since `Scope` implements `Drop`, the borrow checker
/// requires those dependencies to outlive the scope.
///
/// Scopes are neither `Send` nor `Sync`. Open one per thread.
pub struct Scope<'env> {
    id: u64,
    actions: RefCell<Vec<Option<ReleaseAction<'env>>>>,
    _invariant: PhantomData<fn(&'env ()) -> &'env ()>,
}

struct ReleaseAction<'env> {
    what: &'static str,
    run: Box<dyn FnOnce() + 'env>,
}

/// Identifies a release action registered in a [`Scope`].
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct ReleaseKey {
    scope: u64,
    index: usize,
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}

impl<'env> Scope<'env> {
    pub fn open() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        let id = NEXT_ID.fetch_add(1, Relaxed);
        tracing::trace!(scope = id, "opened scope");

        Self {
            id,
            actions: RefCell::default(),
            _invariant: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of release actions that have not run yet.
    pub fn pending(&self) -> usize {
        self.actions.borrow().iter().flatten().count()
    }

    /// Records `action` to run when the scope closes.
    pub fn register(&self, action: impl FnOnce() + 'env) -> ReleaseKey {
        self.register_named("user action", action)
    }

    pub(crate) fn register_named(
        &self,
        what: &'static str,
        action: impl FnOnce() + 'env,
    ) -> ReleaseKey {
        let mut actions = self.actions.borrow_mut();
        let index = actions.len();

        actions.push(Some(ReleaseAction {
            what,
            run: Box::new(action),
        }));

        ReleaseKey {
            scope: self.id,
            index,
        }
    }

    /// Runs the release action for `key` now rather than at scope close.
    ///
    /// Returns `false` if it already ran.
    pub fn release(&self, key: ReleaseKey) -> bool {
        match self.take(key) {
            Some(action) => {
                tracing::trace!(scope = self.id, what = action.what, "released early");
                (action.run)();
                true
            }
            None => false,
        }
    }

    /// Drops the release action for `key` without running it.
    pub fn forget(&self, key: ReleaseKey) -> bool {
        self.take(key).is_some()
    }

    fn take(&self, key: ReleaseKey) -> Option<ReleaseAction<'env>> {
        assert_eq!(
            key.scope, self.id,
            "release key from scope {} used with scope {}",
            key.scope, self.id
        );

        // The borrow must end before the action runs, since actions may touch the scope.
        self.actions.borrow_mut()[key.index].take()
    }

    /// Copies `value` into scope-owned memory with a stable address.
    pub fn alloc<T: Copy + 'static>(&self, value: T) -> NonNull<T> {
        let ptr = NonNull::from(Box::leak(Box::new(value)));

        self.register_named("host record", move || {
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        });

        ptr
    }

    /// Copies `items` into a scope-owned contiguous buffer.
    pub fn alloc_slice<T: Copy + 'static>(&self, items: &[T]) -> NonNull<T> {
        let buf = Box::into_raw(Box::<[T]>::from(items));
        let len = items.len();

        self.register_named("host buffer", move || {
            drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(buf.cast::<T>(), len)) });
        });

        // `Box<[T]>` never hands out a null pointer, even when empty.
        unsafe { NonNull::new_unchecked(buf.cast::<T>()) }
    }

    /// Runs every pending release action. Equivalent to dropping the scope.
    pub fn close(self) {
        drop(self);
    }

    fn release_all(&mut self) {
        let actions = self.actions.get_mut();
        let pending = actions.iter().flatten().count();

        if pending > 0 {
            tracing::trace!(scope = self.id, pending, "closing scope");
        }

        // If an action panics the guard keeps draining so nothing registered before it leaks.
        let mut remaining = scopeguard::guard(std::mem::take(actions), |mut remaining| {
            while let Some(action) = remaining.pop() {
                if let Some(action) = action {
                    (action.run)();
                }
            }
        });

        while let Some(action) = remaining.pop() {
            if let Some(action) = action {
                (action.run)();
            }
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}

// === Release === //

/// Object-safe access to a scope for [`Owned`](crate::Owned), which cannot name `'env`.
pub(crate) trait Release {
    fn release(&self, key: ReleaseKey) -> bool;
}

impl Release for Scope<'_> {
    fn release(&self, key: ReleaseKey) -> bool {
        Scope::release(self, key)
    }
}
