//! Pending-request guard.
//!
//! Completion callbacks run on the provider's worker context and can race
//! the loader's destruction on the owner's thread. The guard is shared
//! (`Arc`) between the loader and every outstanding callback, so whichever
//! outlives the other still observes a consistent abort flag:
//!
//! 1. Loader operations mutate state through [`AbortGuard::lock`].
//! 2. Callbacks deliver through [`AbortGuard::deliver`], which re-checks the
//!    abort flag under the lock and skips the delivery entirely once it is
//!    set.
//! 3. Teardown goes through [`AbortGuard::abort`], which sets the flag and
//!    runs its cleanup while still holding the lock, ordering it against any
//!    callback attempting step 2.
//!
//! Together these give the two load-bearing properties: no delivery ever
//! runs after abort was observable, and only one thread at a time mutates
//! the guarded state.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

/// Mutual exclusion plus an abort flag over a loader's mutable core.
pub(crate) struct AbortGuard<S> {
    aborted: AtomicBool,
    state: Mutex<S>,
}

impl<S> AbortGuard<S> {
    pub fn new(state: S) -> Self {
        Self {
            aborted: AtomicBool::new(false),
            state: Mutex::new(state),
        }
    }

    /// Returns true once [`abort`](Self::abort) has run.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Exclusive access for loader-side operations.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock()
    }

    /// Run a completion delivery unless the guard was aborted.
    ///
    /// The abort flag is checked again under the lock; `abort` holds the
    /// same lock while setting it, so a delivery either fully precedes the
    /// abort or observes it and does nothing. Returns `None` when the
    /// delivery was skipped.
    pub fn deliver<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        if self.is_aborted() {
            return None;
        }
        let mut state = self.state.lock();
        if self.is_aborted() {
            return None;
        }
        Some(f(&mut state))
    }

    /// Set the abort flag and run teardown under the lock.
    ///
    /// Any delivery that has not yet acquired the lock will observe the flag
    /// and skip; one already holding it finishes before the flag is set.
    pub fn abort<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock();
        self.aborted.store(true, Ordering::Release);
        f(&mut state)
    }
}
