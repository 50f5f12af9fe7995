//! Recursive mutex with owner identity and reentrancy count.
//!
//! A [`VciMutex`] is never locked directly by callers; the critical-section
//! disciplines in [`crate::cs`] drive it through the crate-private methods
//! below. Owner and count are atomics so that the lock-free VCI path, which
//! never touches the raw lock, can still be inspected from any thread.
//!
//! Invariant: `count > 0` iff an owner is recorded. On the blocking path the
//! raw lock is engaged iff `count > 0`; on the lock-free path the mutex may be
//! held logically with the raw lock free.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{fatal, Invariant};
use crate::sync::RawLock;
use crate::types::ContextId;

const NO_OWNER: u64 = 0;

/// Recursive mutex used by the critical-section protocol.
#[derive(Debug)]
pub struct VciMutex {
    raw: RawLock,
    owner: AtomicU64,
    count: AtomicU32,
    name: &'static str,
}

impl VciMutex {
    /// Creates an unowned mutex with count zero.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            raw: RawLock::new(),
            owner: AtomicU64::new(NO_OWNER),
            count: AtomicU32::new(0),
            name,
        }
    }

    /// Destroys the mutex.
    ///
    /// Destroying a mutex that is still held is fatal.
    pub fn destroy(self) {
        let count = self.count();
        if count != 0 {
            let name = self.name;
            // Skip the drop check; we are about to report the same problem.
            std::mem::forget(self);
            fatal(Invariant::DestroyHeld { mutex: name, count });
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the current owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<ContextId> {
        ContextId::from_raw(self.owner.load(Ordering::Acquire))
    }

    /// Returns the reentrancy count.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Returns true if `context` owns the mutex.
    #[must_use]
    pub fn is_owned_by(&self, context: ContextId) -> bool {
        self.owner.load(Ordering::Acquire) == context.as_u64()
    }

    /// Returns true if the raw lock is engaged (blocking path only).
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    pub(crate) const fn raw(&self) -> &RawLock {
        &self.raw
    }

    /// Records `context` as sole owner with count one.
    pub(crate) fn claim(&self, context: ContextId) {
        self.owner.store(context.as_u64(), Ordering::Release);
        self.count.store(1, Ordering::Release);
    }

    /// Clears owner and count.
    ///
    /// Contenders claim on a zero count, so the owner is cleared first.
    pub(crate) fn clear(&self) {
        self.owner.store(NO_OWNER, Ordering::Release);
        self.count.store(0, Ordering::Release);
    }

    /// Restores a previously saved owner and count.
    pub(crate) fn restore(&self, owner: Option<ContextId>, count: u32) {
        self.owner
            .store(owner.map_or(NO_OWNER, ContextId::as_u64), Ordering::Release);
        self.count.store(count, Ordering::Release);
    }

    pub(crate) fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn decrement(&self) -> u32 {
        self.count.fetch_sub(1, Ordering::AcqRel) - 1
    }
}

impl Default for VciMutex {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

impl Drop for VciMutex {
    fn drop(&mut self) {
        let count = *self.count.get_mut();
        if count != 0 && !std::thread::panicking() {
            fatal(Invariant::DestroyHeld {
                mutex: self.name,
                count,
            });
        }
    }
}
