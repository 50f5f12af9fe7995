//! Exclusive lock with explicit lock/unlock.
//!
//! Unlike a guard-based mutex, the lock is released by a separate call, so
//! it can be taken in `enter` and released in `exit` from different stack
//! frames. Built on a `parking_lot` mutex/condvar pair so no unsafe code is
//! needed.

use parking_lot::{Condvar, Mutex};

use crate::error::{fatal, Invariant};

/// Exclusive lock without a guard.
#[derive(Debug, Default)]
pub struct RawLock {
    locked: Mutex<bool>,
    released: Condvar,
}

impl RawLock {
    /// Creates an unlocked lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Blocks the calling thread until the lock is acquired.
    pub fn lock(&self) {
        let mut locked = self.locked.lock();
        while *locked {
            self.released.wait(&mut locked);
        }
        *locked = true;
    }

    /// Acquires the lock if it is free.
    #[must_use]
    pub fn try_lock(&self) -> bool {
        let mut locked = self.locked.lock();
        if *locked {
            false
        } else {
            *locked = true;
            true
        }
    }

    /// Releases the lock.
    ///
    /// Releasing a lock that is not engaged is fatal.
    pub fn unlock(&self) {
        let mut locked = self.locked.lock();
        if !*locked {
            drop(locked);
            fatal(Invariant::RawUnlockUnheld);
        }
        *locked = false;
        drop(locked);
        self.released.notify_one();
    }

    /// Returns true if the lock is currently engaged.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        *self.locked.lock()
    }

    /// Atomically releases the lock and waits on `cond`, then re-acquires.
    ///
    /// The caller must hold the lock. Wake-ups may be spurious. A given
    /// `cond` must only ever be paired with one lock.
    pub(crate) fn wait_on(&self, cond: &Condvar) {
        let mut locked = self.locked.lock();
        if !*locked {
            drop(locked);
            fatal(Invariant::RawUnlockUnheld);
        }
        *locked = false;
        self.released.notify_one();
        cond.wait(&mut locked);
        while *locked {
            self.released.wait(&mut locked);
        }
        *locked = true;
    }
}
