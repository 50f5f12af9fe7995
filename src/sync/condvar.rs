//! Condition variable paired with a [`VciMutex`].

use parking_lot::Condvar;

use crate::sync::VciMutex;

/// Condition variable for the blocking path.
///
/// `wait` follows the usual contract: the caller holds the mutex, wake-ups
/// may be spurious, so callers loop on their predicate. Owner and count are
/// cleared while waiting and restored afterwards, so a recursively held
/// mutex comes back at the same depth.
#[derive(Debug, Default)]
pub struct VciCondvar {
    cond: Condvar,
}

impl VciCondvar {
    /// Creates a condition variable.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cond: Condvar::new(),
        }
    }

    /// Destroys the condition variable.
    pub fn destroy(self) {}

    /// Releases `mutex`, waits for a signal, then re-acquires it.
    ///
    /// Blocks the calling OS thread. A context running on an execution
    /// stream should use [`ExecContext::cond_wait`](crate::runtime::ExecContext::cond_wait)
    /// so other contexts on its stream keep running.
    pub fn wait(&self, mutex: &VciMutex) {
        let owner = mutex.owner();
        let count = mutex.count();
        mutex.clear();
        mutex.raw().wait_on(&self.cond);
        mutex.restore(owner, count);
    }

    /// Wakes one waiter.
    pub fn signal(&self) {
        self.cond.notify_one();
    }

    /// Wakes all waiters.
    pub fn broadcast(&self) {
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContextId;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn wait_restores_owner_and_count() {
        let pair = Arc::new((VciMutex::new("cv"), VciCondvar::new()));
        let ready = Arc::new(AtomicBool::new(false));
        let me = ContextId::from_raw(1).expect("non-zero");

        let (mutex, cond) = &*pair;
        mutex.raw().lock();
        mutex.claim(me);
        mutex.increment();

        let signaller = {
            let pair = Arc::clone(&pair);
            let ready = Arc::clone(&ready);
            std::thread::spawn(move || {
                let (mutex, cond) = &*pair;
                mutex.raw().lock();
                assert_eq!(mutex.count(), 0, "waiter must not look like an owner");
                ready.store(true, Ordering::SeqCst);
                cond.broadcast();
                mutex.raw().unlock();
            })
        };

        while !ready.load(Ordering::SeqCst) {
            cond.wait(mutex);
        }
        assert_eq!(mutex.owner(), Some(me));
        assert_eq!(mutex.count(), 2);

        mutex.clear();
        mutex.raw().unlock();
        signaller.join().expect("signaller panicked");
    }

    #[test]
    fn signal_without_waiters_is_harmless() {
        let cond = VciCondvar::new();
        cond.signal();
        cond.broadcast();
        cond.destroy();
    }
}
