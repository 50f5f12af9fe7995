//! Park/unpark token for suspended contexts.

use parking_lot::{Condvar, Mutex};

/// A mechanism for parking and unparking a context's thread.
///
/// An `unpark` that arrives before `park` is remembered, so a hand-off
/// racing with the suspension is never lost.
#[derive(Debug, Default)]
pub struct Parker {
    notified: Mutex<bool>,
    cvar: Condvar,
}

impl Parker {
    /// Creates a new parker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            notified: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// Parks the current thread until notified.
    pub fn park(&self) {
        let mut notified = self.notified.lock();
        while !*notified {
            self.cvar.wait(&mut notified);
        }
        *notified = false;
    }

    /// Unparks a parked thread.
    pub fn unpark(&self) {
        {
            let mut notified = self.notified.lock();
            *notified = true;
        }
        self.cvar.notify_one();
    }
}
