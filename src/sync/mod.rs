//! Lock primitives underneath the critical-section protocol.
//!
//! # Primitives
//!
//! - [`RawLock`]: exclusive lock with explicit lock/unlock (no guard)
//! - [`VciMutex`]: recursive mutex: raw lock + owner identity + reentrancy count
//! - [`VciCondvar`]: condition variable that preserves owner/count across a wait
//! - [`MutexTable`]: the well-known GLOBAL-class mutexes plus one mutex per VCI
//!
//! The raw lock is only engaged on the blocking path. On the lock-free VCI
//! path a [`VciMutex`] is held *logically*: owner and count are set while the
//! raw lock stays free, and exclusion comes from the owning execution stream
//! running one context at a time.

mod condvar;
mod mutex;
mod raw;
mod table;

pub use condvar::VciCondvar;
pub use mutex::VciMutex;
pub use raw::RawLock;
pub use table::{ids, MutexTable};
