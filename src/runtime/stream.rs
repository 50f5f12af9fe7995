//! Execution streams.
//!
//! An [`ExecutionStream`] is a cooperative worker: at most one context runs
//! on it at a time (the holder of its run slot). Contexts waiting to run are
//! suspended in its FIFO pool. The slot is handed over explicitly:
//!
//! - `acquire`: take the slot if free, otherwise enqueue and park
//! - `release`: pass the slot to the oldest pooled context, or free it
//! - `yield_slot`: pass the slot on and re-enqueue self at the back
//!
//! A context parked in the pool owns nothing on the stream; whoever hands it
//! the slot marks it running before unparking it.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::runtime::parker::Parker;
use crate::tracing_compat::trace;
use crate::types::{ContextId, StreamId, VciMask};

/// A context's identity and wake-up token, shared with the pools it visits.
#[derive(Debug)]
pub(crate) struct ContextSlot {
    pub(crate) id: ContextId,
    parker: Parker,
}

impl ContextSlot {
    pub(crate) const fn new(id: ContextId) -> Self {
        Self {
            id,
            parker: Parker::new(),
        }
    }
}

#[derive(Debug, Default)]
struct PoolState {
    running: Option<ContextId>,
    pool: VecDeque<Arc<ContextSlot>>,
}

/// One cooperative worker and its pool of suspended contexts.
#[derive(Debug)]
pub struct ExecutionStream {
    id: StreamId,
    mask: VciMask,
    state: Mutex<PoolState>,
}

impl ExecutionStream {
    pub(crate) fn new(id: StreamId, mask: VciMask) -> Self {
        Self {
            id,
            mask,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Stream id.
    #[must_use]
    pub const fn id(&self) -> StreamId {
        self.id
    }

    /// VCIs this stream handles without locking.
    #[must_use]
    pub const fn mask(&self) -> VciMask {
        self.mask
    }

    /// The context currently holding the run slot.
    #[must_use]
    pub fn running(&self) -> Option<ContextId> {
        self.state.lock().running
    }

    /// Number of contexts suspended in the pool.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.state.lock().pool.len()
    }

    /// Blocks until `slot` holds the run slot.
    pub(crate) fn acquire(&self, slot: &Arc<ContextSlot>) {
        let mut state = self.state.lock();
        if state.running.is_none() {
            state.running = Some(slot.id);
            return;
        }
        state.pool.push_back(Arc::clone(slot));
        drop(state);
        trace!(stream = %self.id, context = %slot.id, "suspended in pool");
        slot.parker.park();
    }

    /// Gives up the run slot held by `slot`.
    pub(crate) fn release(&self, slot: &ContextSlot) {
        let state = self.state.lock();
        debug_assert_eq!(state.running, Some(slot.id), "release by non-runner");
        self.hand_off(state, slot);
    }

    /// Gives up the run slot if `slot` holds it. Used when a context ends,
    /// possibly while unwinding from outside its slot.
    pub(crate) fn leave(&self, slot: &ContextSlot) {
        let state = self.state.lock();
        if state.running == Some(slot.id) {
            self.hand_off(state, slot);
        }
    }

    fn hand_off(&self, mut state: MutexGuard<'_, PoolState>, slot: &ContextSlot) {
        match state.pool.pop_front() {
            Some(next) => {
                state.running = Some(next.id);
                drop(state);
                trace!(stream = %self.id, from = %slot.id, to = %next.id, "hand-off");
                next.parker.unpark();
            }
            None => state.running = None,
        }
    }

    /// Hands the run slot to the next pooled context and waits for it to come
    /// back. Returns false, without suspending, if the pool is empty.
    pub(crate) fn yield_slot(&self, slot: &Arc<ContextSlot>) -> bool {
        let mut state = self.state.lock();
        debug_assert_eq!(state.running, Some(slot.id), "yield by non-runner");
        let Some(next) = state.pool.pop_front() else {
            return false;
        };
        state.running = Some(next.id);
        state.pool.push_back(Arc::clone(slot));
        drop(state);
        trace!(stream = %self.id, from = %slot.id, to = %next.id, "yield");
        next.parker.unpark();
        slot.parker.park();
        true
    }
}
