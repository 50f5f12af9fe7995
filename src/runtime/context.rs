//! Execution contexts and the protocol entry points.
//!
//! An [`ExecContext`] is one schedulable unit of work. It is backed by an OS
//! thread but only executes while it holds the run slot of its current
//! stream. Everything the protocol keeps per context (history ring,
//! original-stream marker, lock-free depth) lives here and is only ever
//! touched by the context itself.
//!
//! # Example
//!
//! ```ignore
//! let runtime = RuntimeBuilder::new().streams(2).vcis(2).build()?;
//! let mut ctx = runtime.attach(StreamId::new(0));
//! let mutex = runtime.mutexes().vci(2).unwrap();
//!
//! ctx.enter(mutex, MutexId::vci(2)); // offloaded to the stream owning vci 2
//! // ... touch vci 2 state ...
//! ctx.exit(mutex, MutexId::vci(2)); // back on stream 0
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::config::Verbosity;
use crate::cs::{CallSite, CriticalSection, CsRequest, VciHistory};
use crate::runtime::stream::ContextSlot;
use crate::runtime::Runtime;
use crate::sync::{RawLock, VciCondvar, VciMutex};
use crate::tracing_compat::trace;
use crate::types::{ContextId, MutexId, StreamId, VciMask};

/// A schedulable unit of work bound to an execution stream.
#[derive(Debug)]
pub struct ExecContext {
    runtime: Runtime,
    slot: Arc<ContextSlot>,
    stream: StreamId,
    history: VciHistory,
    original_stream: Option<StreamId>,
    held_vci: u32,
    full_locking: bool,
}

impl ExecContext {
    /// Waits for the run slot of `stream`, then returns the running context.
    pub(crate) fn start(runtime: Runtime, id: ContextId, stream: StreamId) -> Self {
        let slot = Arc::new(ContextSlot::new(id));
        runtime.stream(stream).acquire(&slot);
        let full_locking = !runtime.config().lock_free;
        trace!(context = %id, stream = %stream, "context started");
        Self {
            runtime,
            slot,
            stream,
            history: VciHistory::new(),
            original_stream: None,
            held_vci: 0,
            full_locking,
        }
    }

    /// Stable identity.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.slot.id
    }

    /// The runtime this context belongs to.
    #[must_use]
    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The stream the context is currently running on.
    #[must_use]
    pub const fn stream(&self) -> StreamId {
        self.stream
    }

    /// Where an offloaded context will return to.
    #[must_use]
    pub const fn original_stream(&self) -> Option<StreamId> {
        self.original_stream
    }

    /// Recent VCI acquisitions.
    #[must_use]
    pub const fn history(&self) -> &VciHistory {
        &self.history
    }

    /// Number of lock-free VCI sections currently held.
    #[must_use]
    pub const fn vci_depth(&self) -> u32 {
        self.held_vci
    }

    /// True if this context never takes the lock-free path.
    #[must_use]
    pub const fn is_full_locking(&self) -> bool {
        self.full_locking
    }

    /// Switches the lock-free path off (or back on) for this context.
    pub fn set_full_locking(&mut self, full_locking: bool) {
        self.full_locking = full_locking;
    }

    /// VCIs this context may touch without locking: those of its current
    /// stream, or none for a full-locking context.
    #[must_use]
    pub fn no_lock_mask(&self) -> VciMask {
        if self.full_locking {
            VciMask::EMPTY
        } else {
            self.runtime.stream(self.stream).mask()
        }
    }

    /// Lets the next pooled context on this stream run, then resumes.
    ///
    /// With nobody waiting, yields the OS thread instead.
    pub fn yield_now(&mut self) {
        if !self.runtime.stream(self.stream).yield_slot(&self.slot) {
            std::thread::yield_now();
        }
    }

    /// Sleeps for `duration` without holding the stream.
    pub fn sleep(&self, duration: Duration) {
        self.block_on(|| std::thread::sleep(duration));
    }

    /// Moves to `target` and suspends until resumed there.
    pub fn migrate_to(&mut self, target: StreamId) {
        if target == self.stream {
            return;
        }
        self.runtime.stream(self.stream).release(&self.slot);
        self.stream = target;
        self.runtime.stream(target).acquire(&self.slot);
    }

    /// Releases `mutex`, waits on `cond`, then re-acquires it.
    ///
    /// The stream keeps running other contexts meanwhile.
    pub fn cond_wait(&mut self, cond: &VciCondvar, mutex: &VciMutex) {
        self.block_on(|| cond.wait(mutex));
    }

    /// Takes `raw`, giving up the stream while blocked on it.
    pub(crate) fn lock_raw(&self, raw: &RawLock) {
        if !raw.try_lock() {
            self.block_on(|| raw.lock());
        }
    }

    fn block_on<R>(&self, f: impl FnOnce() -> R) -> R {
        let stream = self.runtime.stream(self.stream);
        stream.release(&self.slot);
        let result = f();
        stream.acquire(&self.slot);
        result
    }

    pub(crate) fn history_mut(&mut self) -> &mut VciHistory {
        &mut self.history
    }

    /// Remembers the current stream unless a return is already pending.
    pub(crate) fn mark_offloaded(&mut self) {
        if self.original_stream.is_none() {
            self.original_stream = Some(self.stream);
        }
    }

    pub(crate) fn vci_claimed(&mut self) {
        self.held_vci += 1;
    }

    /// Counts a lock-free section as released; once none are left, hands
    /// back the stream to return to, if any.
    pub(crate) fn vci_released(&mut self) -> Option<StreamId> {
        self.held_vci = self.held_vci.saturating_sub(1);
        if self.held_vci == 0 {
            self.original_stream.take()
        } else {
            None
        }
    }

    // --- protocol entry points ---

    /// Enters the critical section of `mutex` for channel `id`.
    #[track_caller]
    pub fn enter(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Normal, CallSite::here("enter"));
        let discipline = self.runtime.discipline();
        discipline.enter(self, &req, false);
    }

    /// Like [`enter`](Self::enter), but re-entry by the owner is allowed.
    #[track_caller]
    pub fn enter_recursive(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Normal, CallSite::here("enter_recursive"));
        let discipline = self.runtime.discipline();
        discipline.enter(self, &req, true);
    }

    /// [`enter`](Self::enter) for hot call sites; traced only at print level 2.
    #[track_caller]
    pub fn enter_quiet(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Quiet, CallSite::here("enter"));
        let discipline = self.runtime.discipline();
        discipline.enter(self, &req, false);
    }

    /// [`enter_recursive`](Self::enter_recursive) for hot call sites.
    #[track_caller]
    pub fn enter_recursive_quiet(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Quiet, CallSite::here("enter_recursive"));
        let discipline = self.runtime.discipline();
        discipline.enter(self, &req, true);
    }

    /// Enters only if that needs no rescheduling. Returns true if skipped.
    #[track_caller]
    pub fn enter_or_skip(&mut self, mutex: &VciMutex, id: MutexId) -> bool {
        let req = CsRequest::new(mutex, id, Verbosity::Normal, CallSite::here("enter_or_skip"));
        let discipline = self.runtime.discipline();
        discipline.enter_or_skip(self, &req)
    }

    /// [`enter_or_skip`](Self::enter_or_skip) for hot call sites.
    #[track_caller]
    pub fn enter_or_skip_quiet(&mut self, mutex: &VciMutex, id: MutexId) -> bool {
        let req = CsRequest::new(mutex, id, Verbosity::Quiet, CallSite::here("enter_or_skip"));
        let discipline = self.runtime.discipline();
        discipline.enter_or_skip(self, &req)
    }

    /// Leaves the critical section; an offloaded context goes home.
    #[track_caller]
    pub fn exit(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Normal, CallSite::here("exit"));
        let discipline = self.runtime.discipline();
        discipline.exit(self, &req);
    }

    /// [`exit`](Self::exit) for hot call sites.
    #[track_caller]
    pub fn exit_quiet(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Quiet, CallSite::here("exit"));
        let discipline = self.runtime.discipline();
        discipline.exit(self, &req);
    }

    /// Lets contenders in, then takes the mutex back.
    #[track_caller]
    pub fn yield_section(&mut self, mutex: &VciMutex, id: MutexId) {
        let req = CsRequest::new(mutex, id, Verbosity::Normal, CallSite::here("yield"));
        let discipline = self.runtime.discipline();
        discipline.yield_section(self, &req);
    }

    /// Fatal unless this context holds `mutex`.
    pub fn assert_in_cs(&self, mutex: &VciMutex) {
        self.runtime.discipline().assert_in_cs(self, mutex);
    }
}

impl Drop for ExecContext {
    fn drop(&mut self) {
        trace!(context = %self.id(), stream = %self.stream, "context finished");
        self.runtime.stream(self.stream).leave(&self.slot);
    }
}
