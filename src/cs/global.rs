//! Blocking recursive-lock discipline.
//!
//! Used for every id under [`Granularity::Global`](crate::config::Granularity::Global),
//! and for GLOBAL-class ids and full-locking contexts under the VCI
//! discipline. While a context waits for the raw lock it gives up its
//! stream, so the current holder can come back to that stream and finish.

use std::time::Duration;

use crate::cs::{CriticalSection, CsEvent, CsRequest};
use crate::error::{fatal, Invariant};
use crate::runtime::ExecContext;
use crate::sync::VciMutex;

/// Blocking recursive lock for every id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalCs;

impl CriticalSection for GlobalCs {
    fn enter(&self, ctx: &mut ExecContext, req: &CsRequest<'_>, recursive: bool) {
        let event = if recursive {
            CsEvent::RecursiveAcquire
        } else {
            CsEvent::Acquire
        };
        ctx.runtime().diagnostics().emit(event, req, ctx);
        lock(ctx, req, recursive);
    }

    fn enter_or_skip(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) -> bool {
        ctx.runtime().diagnostics().emit(CsEvent::Acquire, req, ctx);
        lock(ctx, req, false);
        false
    }

    fn exit(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        ctx.runtime().diagnostics().emit(CsEvent::Release, req, ctx);
        unlock(req);
    }

    fn yield_section(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        ctx.runtime().diagnostics().emit(CsEvent::Yield, req, ctx);
        let mutex = req.mutex();
        assert_owner(ctx, mutex);

        let saved = mutex.count();
        mutex.clear();
        mutex.raw().unlock();

        if ctx.runtime().config().heavy_yield {
            ctx.sleep(Duration::from_nanos(1));
        } else {
            ctx.yield_now();
        }

        ctx.lock_raw(mutex.raw());
        debug_assert_eq!(mutex.count(), 0, "raw lock held with a live count");
        mutex.restore(Some(ctx.id()), saved);
    }

    fn assert_in_cs(&self, ctx: &ExecContext, mutex: &VciMutex) {
        assert_owner(ctx, mutex);
    }
}

pub(crate) fn lock(ctx: &ExecContext, req: &CsRequest<'_>, recursive: bool) {
    let mutex = req.mutex();
    let me = ctx.id();
    if mutex.is_owned_by(me) {
        if !recursive {
            fatal(Invariant::RecursiveEntry {
                mutex: mutex.name(),
                context: me,
            });
        }
        mutex.increment();
        return;
    }
    ctx.lock_raw(mutex.raw());
    debug_assert_eq!(mutex.count(), 0, "raw lock acquired with a live count");
    mutex.claim(me);
}

pub(crate) fn unlock(req: &CsRequest<'_>) {
    let mutex = req.mutex();
    if mutex.count() == 0 {
        fatal(Invariant::ReleaseUnheld {
            mutex: mutex.name(),
            id: req.id(),
        });
    }
    if mutex.decrement() == 0 {
        mutex.clear();
        mutex.raw().unlock();
    }
}

pub(crate) fn assert_owner(ctx: &ExecContext, mutex: &VciMutex) {
    if !mutex.is_owned_by(ctx.id()) || mutex.count() == 0 {
        fatal(Invariant::NotOwner {
            mutex: mutex.name(),
            context: ctx.id(),
        });
    }
}
