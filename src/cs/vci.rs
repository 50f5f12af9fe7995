//! Scheduled lock-free discipline.
//!
//! A VCI mutex is only ever touched by contexts running on the stream that
//! owns its channel. Since a stream runs one context at a time, owner and
//! count can be set without engaging the raw lock. A context that wants a
//! channel owned by another stream moves there first:
//!
//! - **offload**: remember the current stream and come back once the last
//!   lock-free section exits;
//! - **migrate**: when at least `migration_threshold` of the last eight
//!   acquisitions were for this channel, move without planning to return.
//!
//! If the mutex is held by another context on the owning stream, the caller
//! yields the stream and retries. There is no deadline.

use crate::cs::global::{self, GlobalCs};
use crate::cs::{CriticalSection, CsEvent, CsRequest};
use crate::error::{fatal, Invariant};
use crate::runtime::ExecContext;
use crate::sync::VciMutex;
use crate::tracing_compat::trace;
use crate::types::StreamId;

/// Scheduling bridge for VCI ids, blocking lock for the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VciCs;

impl VciCs {
    fn blocking(ctx: &ExecContext, req: &CsRequest<'_>) -> bool {
        req.id().is_global() || ctx.is_full_locking()
    }
}

impl CriticalSection for VciCs {
    fn enter(&self, ctx: &mut ExecContext, req: &CsRequest<'_>, recursive: bool) {
        if Self::blocking(ctx, req) {
            return GlobalCs.enter(ctx, req, recursive);
        }
        let id = req.id();
        let mutex = req.mutex();

        let threshold = ctx.runtime().config().migration_threshold;
        let migrate = ctx.history_mut().record_and_decide(id, threshold);

        if !ctx.no_lock_mask().contains(id) {
            let target = owning_stream(ctx, req);
            if migrate {
                ctx.runtime().diagnostics().emit(CsEvent::ReschedMigrate, req, ctx);
            } else {
                ctx.runtime().diagnostics().emit(CsEvent::ReschedOffload, req, ctx);
                ctx.mark_offloaded();
            }
            trace!(
                context = %ctx.id(),
                from = %ctx.stream(),
                to = %target,
                migrate,
                "rescheduling onto owning stream"
            );
            ctx.migrate_to(target);
        }

        let me = ctx.id();
        loop {
            if mutex.count() == 0 {
                mutex.claim(me);
                ctx.vci_claimed();
                break;
            }
            if mutex.is_owned_by(me) {
                if !recursive {
                    fatal(Invariant::RecursiveEntry {
                        mutex: mutex.name(),
                        context: me,
                    });
                }
                mutex.increment();
                break;
            }
            ctx.runtime().diagnostics().emit(CsEvent::RetryAcquire, req, ctx);
            ctx.yield_now();
        }

        let diagnostics = ctx.runtime().diagnostics();
        diagnostics.emit(CsEvent::EmptyAcquire, req, ctx);
        diagnostics.check_ownership(req, ctx);
    }

    fn enter_or_skip(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) -> bool {
        if Self::blocking(ctx, req) {
            return GlobalCs.enter_or_skip(ctx, req);
        }
        let mutex = req.mutex();
        if !ctx.no_lock_mask().contains(req.id()) {
            ctx.runtime().diagnostics().emit(CsEvent::SkipAcquire, req, ctx);
            return true;
        }
        if mutex.count() != 0 {
            ctx.runtime()
                .diagnostics()
                .emit(CsEvent::SkipEmptyAcquire, req, ctx);
            return true;
        }
        mutex.claim(ctx.id());
        ctx.vci_claimed();

        let diagnostics = ctx.runtime().diagnostics();
        diagnostics.emit(CsEvent::EmptyAcquire, req, ctx);
        diagnostics.check_ownership(req, ctx);
        false
    }

    fn exit(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        if Self::blocking(ctx, req) {
            return GlobalCs.exit(ctx, req);
        }
        let mutex = req.mutex();
        ctx.runtime().diagnostics().emit(CsEvent::EmptyRelease, req, ctx);
        if mutex.count() == 0 {
            fatal(Invariant::ReleaseUnheld {
                mutex: mutex.name(),
                id: req.id(),
            });
        }

        // A nested section may have left us on another stream.
        let owner = owning_stream(ctx, req);
        if ctx.stream() != owner {
            trace!(
                context = %ctx.id(),
                from = %ctx.stream(),
                to = %owner,
                "releasing on owning stream"
            );
            ctx.migrate_to(owner);
        }

        let diagnostics = ctx.runtime().diagnostics();
        match mutex.count() {
            1 => {
                diagnostics.check_ownership(req, ctx);
                mutex.clear();
                if let Some(original) = ctx.vci_released() {
                    trace!(
                        context = %ctx.id(),
                        from = %ctx.stream(),
                        to = %original,
                        "returning offloaded context"
                    );
                    ctx.migrate_to(original);
                }
            }
            _ => {
                diagnostics.check_ownership(req, ctx);
                mutex.decrement();
            }
        }
    }

    fn yield_section(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        if Self::blocking(ctx, req) {
            return GlobalCs.yield_section(ctx, req);
        }
        let mutex = req.mutex();
        let me = ctx.id();
        ctx.runtime().diagnostics().emit(CsEvent::EmptyYield, req, ctx);

        match mutex.count() {
            1 => {}
            0 => fatal(Invariant::NotOwner {
                mutex: mutex.name(),
                context: me,
            }),
            count => fatal(Invariant::RecursiveYield {
                mutex: mutex.name(),
                count,
            }),
        }
        ctx.runtime().diagnostics().check_ownership(req, ctx);

        mutex.clear();
        let target = owning_stream(ctx, req);
        loop {
            if ctx.stream() == target {
                ctx.yield_now();
            } else {
                ctx.migrate_to(target);
            }
            if mutex.count() == 0 && mutex.owner().is_none() {
                mutex.claim(me);
                break;
            }
            ctx.runtime()
                .diagnostics()
                .emit(CsEvent::RetryYieldAcquire, req, ctx);
        }
        ctx.runtime().diagnostics().check_ownership(req, ctx);
    }

    fn assert_in_cs(&self, ctx: &ExecContext, mutex: &VciMutex) {
        global::assert_owner(ctx, mutex);
    }
}

fn owning_stream(ctx: &ExecContext, req: &CsRequest<'_>) -> StreamId {
    ctx.runtime()
        .channel_map()
        .stream_for(req.id())
        .unwrap_or_else(|| fatal(Invariant::UnknownStream { id: req.id() }))
}
