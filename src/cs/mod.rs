//! The critical-section protocol.
//!
//! Every protected code path goes through four operations:
//!
//! - **enter**: take the mutex, blocking or rescheduling as needed
//! - **enter-or-skip**: take the mutex only if that needs no rescheduling
//! - **exit**: release, and return an offloaded context to where it came from
//! - **yield**: let contenders in, then take the mutex back
//!
//! How they behave depends on the runtime's [`Discipline`]:
//!
//! | Discipline | GLOBAL ids (`<= 0`) | VCI ids (`> 0`) |
//! |---|---|---|
//! | [`SerialCs`] | no-op | no-op |
//! | [`GlobalCs`] | blocking recursive lock | blocking recursive lock |
//! | [`VciCs`] | blocking recursive lock | scheduling bridge |
//!
//! Protocol calls are made through [`ExecContext`], which captures the call
//! site and dispatches to the runtime's discipline.

pub mod diag;
mod global;
pub mod history;
mod serial;
mod vci;

pub use diag::{CallSite, CsEvent, Diagnostics, TraceRecord};
pub use global::GlobalCs;
pub use history::{VciHistory, HISTORY_LEN};
pub use serial::SerialCs;
pub use vci::VciCs;

use crate::config::{Granularity, Verbosity};
use crate::runtime::ExecContext;
use crate::sync::VciMutex;
use crate::types::MutexId;

/// Arguments of one protocol call.
#[derive(Debug, Clone, Copy)]
pub struct CsRequest<'a> {
    mutex: &'a VciMutex,
    id: MutexId,
    level: Verbosity,
    site: CallSite,
}

impl<'a> CsRequest<'a> {
    /// Bundles the arguments of a protocol call.
    #[must_use]
    pub const fn new(mutex: &'a VciMutex, id: MutexId, level: Verbosity, site: CallSite) -> Self {
        Self {
            mutex,
            id,
            level,
            site,
        }
    }

    /// The mutex being operated on.
    #[must_use]
    pub const fn mutex(&self) -> &'a VciMutex {
        self.mutex
    }

    /// The channel id passed with the mutex.
    #[must_use]
    pub const fn id(&self) -> MutexId {
        self.id
    }

    /// Diagnostic verbosity of the call site.
    #[must_use]
    pub const fn level(&self) -> Verbosity {
        self.level
    }

    /// Where the call came from.
    #[must_use]
    pub const fn site(&self) -> CallSite {
        self.site
    }
}

/// A locking discipline implementing the four protocol operations.
pub trait CriticalSection {
    /// Enters the critical section.
    ///
    /// `recursive` permits re-entry by the current owner.
    fn enter(&self, ctx: &mut ExecContext, req: &CsRequest<'_>, recursive: bool);

    /// Enters only if no rescheduling is needed; returns true if skipped.
    fn enter_or_skip(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) -> bool;

    /// Leaves the critical section.
    fn exit(&self, ctx: &mut ExecContext, req: &CsRequest<'_>);

    /// Releases, reschedules once, and re-acquires.
    fn yield_section(&self, ctx: &mut ExecContext, req: &CsRequest<'_>);

    /// Fatal unless `ctx` owns `mutex`.
    fn assert_in_cs(&self, ctx: &ExecContext, mutex: &VciMutex);
}

/// The discipline selected for a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    /// Not threaded.
    Serial(SerialCs),
    /// Blocking lock for every id.
    Global(GlobalCs),
    /// Scheduling bridge for VCI ids.
    Vci(VciCs),
}

impl Discipline {
    /// Selects the discipline for `granularity`.
    #[must_use]
    pub const fn for_granularity(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Serial => Self::Serial(SerialCs),
            Granularity::Global => Self::Global(GlobalCs),
            Granularity::Vci => Self::Vci(VciCs),
        }
    }

    /// The granularity this discipline implements.
    #[must_use]
    pub const fn granularity(self) -> Granularity {
        match self {
            Self::Serial(_) => Granularity::Serial,
            Self::Global(_) => Granularity::Global,
            Self::Vci(_) => Granularity::Vci,
        }
    }
}

impl CriticalSection for Discipline {
    #[inline]
    fn enter(&self, ctx: &mut ExecContext, req: &CsRequest<'_>, recursive: bool) {
        match self {
            Self::Serial(cs) => cs.enter(ctx, req, recursive),
            Self::Global(cs) => cs.enter(ctx, req, recursive),
            Self::Vci(cs) => cs.enter(ctx, req, recursive),
        }
    }

    #[inline]
    fn enter_or_skip(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) -> bool {
        match self {
            Self::Serial(cs) => cs.enter_or_skip(ctx, req),
            Self::Global(cs) => cs.enter_or_skip(ctx, req),
            Self::Vci(cs) => cs.enter_or_skip(ctx, req),
        }
    }

    #[inline]
    fn exit(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        match self {
            Self::Serial(cs) => cs.exit(ctx, req),
            Self::Global(cs) => cs.exit(ctx, req),
            Self::Vci(cs) => cs.exit(ctx, req),
        }
    }

    #[inline]
    fn yield_section(&self, ctx: &mut ExecContext, req: &CsRequest<'_>) {
        match self {
            Self::Serial(cs) => cs.yield_section(ctx, req),
            Self::Global(cs) => cs.yield_section(ctx, req),
            Self::Vci(cs) => cs.yield_section(ctx, req),
        }
    }

    #[inline]
    fn assert_in_cs(&self, ctx: &ExecContext, mutex: &VciMutex) {
        match self {
            Self::Serial(cs) => cs.assert_in_cs(ctx, mutex),
            Self::Global(cs) => cs.assert_in_cs(ctx, mutex),
            Self::Vci(cs) => cs.assert_in_cs(ctx, mutex),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discipline_round_trips_granularity() {
        for granularity in [Granularity::Serial, Granularity::Global, Granularity::Vci] {
            assert_eq!(
                Discipline::for_granularity(granularity).granularity(),
                granularity
            );
        }
    }

    #[test]
    fn request_accessors() {
        let mutex = VciMutex::new("req");
        let req = CsRequest::new(&mutex, MutexId::vci(2), Verbosity::Quiet, CallSite::here("exit"));
        assert_eq!(req.mutex().name(), "req");
        assert_eq!(req.id(), MutexId::vci(2));
        assert_eq!(req.level(), Verbosity::Quiet);
        assert_eq!(req.site().op(), "exit");
    }
}
