//! Diagnostic overlay for the critical-section protocol.
//!
//! When enabled, every protocol decision is reported as a [`CsEvent`] tagged
//! with the mutex, the calling context, its stream and the call site. Events
//! go to the `tracing` shim at trace level and, if the journal is on, into a
//! lock-free queue that [`Runtime::drain_journal`](crate::runtime::Runtime::drain_journal)
//! empties.
//!
//! Without the `diagnostics` feature [`Diagnostics::enabled`] is constant
//! false and every check folds away.

use core::fmt;
use core::panic::Location;

use crossbeam_queue::SegQueue;

use crate::cs::CsRequest;
use crate::error::{fatal, Invariant};
use crate::runtime::ExecContext;
use crate::tracing_compat::trace;
use crate::types::{ContextId, MutexId, StreamId};

/// A protocol decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsEvent {
    /// Blocking-path entry.
    Acquire,
    /// Blocking-path recursive entry.
    RecursiveAcquire,
    /// Lock-free entry on the owning stream.
    EmptyAcquire,
    /// Enter-or-skip on a channel the stream does not own.
    SkipAcquire,
    /// Enter-or-skip found the mutex held on the owning stream.
    SkipEmptyAcquire,
    /// Lock-free entry found the mutex held and yields.
    RetryAcquire,
    /// Moving to the owning stream for good.
    ReschedMigrate,
    /// Moving to the owning stream until the section exits.
    ReschedOffload,
    /// Blocking-path exit.
    Release,
    /// Lock-free exit.
    EmptyRelease,
    /// Blocking-path yield.
    Yield,
    /// Lock-free yield.
    EmptyYield,
    /// Lock-free yield found the mutex taken and yields again.
    RetryYieldAcquire,
}

impl CsEvent {
    /// Stable event name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Acquire => "acquire",
            Self::RecursiveAcquire => "racquire",
            Self::EmptyAcquire => "empty-acquire",
            Self::SkipAcquire => "skip-acquire",
            Self::SkipEmptyAcquire => "skip-empty-acquire",
            Self::RetryAcquire => "retry-acquire",
            Self::ReschedMigrate => "resched-acquire-mig",
            Self::ReschedOffload => "resched-acquire-offload",
            Self::Release => "release",
            Self::EmptyRelease => "empty-release",
            Self::Yield => "yield",
            Self::EmptyYield => "empty-yield",
            Self::RetryYieldAcquire => "retry-yacquire",
        }
    }
}

impl fmt::Display for CsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operation name plus source location of a protocol call.
#[derive(Debug, Clone, Copy)]
pub struct CallSite {
    op: &'static str,
    location: &'static Location<'static>,
}

impl CallSite {
    /// Captures the caller's location.
    #[must_use]
    #[track_caller]
    pub fn here(op: &'static str) -> Self {
        Self {
            op,
            location: Location::caller(),
        }
    }

    /// Protocol operation name.
    #[must_use]
    pub const fn op(&self) -> &'static str {
        self.op
    }

    /// Source file of the call.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    /// Source line of the call.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.location.line()
    }
}

/// One journaled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// What happened.
    pub event: CsEvent,
    /// Mutex name.
    pub mutex: &'static str,
    /// Mutex id used on the call.
    pub mutex_id: MutexId,
    /// Calling context.
    pub context: ContextId,
    /// Stream the context was on when the event fired.
    pub stream: StreamId,
    /// Protocol operation.
    pub op: &'static str,
    /// Source file.
    pub file: &'static str,
    /// Source line.
    pub line: u32,
}

/// Process-wide diagnostic flags, read-only after build.
#[derive(Debug)]
pub struct Diagnostics {
    debug_enabled: bool,
    print_level: u8,
    journal: Option<SegQueue<TraceRecord>>,
}

impl Diagnostics {
    /// Creates the overlay.
    #[must_use]
    pub fn new(debug_enabled: bool, print_level: u8, journal: bool) -> Self {
        Self {
            debug_enabled,
            print_level,
            journal: journal.then(SegQueue::new),
        }
    }

    /// True if the overlay is compiled in and switched on.
    #[inline]
    #[must_use]
    pub const fn enabled(&self) -> bool {
        cfg!(feature = "diagnostics") && self.debug_enabled
    }

    /// Configured print level.
    #[must_use]
    pub const fn print_level(&self) -> u8 {
        self.print_level
    }

    /// Reports `event` if the call site's verbosity is within the print level.
    #[inline]
    pub fn emit(&self, event: CsEvent, req: &CsRequest<'_>, ctx: &ExecContext) {
        if !self.enabled() || self.print_level < req.level() as u8 {
            return;
        }
        self.record(event, req, ctx.id(), ctx.stream());
    }

    #[cold]
    fn record(&self, event: CsEvent, req: &CsRequest<'_>, context: ContextId, stream: StreamId) {
        let site = req.site();
        trace!(
            event = event.name(),
            mutex = req.mutex().name(),
            mutex_id = %req.id(),
            context = %context,
            stream = %stream,
            op = site.op(),
            file = site.file(),
            line = site.line(),
            "cs event"
        );
        if let Some(journal) = &self.journal {
            journal.push(TraceRecord {
                event,
                mutex: req.mutex().name(),
                mutex_id: req.id(),
                context,
                stream,
                op: site.op(),
                file: site.file(),
                line: site.line(),
            });
        }
    }

    /// Verifies that a lock-free section is held by an authorized context.
    ///
    /// The channel must belong to the context's current stream and the
    /// context must be the recorded owner. Violations are fatal.
    #[inline]
    pub fn check_ownership(&self, req: &CsRequest<'_>, ctx: &ExecContext) {
        if !self.enabled() {
            return;
        }
        if !ctx.no_lock_mask().contains(req.id()) || !req.mutex().is_owned_by(ctx.id()) {
            fatal(Invariant::UnauthorizedFastPath {
                mutex: req.mutex().name(),
                id: req.id(),
                stream: ctx.stream(),
            });
        }
    }

    /// Removes and returns every journaled event, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<TraceRecord> {
        let Some(journal) = &self.journal else {
            return Vec::new();
        };
        std::iter::from_fn(|| journal.pop()).collect()
    }
}
